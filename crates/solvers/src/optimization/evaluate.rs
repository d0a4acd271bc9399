use thiserror::Error;

use cobyla_core::{ConstrainedMinimization, Model, Snapshot};

/// The result of evaluating a constrained problem at a given `x`.
#[derive(Debug, Clone)]
pub struct Evaluation<I, O, const N: usize, const M: usize> {
    pub x: [f64; N],

    pub objective: f64,

    pub constraints: [f64; M],

    pub snapshot: Snapshot<I, O>,
}

impl<I, O, const N: usize, const M: usize> Evaluation<I, O, N, M> {
    /// Returns the greatest constraint violation, `max(0, -c[0], ..., -c[M-1])`.
    #[must_use]
    pub fn max_violation(&self) -> f64 {
        self.constraints.iter().fold(0.0, |worst, &c| f64::max(worst, -c))
    }

    /// Returns `true` if the objective and every constraint value are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.objective.is_finite() && self.constraints.iter().all(|c| c.is_finite())
    }
}

/// Errors that can occur when evaluating a constrained problem.
#[derive(Debug, Error)]
pub enum EvalError<ME, PE> {
    /// The model call failed.
    #[error("model call failed")]
    Model(#[source] ME),

    /// Failed to construct input or compute the objective or constraints.
    #[error("problem error")]
    Problem(#[source] PE),
}

/// Type alias for the result of [`evaluate`].
pub type EvaluateResult<M, P, const N: usize, const C: usize> = Result<
    Evaluation<<M as Model>::Input, <M as Model>::Output, N, C>,
    EvalError<<M as Model>::Error, <P as ConstrainedMinimization<N, C>>::Error>,
>;

/// Evaluates the model in the context of a constrained problem.
///
/// This function maps `x` to model input, calls the model, then computes
/// the objective and constraint values from the input and output.
///
/// # Errors
///
/// Returns an error if input mapping, the model call, or the objective or
/// constraint computation fails.
pub fn evaluate<M, P, const N: usize, const C: usize>(
    model: &M,
    problem: &P,
    x: [f64; N],
) -> EvaluateResult<M, P, N, C>
where
    M: Model,
    P: ConstrainedMinimization<N, C, Input = M::Input, Output = M::Output>,
{
    let input = problem.input(&x).map_err(EvalError::Problem)?;
    let output = model.call(&input).map_err(EvalError::Model)?;
    let objective = problem
        .objective(&input, &output)
        .map_err(EvalError::Problem)?;
    let constraints = problem
        .constraints(&input, &output)
        .map_err(EvalError::Problem)?;

    Ok(Evaluation {
        x,
        objective,
        constraints,
        snapshot: Snapshot::new(input, output),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use approx::assert_relative_eq;

    struct SumModel;

    impl Model for SumModel {
        type Input = [f64; 2];
        type Output = f64;
        type Error = Infallible;

        fn call(&self, input: &[f64; 2]) -> Result<f64, Self::Error> {
            Ok(input[0] + input[1])
        }
    }

    /// Objective is the sum; constraints are `1 - x0` and `x1 - 2`.
    struct Boxed;

    impl ConstrainedMinimization<2, 2> for Boxed {
        type Input = [f64; 2];
        type Output = f64;
        type Error = Infallible;

        fn input(&self, x: &[f64; 2]) -> Result<[f64; 2], Self::Error> {
            Ok(*x)
        }

        fn objective(&self, _input: &[f64; 2], output: &f64) -> Result<f64, Self::Error> {
            Ok(*output)
        }

        fn constraints(&self, input: &[f64; 2], _output: &f64) -> Result<[f64; 2], Self::Error> {
            Ok([1.0 - input[0], input[1] - 2.0])
        }
    }

    #[test]
    fn evaluates_objective_and_constraints() {
        let eval = evaluate(&SumModel, &Boxed, [3.0, 0.5]).unwrap();

        assert_relative_eq!(eval.objective, 3.5);
        assert_relative_eq!(eval.constraints[0], -2.0);
        assert_relative_eq!(eval.constraints[1], -1.5);
        assert_relative_eq!(eval.max_violation(), 2.0);
        assert!(eval.is_finite());
    }

    #[test]
    fn satisfied_constraints_have_zero_violation() {
        let eval = evaluate(&SumModel, &Boxed, [0.0, 5.0]).unwrap();

        assert_relative_eq!(eval.max_violation(), 0.0);
    }

    #[test]
    fn nan_objective_is_not_finite() {
        let eval = evaluate(&SumModel, &Boxed, [f64::NAN, 5.0]).unwrap();

        assert!(!eval.is_finite());
    }
}
