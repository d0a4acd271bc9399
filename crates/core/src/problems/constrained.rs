/// Defines a minimization problem with inequality constraints.
///
/// A constrained minimization problem maps solver variables to a model input,
/// then computes an objective value and `M` constraint values from the model
/// input and output. Solvers search for the input that minimizes the objective
/// while driving every constraint value to be nonnegative.
///
/// The const generic `N` is the number of solver variables and `M` is the
/// number of inequality constraints. `M = 0` describes an unconstrained
/// problem.
pub trait ConstrainedMinimization<const N: usize, const M: usize> {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Maps solver variables (`x`) into a model input.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the input cannot be constructed from `x`.
    fn input(&self, x: &[f64; N]) -> Result<Self::Input, Self::Error>;

    /// Computes the objective value from model input/output.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the objective cannot be computed.
    fn objective(&self, input: &Self::Input, output: &Self::Output) -> Result<f64, Self::Error>;

    /// Computes the constraint values from model input/output.
    ///
    /// Constraint `i` is satisfied when `c[i] >= 0`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the constraints cannot be computed.
    fn constraints(
        &self,
        input: &Self::Input,
        output: &Self::Output,
    ) -> Result<[f64; M], Self::Error>;
}
