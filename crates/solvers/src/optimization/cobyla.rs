//! COBYLA: constrained optimization by linear approximations.
//!
//! # Algorithm
//!
//! COBYLA minimizes an objective subject to inequality constraints
//! `c[i](x) >= 0` using only function values. It keeps a simplex of `N + 1`
//! evaluated points and interpolates linear models of the objective and of
//! every constraint across it. Each iteration solves a linear program inside
//! a trust region of radius `rho` around the best vertex: first reduce the
//! greatest linearized violation, then use any remaining freedom to lower the
//! linearized objective. The trial point replaces a vertex of the simplex,
//! and `rho` shrinks from `rho_begin` to `rho_end` as progress stalls.
//!
//! Vertices are compared with the merit function
//! `f(x) + mu * max(0, -c[0](x), ..., -c[M-1](x))`, where the penalty `mu` is
//! raised whenever the linear models predict that a step trades too much
//! objective for feasibility.
//!
//! # When to Use
//!
//! COBYLA is appropriate when:
//! - Derivatives of the objective or constraints are unavailable
//! - Evaluations are expensive compared to the solver's own arithmetic
//! - The number of variables is modest (tens, not thousands)
//!
//! # Limitations
//!
//! - **Local only**: Converges to a local constrained minimum
//! - **Linear models**: Convergence near the solution is at best linear
//! - **Finite values**: NaN or infinite objective and constraint values end
//!   the run with [`Error::NonFinite`]
//!
//! # Observer Events
//!
//! - [`Event::Evaluated`]: after every successful evaluation
//! - [`Event::PenaltyIncreased`]: when the penalty parameter is raised
//! - [`Event::RadiusReduced`]: after each trust-region reduction
//! - [`Event::Finished`]: once, just before returning
//!
//! Observers can return [`Action::StopEarly`] to halt and return the best
//! vertex found so far with [`Status::StoppedByObserver`].

mod action;
mod config;
mod error;
mod event;
mod linalg;
mod point;
mod search;
mod simplex;
mod solution;
mod subproblem;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::{Event, Probe};
pub use point::Point;
pub use solution::{Solution, Status};

use cobyla_core::{ConstrainedMinimization, Model, Observer};

use search::search;

/// Minimizes the objective subject to the problem's constraints.
///
/// Starts from `x0` and evaluates the model at most `config.max_evals()`
/// times. The observer receives an [`Event`] for each evaluation and each
/// change of penalty or radius.
/// See the [module docs](self) for details.
///
/// # Errors
///
/// Returns an error if the config cannot drive a problem with `N` variables,
/// if the model or problem fails during evaluation, or if an evaluation
/// produces a non-finite objective or constraint value.
pub fn minimize<M, P, Obs, const N: usize, const C: usize>(
    model: &M,
    problem: &P,
    x0: [f64; N],
    config: &Config,
    observer: Obs,
) -> Result<Solution<M::Input, M::Output, N>, Error>
where
    M: Model,
    P: ConstrainedMinimization<N, C, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M::Input, M::Output, N>, Action>,
{
    search(model, problem, x0, config, observer)
}

/// Minimizes the objective without observer support.
///
/// This is a convenience wrapper around [`minimize`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error if the config is invalid for the problem, if the model or
/// problem fails during evaluation, or if an evaluation is non-finite.
pub fn minimize_unobserved<M, P, const N: usize, const C: usize>(
    model: &M,
    problem: &P,
    x0: [f64; N],
    config: &Config,
) -> Result<Solution<M::Input, M::Output, N>, Error>
where
    M: Model,
    P: ConstrainedMinimization<N, C, Input = M::Input, Output = M::Output>,
{
    minimize(model, problem, x0, config, ())
}
