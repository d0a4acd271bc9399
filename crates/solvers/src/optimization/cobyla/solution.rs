use cobyla_core::Snapshot;

/// Indicates why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The trust-region radius reached `rho_end`.
    Converged,

    /// Used the whole evaluation budget before converging.
    MaxEvals,

    /// The simplex inverse drifted too far from the true inverse to trust
    /// further refinement.
    RoundingErrors,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of a COBYLA run.
///
/// The reported point is always the best simplex vertex under the penalty
/// merit function in use when the solver stopped.
#[derive(Debug, Clone)]
pub struct Solution<I, O, const N: usize> {
    /// Final solver status.
    pub status: Status,

    /// Best estimate of the constrained minimum.
    pub x: [f64; N],

    /// Objective value at the reported x.
    pub objective: f64,

    /// Greatest constraint violation at the reported x.
    pub max_violation: f64,

    /// Snapshot at the reported x.
    pub snapshot: Snapshot<I, O>,

    /// Number of model evaluations used.
    pub evals: usize,

    /// Trust-region radius when the solver finished.
    pub rho: f64,
}
