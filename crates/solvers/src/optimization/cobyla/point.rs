/// A point with its objective value and greatest constraint violation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<const N: usize> {
    /// The solver variables.
    pub x: [f64; N],

    /// The objective value at `x`.
    pub objective: f64,

    /// The greatest constraint violation at `x`, `max(0, -c[i])`.
    pub max_violation: f64,
}

impl<const N: usize> Point<N> {
    /// Creates a new point.
    #[must_use]
    pub fn new(x: [f64; N], objective: f64, max_violation: f64) -> Self {
        Self {
            x,
            objective,
            max_violation,
        }
    }

    /// Returns `true` if no constraint is violated.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.max_violation <= 0.0
    }
}
