//! Progress reporting for COBYLA runs through `tracing`.
//!
//! [`ProgressLogger`] never stops a run and never touches the numerics; it
//! only turns solver events into log records. Install any `tracing`
//! subscriber to see them.
//!
//! # Example
//!
//! ```rust
//! use cobyla_observers::{ProgressLogger, Verbosity};
//!
//! // Report each radius reduction and the final result.
//! let logger = ProgressLogger::new(Verbosity::Radius);
//! assert_eq!(logger.verbosity(), Verbosity::Radius);
//! ```

use std::fmt::Debug;

use cobyla_core::Observer;
use cobyla_solvers::optimization::cobyla::{Action, Event};
use tracing::{debug, info};

/// How much a [`ProgressLogger`] reports.
///
/// Each level includes everything reported by the levels before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Nothing is logged.
    Silent,

    /// Only the final result.
    #[default]
    Final,

    /// Also each trust-region reduction and penalty increase.
    Radius,

    /// Also every evaluation, at `DEBUG` level.
    Evaluations,
}

impl Verbosity {
    /// Maps a numeric level `0..=3` to a verbosity.
    ///
    /// Levels above 3 report everything.
    #[must_use]
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Silent,
            1 => Self::Final,
            2 => Self::Radius,
            _ => Self::Evaluations,
        }
    }
}

/// Observer that logs solver progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressLogger {
    verbosity: Verbosity,
}

impl ProgressLogger {
    /// Creates a logger reporting at the given verbosity.
    #[must_use]
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Returns the configured verbosity.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }
}

impl<I, O, const N: usize> Observer<Event<'_, I, O, N>, Action> for ProgressLogger {
    fn observe(&mut self, event: &Event<'_, I, O, N>) -> Option<Action> {
        let verbosity = self.verbosity;
        match event {
            Event::Evaluated {
                evals,
                kind,
                point,
                ..
            } if verbosity >= Verbosity::Evaluations => {
                debug!(
                    evals,
                    ?kind,
                    objective = point.objective,
                    max_violation = point.max_violation,
                    x = ?Vector(&point.x),
                    "evaluated"
                );
            }
            Event::PenaltyIncreased { penalty } if verbosity >= Verbosity::Radius => {
                info!(penalty, "increased penalty");
            }
            Event::RadiusReduced {
                rho,
                penalty,
                evals,
                best,
            } if verbosity >= Verbosity::Radius => {
                info!(
                    rho,
                    penalty,
                    evals,
                    objective = best.objective,
                    max_violation = best.max_violation,
                    x = ?Vector(&best.x),
                    "reduced trust region"
                );
            }
            Event::Finished {
                status,
                evals,
                best,
            } if verbosity >= Verbosity::Final => {
                info!(
                    ?status,
                    evals,
                    objective = best.objective,
                    max_violation = best.max_violation,
                    x = ?Vector(&best.x),
                    "finished"
                );
            }
            _ => {}
        }
        None
    }
}

/// Formats a point compactly with six significant digits per entry.
struct Vector<'a>(&'a [f64]);

impl Debug for Vector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|v| Sig6(*v)))
            .finish()
    }
}

struct Sig6(f64);

impl Debug for Sig6 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6e}", self.0)
    }
}
