use cobyla_core::Snapshot;

use super::{Point, Status};

/// Why a point was evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// A vertex of the initial simplex.
    Initial,

    /// A vertex moved to restore the simplex shape.
    Geometry,

    /// A trial step from the trust-region subproblem.
    Trial,
}

/// Events emitted by the COBYLA solver.
#[derive(Debug)]
pub enum Event<'a, I, O, const N: usize> {
    /// A model evaluation succeeded.
    Evaluated {
        /// Number of evaluations so far, including this one.
        evals: usize,

        /// Why the point was evaluated.
        kind: Probe,

        /// The evaluated point.
        point: Point<N>,

        /// The model input and output at this point.
        snapshot: &'a Snapshot<I, O>,
    },

    /// The penalty on constraint violation was raised.
    PenaltyIncreased {
        /// The new penalty parameter.
        penalty: f64,
    },

    /// The trust-region radius was reduced.
    RadiusReduced {
        /// The new radius.
        rho: f64,

        /// The penalty parameter after rescaling.
        penalty: f64,

        /// Number of evaluations so far.
        evals: usize,

        /// The current best vertex.
        best: Point<N>,
    },

    /// The solver is about to return.
    Finished {
        status: Status,
        evals: usize,
        best: Point<N>,
    },
}

impl<I, O, const N: usize> Event<'_, I, O, N> {
    /// Returns the evaluated point or the current best, if the event has one.
    #[must_use]
    pub fn point(&self) -> Option<&Point<N>> {
        match self {
            Self::Evaluated { point, .. } => Some(point),
            Self::RadiusReduced { best, .. } | Self::Finished { best, .. } => Some(best),
            Self::PenaltyIncreased { .. } => None,
        }
    }

    /// Returns the evaluation count, if the event carries one.
    #[must_use]
    pub fn evals(&self) -> Option<usize> {
        match self {
            Self::Evaluated { evals, .. }
            | Self::RadiusReduced { evals, .. }
            | Self::Finished { evals, .. } => Some(*evals),
            Self::PenaltyIncreased { .. } => None,
        }
    }
}
