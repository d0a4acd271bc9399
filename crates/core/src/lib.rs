//! Core traits and types shared by the COBYLA solver and its observers.
//!
//! - [`Model`] — a callable that maps a typed input to a typed output
//! - [`Snapshot`] — a captured input/output pair from a model call
//! - [`Observer`] — receives solver events and optionally returns control actions
//! - [`ConstrainedMinimization`] — adapts solver variables to model inputs and
//!   extracts the objective and inequality constraints from model outputs

mod model;
mod observer;
mod problems;

pub use model::{Model, Snapshot};
pub use observer::Observer;
pub use problems::ConstrainedMinimization;
