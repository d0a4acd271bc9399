//! Capability traits for generic observers.
//!
//! These traits abstract over solver event and action types, so an observer
//! can be written once against the capabilities it needs.
//!
//! # Event traits
//!
//! - [`HasObjective`] — events that carry an objective value
//! - [`HasConstraintViolation`] — events that carry a constraint violation
//!
//! # Action traits
//!
//! - [`CanStopEarly`] — actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use cobyla_core::Observer;
//! use cobyla_observers::traits::{CanStopEarly, HasConstraintViolation, HasObjective};
//!
//! /// Stops once a feasible point reaches the target objective.
//! struct Target {
//!     objective: f64,
//!     tolerance: f64,
//! }
//!
//! impl<E, A> Observer<E, A> for Target
//! where
//!     E: HasObjective + HasConstraintViolation,
//!     A: CanStopEarly,
//! {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         let feasible = event.max_violation() <= self.tolerance;
//!         if feasible && event.objective() <= self.objective {
//!             return Some(A::stop_early());
//!         }
//!         None
//!     }
//! }
//! ```

use cobyla_solvers::optimization::cobyla;

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    ///
    /// Returns `f64::NAN` when the event has no associated point.
    fn objective(&self) -> f64;
}

/// An event that carries the greatest constraint violation at a point.
pub trait HasConstraintViolation {
    /// Returns the greatest violation, `max(0, -c[i])`, for this event.
    ///
    /// Returns `f64::NAN` when the event has no associated point.
    fn max_violation(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

impl<I, O, const N: usize> HasObjective for cobyla::Event<'_, I, O, N> {
    fn objective(&self) -> f64 {
        self.point().map_or(f64::NAN, |point| point.objective)
    }
}

impl<I, O, const N: usize> HasConstraintViolation for cobyla::Event<'_, I, O, N> {
    fn max_violation(&self) -> f64 {
        self.point().map_or(f64::NAN, |point| point.max_violation)
    }
}

impl CanStopEarly for cobyla::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
