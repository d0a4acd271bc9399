//! Solvers for constrained minimization problems.
//!
//! A [`ConstrainedMinimization`] maps solver variables `x: [f64; N]` to model
//! inputs, calls the model, and extracts an objective plus `M` inequality
//! constraints. Solvers in this module search for the `x` that minimizes the
//! objective while keeping every constraint value nonnegative.
//!
//! # Solvers
//!
//! - [`cobyla`] — derivative-free simplex method with linear models and a
//!   trust region, for black-box objectives and constraints
//!
//! [`ConstrainedMinimization`]: cobyla_core::ConstrainedMinimization

mod evaluate;

pub use evaluate::{EvalError, EvaluateResult, Evaluation, evaluate};

pub mod cobyla;
