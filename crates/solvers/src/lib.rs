//! Numerical solvers built on the `cobyla-core` abstractions.
//!
//! - [`optimization`] — constrained minimization by linear approximations

pub mod optimization;
