//! Reusable observers for COBYLA solver runs.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work with the events emitted by [`cobyla`].
//!
//! # Modules
//!
//! - [`traits`] — Capability traits for generic observers
//!   ([`HasObjective`], [`HasConstraintViolation`], [`CanStopEarly`])
//! - [`progress`] — [`ProgressLogger`], which reports solver progress
//!   through `tracing` at a chosen [`Verbosity`]
//!
//! [`Observer`]: cobyla_core::Observer
//! [`cobyla`]: cobyla_solvers::optimization::cobyla
//! [`HasObjective`]: traits::HasObjective
//! [`HasConstraintViolation`]: traits::HasConstraintViolation
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod progress;
pub mod traits;

pub use progress::{ProgressLogger, Verbosity};
