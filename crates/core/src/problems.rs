pub mod constrained;

pub use constrained::ConstrainedMinimization;
