//! Logs a COBYLA run on a small constrained problem.
//!
//! ```text
//! cargo run -p cobyla-observers --example progress
//! ```

use std::convert::Infallible;

use cobyla_core::{ConstrainedMinimization, Model};
use cobyla_observers::{ProgressLogger, Verbosity};
use cobyla_solvers::optimization::cobyla::{self, Config};

/// Rosenbrock's banana function.
struct Rosenbrock;

impl Model for Rosenbrock {
    type Input = [f64; 2];
    type Output = f64;
    type Error = Infallible;

    fn call(&self, x: &[f64; 2]) -> Result<f64, Self::Error> {
        Ok(100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2))
    }
}

/// Keep the point inside the disk of radius 0.8 around the origin.
struct InsideDisk;

impl ConstrainedMinimization<2, 1> for InsideDisk {
    type Input = [f64; 2];
    type Output = f64;
    type Error = Infallible;

    fn input(&self, x: &[f64; 2]) -> Result<Self::Input, Self::Error> {
        Ok(*x)
    }

    fn objective(&self, _input: &[f64; 2], output: &f64) -> Result<f64, Self::Error> {
        Ok(*output)
    }

    fn constraints(&self, input: &[f64; 2], _output: &f64) -> Result<[f64; 1], Self::Error> {
        Ok([0.64 - input[0].powi(2) - input[1].powi(2)])
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = Config::new(0.5, 1e-6, 2000)?;
    let logger = ProgressLogger::new(Verbosity::from_level(3));

    let solution = cobyla::minimize(&Rosenbrock, &InsideDisk, [-1.2, 1.0], &config, logger)?;

    println!(
        "{:?} after {} evaluations: x = {:?}, f = {:.6}",
        solution.status, solution.evals, solution.x, solution.objective
    );
    Ok(())
}
