use std::{cell::Cell, convert::Infallible};

use approx::{assert_abs_diff_eq, assert_relative_eq};
use thiserror::Error;

use cobyla_core::{ConstrainedMinimization, Model};

use super::{
    Action, Config, ConfigError, Error, Event, Probe, Status, minimize, minimize_unobserved,
};

/// Squared distance from the origin: f(x) = x0² + x1².
struct Paraboloid;

impl Model for Paraboloid {
    type Input = [f64; 2];
    type Output = f64;
    type Error = Infallible;

    fn call(&self, x: &[f64; 2]) -> Result<f64, Self::Error> {
        Ok(x[0].powi(2) + x[1].powi(2))
    }
}

/// Minimize the model output subject to `x0 + x1 >= 1`.
struct HalfPlane;

impl ConstrainedMinimization<2, 1> for HalfPlane {
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
        Ok([input[0] + input[1] - 1.0])
    }
}

#[test]
fn minimizes_distance_to_half_plane() {
    let solution = minimize_unobserved(&Paraboloid, &HalfPlane, [0.0, 0.0], &Config::default())
        .expect("should converge");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.x[0], 0.5, epsilon = 1e-4);
    assert_relative_eq!(solution.x[1], 0.5, epsilon = 1e-4);
    assert_relative_eq!(solution.objective, 0.5, epsilon = 1e-4);
    assert!(solution.max_violation < 1e-5);
    assert_relative_eq!(solution.rho, Config::default().rho_end());
}

#[test]
fn solution_carries_snapshot_at_reported_x() {
    let solution = minimize_unobserved(&Paraboloid, &HalfPlane, [0.0, 0.0], &Config::default())
        .expect("should converge");

    for (input, x) in solution.snapshot.input.iter().zip(solution.x) {
        assert_relative_eq!(*input, x, epsilon = 1e-12);
    }
    assert_relative_eq!(solution.snapshot.output, solution.objective);
}

/// Minimize `-x0` inside the unit disk, using the model output as `|x|²`.
struct UnitDisk;

impl ConstrainedMinimization<2, 1> for UnitDisk {
    type Input = [f64; 2];
    type Output = f64;
    type Error = Infallible;

    fn input(&self, x: &[f64; 2]) -> Result<Self::Input, Self::Error> {
        Ok(*x)
    }

    fn objective(&self, input: &[f64; 2], _output: &f64) -> Result<f64, Self::Error> {
        Ok(-input[0])
    }

    fn constraints(&self, _input: &[f64; 2], output: &f64) -> Result<[f64; 1], Self::Error> {
        Ok([1.0 - output])
    }
}

#[test]
fn reaches_edge_of_unit_disk() {
    let solution = minimize_unobserved(&Paraboloid, &UnitDisk, [0.0, 0.0], &Config::default())
        .expect("should converge");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.x[0], 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(solution.x[1], 0.0, epsilon = 1e-4);
    assert_relative_eq!(solution.objective, -1.0, epsilon = 1e-4);
}

/// Requires both `x0 >= 1` and `x0 <= -1`.
struct Contradiction;

impl ConstrainedMinimization<2, 2> for Contradiction {
    type Input = [f64; 2];
    type Output = f64;
    type Error = Infallible;

    fn input(&self, x: &[f64; 2]) -> Result<Self::Input, Self::Error> {
        Ok(*x)
    }

    fn objective(&self, _input: &[f64; 2], output: &f64) -> Result<f64, Self::Error> {
        Ok(*output)
    }

    fn constraints(&self, input: &[f64; 2], _output: &f64) -> Result<[f64; 2], Self::Error> {
        Ok([input[0] - 1.0, -1.0 - input[0]])
    }
}

#[test]
fn infeasible_constraints_keep_reporting_violation() {
    let config = Config::new(0.5, 1e-6, 300).unwrap();

    let solution = minimize_unobserved(&Paraboloid, &Contradiction, [0.3, 0.0], &config)
        .expect("should terminate");

    // The radius still shrinks to `rho_end`; infeasibility shows only in
    // the reported violation, which is at least 1 everywhere.
    assert_eq!(solution.status, Status::Converged);
    assert!(solution.max_violation >= 1.0 - 1e-12);
    assert!(solution.evals <= config.max_evals());
}

/// Paraboloid that counts its calls.
struct Counting {
    calls: Cell<usize>,
}

impl Model for Counting {
    type Input = [f64; 2];
    type Output = f64;
    type Error = Infallible;

    fn call(&self, x: &[f64; 2]) -> Result<f64, Self::Error> {
        self.calls.set(self.calls.get() + 1);
        Paraboloid.call(x)
    }
}

#[test]
fn budget_smaller_than_initial_simplex_is_rejected() {
    let model = Counting {
        calls: Cell::new(0),
    };
    let config = Config::new(0.5, 1e-6, 2).unwrap();

    let result = minimize_unobserved(&model, &HalfPlane, [0.0, 0.0], &config);

    assert!(matches!(
        result,
        Err(Error::InvalidConfig(ConfigError::MaxEvals { required: 3 }))
    ));
    assert_eq!(model.calls.get(), 0);
}

#[test]
fn stops_when_budget_is_spent() {
    let model = Counting {
        calls: Cell::new(0),
    };
    let config = Config::new(0.5, 1e-6, 10).unwrap();

    let solution =
        minimize_unobserved(&model, &HalfPlane, [0.0, 0.0], &config).expect("should stop");

    assert_eq!(solution.status, Status::MaxEvals);
    assert_eq!(solution.evals, 10);
    assert_eq!(model.calls.get(), 10);
}

/// Unconstrained bowl centered at `(1, -2)`.
struct ShiftedBowl;

impl ConstrainedMinimization<2, 0> for ShiftedBowl {
    type Input = [f64; 2];
    type Output = f64;
    type Error = Infallible;

    fn input(&self, x: &[f64; 2]) -> Result<Self::Input, Self::Error> {
        Ok([x[0] - 1.0, x[1] + 2.0])
    }

    fn objective(&self, _input: &[f64; 2], output: &f64) -> Result<f64, Self::Error> {
        Ok(*output)
    }

    fn constraints(&self, _input: &[f64; 2], _output: &f64) -> Result<[f64; 0], Self::Error> {
        Ok([])
    }
}

#[test]
fn converges_without_constraints() {
    let solution = minimize_unobserved(&Paraboloid, &ShiftedBowl, [0.0, 0.0], &Config::default())
        .expect("should converge");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.x[0], 1.0, epsilon = 1e-4);
    assert_relative_eq!(solution.x[1], -2.0, epsilon = 1e-4);
    assert_abs_diff_eq!(solution.max_violation, 0.0);
}

/// Minimize `x0 + x1 + x2` inside the unit ball.
struct Ball;

impl Model for Ball {
    type Input = [f64; 3];
    type Output = f64;
    type Error = Infallible;

    fn call(&self, x: &[f64; 3]) -> Result<f64, Self::Error> {
        Ok(x.iter().map(|v| v * v).sum())
    }
}

impl ConstrainedMinimization<3, 1> for Ball {
    type Input = [f64; 3];
    type Output = f64;
    type Error = Infallible;

    fn input(&self, x: &[f64; 3]) -> Result<Self::Input, Self::Error> {
        Ok(*x)
    }

    fn objective(&self, input: &[f64; 3], _output: &f64) -> Result<f64, Self::Error> {
        Ok(input.iter().sum())
    }

    fn constraints(&self, _input: &[f64; 3], output: &f64) -> Result<[f64; 1], Self::Error> {
        Ok([1.0 - output])
    }
}

#[test]
fn finds_ball_corner_in_three_dimensions() {
    let solution =
        minimize_unobserved(&Ball, &Ball, [0.0; 3], &Config::default()).expect("should converge");

    let expected = -1.0 / 3.0_f64.sqrt();
    assert_eq!(solution.status, Status::Converged);
    for x in solution.x {
        assert_relative_eq!(x, expected, epsilon = 1e-4);
    }
}

#[test]
fn restart_from_solution_stays_put() {
    let first = minimize_unobserved(&Paraboloid, &HalfPlane, [0.0, 0.0], &Config::default())
        .expect("should converge");

    let tight = Config::new(2e-6, 1e-6, 1000).unwrap();
    let second =
        minimize_unobserved(&Paraboloid, &HalfPlane, first.x, &tight).expect("should converge");

    assert_eq!(second.status, Status::Converged);
    assert!(second.evals <= 2 * (2 + 1), "used {} evaluations", second.evals);
    assert_relative_eq!(second.x[0], first.x[0], epsilon = 1e-4);
    assert_relative_eq!(second.x[1], first.x[1], epsilon = 1e-4);
    assert_relative_eq!(second.objective, first.objective, epsilon = 1e-4);
}

#[test]
fn observer_can_stop_early() {
    let mut evaluated = 0;
    let mut finished = 0;
    let observer = |event: &Event<'_, _, _, 2>| match event {
        Event::Evaluated { .. } => {
            evaluated += 1;
            (evaluated >= 5).then_some(Action::StopEarly)
        }
        Event::Finished { .. } => {
            finished += 1;
            None
        }
        _ => None,
    };

    let solution = minimize(&Paraboloid, &HalfPlane, [0.0, 0.0], &Config::default(), observer)
        .expect("should stop cleanly");

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.evals, 5);
    assert_eq!(evaluated, 5);
    assert_eq!(finished, 1);
}

#[test]
fn stop_during_initial_simplex_returns_best_vertex() {
    let observer = |event: &Event<'_, _, _, 2>| match event {
        Event::Evaluated { evals: 2, .. } => Some(Action::StopEarly),
        _ => None,
    };

    let solution = minimize(&Paraboloid, &ShiftedBowl, [0.0, 0.0], &Config::default(), observer)
        .expect("should stop cleanly");

    // The step to (0.5, 0) is closer to (1, -2) than the start point.
    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.evals, 2);
    assert_eq!(solution.x, [0.5, 0.0]);
}

#[test]
fn events_follow_the_run() {
    let mut probes = Vec::new();
    let mut radii = Vec::new();
    let mut last_evals = 0;
    let mut final_status = None;

    let observer = |event: &Event<'_, _, _, 2>| {
        match event {
            Event::Evaluated { evals, kind, .. } => {
                assert_eq!(*evals, last_evals + 1, "evaluations are counted one by one");
                last_evals = *evals;
                probes.push(*kind);
            }
            Event::RadiusReduced { rho, penalty, .. } => {
                assert!(*penalty >= 0.0);
                radii.push(*rho);
            }
            Event::PenaltyIncreased { penalty } => assert!(*penalty > 0.0),
            Event::Finished { status, .. } => final_status = Some(*status),
        }
        None
    };

    let solution = minimize(&Paraboloid, &HalfPlane, [0.0, 0.0], &Config::default(), observer)
        .expect("should converge");

    assert_eq!(probes[..3], [Probe::Initial; 3]);
    assert!(probes[3..].iter().all(|&p| p != Probe::Initial));
    assert!(probes.contains(&Probe::Trial));
    assert!(probes.contains(&Probe::Geometry), "the simplex is repaired");
    assert!(radii.windows(2).all(|w| w[1] < w[0]), "rho only shrinks");
    assert_eq!(radii.last().copied(), Some(Config::default().rho_end()));
    assert_eq!(final_status, Some(solution.status));
    assert_eq!(last_evals, solution.evals);
}

// --- Failure handling ---

/// Paraboloid that fails when `x0` exceeds a threshold.
struct Fragile {
    threshold: f64,
}

#[derive(Debug, Clone, Error)]
#[error("model failed at x0={x0} (threshold={threshold})")]
struct FragileError {
    x0: f64,
    threshold: f64,
}

impl Model for Fragile {
    type Input = [f64; 2];
    type Output = f64;
    type Error = FragileError;

    fn call(&self, x: &[f64; 2]) -> Result<f64, Self::Error> {
        if x[0] > self.threshold {
            Err(FragileError {
                x0: x[0],
                threshold: self.threshold,
            })
        } else {
            Ok(x[0].powi(2) + x[1].powi(2))
        }
    }
}

#[test]
fn model_failure_is_an_error() {
    // The first simplex step moves x0 to 0.5.
    let model = Fragile { threshold: 0.3 };

    let result = minimize_unobserved(&model, &HalfPlane, [0.0, 0.0], &Config::default());

    assert!(matches!(result, Err(Error::Model(_))));
}

/// Half-plane problem whose constraint is undefined above `x1 = 0.2`.
struct Undefined;

impl ConstrainedMinimization<2, 1> for Undefined {
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
        if input[1] > 0.2 {
            Ok([f64::NAN])
        } else {
            Ok([input[0] + input[1] - 1.0])
        }
    }
}

#[test]
fn non_finite_values_fail_fast() {
    let result = minimize_unobserved(&Paraboloid, &Undefined, [0.0, 0.0], &Config::default());

    match result {
        Err(Error::NonFinite { x, .. }) => assert_eq!(x, vec![0.0, 0.5]),
        other => panic!("expected a non-finite error, got {other:?}"),
    }
}
