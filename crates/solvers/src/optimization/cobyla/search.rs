use cobyla_core::{ConstrainedMinimization, Model, Observer};
use tracing::warn;

use crate::optimization::evaluate;

use super::{
    Action, Config, Error, Event, Point, Probe, Solution, Status,
    linalg::{Matrix, dot, norm_sq},
    simplex::{Geometry, Sample, Simplex},
    subproblem,
};

/// Largest tolerated entry of `simi * sim - I` before the run is abandoned.
const ROUNDING_TOLERANCE: f64 = 0.1;

/// Fraction of the predicted merit reduction a step must achieve to keep
/// the current radius.
const PROGRESS_RATIO: f64 = 0.1;

/// What the main loop does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Pivot the best vertex to the pole, then repair or take a trial step.
    SelectBest,

    /// Repair on the next pass if the simplex is poor, otherwise shrink `rho`.
    ShrinkRadius,

    Finish(Status),
}

/// Core COBYLA implementation.
pub(super) fn search<M, P, Obs, const N: usize, const C: usize>(
    model: &M,
    problem: &P,
    x0: [f64; N],
    config: &Config,
    observer: Obs,
) -> Result<Solution<M::Input, M::Output, N>, Error>
where
    M: Model,
    P: ConstrainedMinimization<N, C, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M::Input, M::Output, N>, Action>,
{
    let (mut search, mut phase) = Search::start(model, problem, x0, config, observer)?;
    loop {
        phase = match phase {
            Phase::SelectBest => search.iterate()?,
            Phase::ShrinkRadius => search.shrink(),
            Phase::Finish(status) => return Ok(search.finish(status)),
        };
    }
}

// ============================================================================
// Evaluation + observer
// ============================================================================

struct Evaluator<'a, M, P, Obs, const N: usize, const C: usize> {
    model: &'a M,
    problem: &'a P,
    observer: Obs,
    evals: usize,
    max_evals: usize,
}

impl<M, P, Obs, const N: usize, const C: usize> Evaluator<'_, M, P, Obs, N, C>
where
    M: Model,
    P: ConstrainedMinimization<N, C, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M::Input, M::Output, N>, Action>,
{
    fn has_budget(&self) -> bool {
        self.evals < self.max_evals
    }

    /// Evaluate at `x`, emit an event, and return the observer's action.
    fn probe(
        &mut self,
        x: [f64; N],
        kind: Probe,
    ) -> Result<(Sample<M::Input, M::Output>, Option<Action>), Error> {
        let eval = evaluate::<M, P, N, C>(self.model, self.problem, x)?;
        if !eval.is_finite() {
            return Err(Error::NonFinite {
                x: x.to_vec(),
                objective: eval.objective,
            });
        }
        self.evals += 1;

        let point = Point::new(x, eval.objective, eval.max_violation());
        let sample = Sample::from_evaluation(eval);
        let event = Event::Evaluated {
            evals: self.evals,
            kind,
            point,
            snapshot: sample.snapshot(),
        };
        let action = self.observer.observe(&event);
        Ok((sample, action))
    }

    fn notify(&mut self, event: &Event<'_, M::Input, M::Output, N>) -> Option<Action> {
        self.observer.observe(event)
    }
}

// ============================================================================
// Main iteration
// ============================================================================

struct Search<'a, M, P, Obs, const N: usize, const C: usize>
where
    M: Model,
{
    evaluator: Evaluator<'a, M, P, Obs, N, C>,
    simplex: Simplex<M::Input, M::Output>,
    rho: f64,
    rho_end: f64,

    /// Penalty on constraint violation in the merit function.
    parmu: f64,

    /// Set when the radius stalled with a poor simplex, so the next pass
    /// moves a vertex instead of solving the subproblem.
    repair_armed: bool,

    /// Whether the simplex shape passed at the last selection.
    acceptable: bool,
}

impl<'m, M, P, Obs, const N: usize, const C: usize> Search<'m, M, P, Obs, N, C>
where
    M: Model,
    P: ConstrainedMinimization<N, C, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M::Input, M::Output, N>, Action>,
{
    /// Evaluates `x0` and the remaining vertices of the initial simplex.
    fn start(
        model: &'m M,
        problem: &'m P,
        x0: [f64; N],
        config: &Config,
        observer: Obs,
    ) -> Result<(Self, Phase), Error> {
        config.validate_for(N)?;

        let mut evaluator = Evaluator {
            model,
            problem,
            observer,
            evals: 0,
            max_evals: config.max_evals(),
        };

        let (first, action) = evaluator.probe(x0, Probe::Initial)?;
        let mut search = Search {
            evaluator,
            simplex: Simplex::start(&x0, config.rho_begin(), first),
            rho: config.rho_begin(),
            rho_end: config.rho_end(),
            parmu: 0.0,
            repair_armed: false,
            acceptable: true,
        };

        if let Some(Action::StopEarly) = action {
            return Ok((search, Phase::Finish(Status::StoppedByObserver)));
        }
        while search.simplex.is_building() {
            let x = search.simplex.next_initial();
            let (sample, action) = search.evaluator.probe(x, Probe::Initial)?;
            search.simplex.extend(sample);
            if let Some(Action::StopEarly) = action {
                return Ok((search, Phase::Finish(Status::StoppedByObserver)));
            }
        }
        Ok((search, Phase::SelectBest))
    }

    /// Selects the best vertex, then repairs the simplex or tries a step.
    #[allow(clippy::float_cmp)]
    fn iterate(&mut self) -> Result<Phase, Error> {
        let nbest = self.simplex.select_best(self.parmu);
        self.simplex.pivot(nbest);

        let error = self.simplex.inverse_error();
        if error > ROUNDING_TOLERANCE {
            warn!(
                error,
                evals = self.evaluator.evals,
                "simplex inverse lost accuracy, stopping"
            );
            return Ok(Phase::Finish(Status::RoundingErrors));
        }

        let (a, b) = self.simplex.linear_models();
        let geometry = self.simplex.geometry(self.rho);
        self.acceptable = geometry.is_acceptable();

        if self.repair_armed {
            if let Some(jdrop) = geometry.vertex_to_repair() {
                return self.repair(&geometry, jdrop, &a);
            }
        }

        let step = subproblem::solve(&a, &b, self.rho, C);
        if !step.full && norm_sq(&step.dx) < 0.25 * self.rho * self.rho {
            self.repair_armed = false;
            return Ok(Phase::ShrinkRadius);
        }
        let dx = step.dx;

        // Predicted violation and objective change at the trial point.
        let resnew = (0..C)
            .map(|k| b[k] - dot(a.col(k), &dx))
            .fold(0.0, f64::max);
        let total = -dot(a.col(C), &dx);

        let (f_pole, v_pole) = (self.simplex.objective(N), self.simplex.max_violation(N));
        let prerec = v_pole - resnew;
        let barmu = if prerec > 0.0 { total / prerec } else { 0.0 };
        if self.parmu < 1.5 * barmu {
            self.parmu = 2.0 * barmu;
            let event = Event::PenaltyIncreased {
                penalty: self.parmu,
            };
            if let Some(Action::StopEarly) = self.evaluator.notify(&event) {
                return Ok(Phase::Finish(Status::StoppedByObserver));
            }
            if self.simplex.pole_is_beaten(self.parmu) {
                return Ok(Phase::SelectBest);
            }
        }
        let mut prerem = self.parmu * prerec - total;

        self.repair_armed = false;
        if !self.evaluator.has_budget() {
            return Ok(Phase::Finish(Status::MaxEvals));
        }
        let x = self.simplex.offset(&dx);
        let (sample, action) = self.evaluator.probe(x, Probe::Trial)?;
        if let Some(Action::StopEarly) = action {
            return Ok(Phase::Finish(Status::StoppedByObserver));
        }

        let (f, resmax) = (sample.objective(), sample.max_violation());
        let mut trured = (f_pole + self.parmu * v_pole) - (f + self.parmu * resmax);
        if self.parmu == 0.0 && f == f_pole {
            prerem = prerec;
            trured = v_pole - resmax;
        }

        let Some(jdrop) = self.simplex.vertex_to_replace(&geometry, &dx, trured) else {
            return Ok(Phase::ShrinkRadius);
        };
        self.simplex.replace(jdrop, &dx);
        self.simplex.store(jdrop, sample);

        if trured > 0.0 && trured >= PROGRESS_RATIO * prerem {
            Ok(Phase::SelectBest)
        } else {
            Ok(Phase::ShrinkRadius)
        }
    }

    /// Moves vertex `jdrop` to improve the simplex shape.
    fn repair(&mut self, geometry: &Geometry, jdrop: usize, a: &Matrix) -> Result<Phase, Error> {
        let dx = self.simplex.repair_step(geometry, jdrop, a, self.parmu);
        self.simplex.replace(jdrop, &dx);

        if !self.evaluator.has_budget() {
            return Ok(Phase::Finish(Status::MaxEvals));
        }
        let x = self.simplex.offset(&dx);
        let (sample, action) = self.evaluator.probe(x, Probe::Geometry)?;
        if let Some(Action::StopEarly) = action {
            return Ok(Phase::Finish(Status::StoppedByObserver));
        }

        self.simplex.store(jdrop, sample);
        self.repair_armed = false;
        Ok(Phase::SelectBest)
    }

    /// Halves the radius, unless the simplex needs repair first or `rho`
    /// has already reached `rho_end`.
    fn shrink(&mut self) -> Phase {
        if !self.acceptable {
            self.repair_armed = true;
            return Phase::SelectBest;
        }
        if self.rho <= self.rho_end {
            return Phase::Finish(Status::Converged);
        }

        self.rho *= 0.5;
        if self.rho <= 1.5 * self.rho_end {
            self.rho = self.rho_end;
        }
        if self.parmu > 0.0 {
            self.parmu = self.simplex.rescaled_penalty(self.parmu);
        }

        let event = Event::RadiusReduced {
            rho: self.rho,
            penalty: self.parmu,
            evals: self.evaluator.evals,
            best: self.simplex.best(),
        };
        match self.evaluator.notify(&event) {
            Some(Action::StopEarly) => Phase::Finish(Status::StoppedByObserver),
            None => Phase::SelectBest,
        }
    }

    /// Emits the final event and builds the solution from the pole.
    fn finish(mut self, status: Status) -> Solution<M::Input, M::Output, N> {
        let best = self.simplex.best();
        let evals = self.evaluator.evals;

        // Nothing is left to stop.
        let _ = self.evaluator.notify(&Event::Finished {
            status,
            evals,
            best,
        });

        Solution {
            status,
            x: best.x,
            objective: best.objective,
            max_violation: best.max_violation,
            snapshot: self.simplex.into_pole_snapshot(),
            evals,
            rho: self.rho,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    /// f(x) = x0² + x1².
    struct Bowl;

    impl Model for Bowl {
        type Input = [f64; 2];
        type Output = f64;
        type Error = Infallible;

        fn call(&self, x: &[f64; 2]) -> Result<f64, Self::Error> {
            Ok(x[0].powi(2) + x[1].powi(2))
        }
    }

    /// Requires `x0 + x1 >= 1`.
    struct AboveLine;

    impl ConstrainedMinimization<2, 1> for AboveLine {
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
    fn start_evaluates_the_initial_simplex() {
        let (search, phase) =
            Search::start(&Bowl, &AboveLine, [0.0, 0.0], &Config::default(), ()).unwrap();

        assert_eq!(phase, Phase::SelectBest);
        assert_eq!(search.evaluator.evals, 3);
        assert!(!search.simplex.is_building());
    }

    #[test]
    fn rounding_damage_stops_at_the_pole() {
        let (mut search, _) =
            Search::start(&Bowl, &AboveLine, [0.0, 0.0], &Config::default(), ()).unwrap();
        let pole = search.simplex.best::<2>();

        // simi[1][1] goes from 2 to 4, so entry (1, 1) of simi * sim is 2.
        search.simplex.scale_inverse(1, 1, 2.0);
        let phase = search.iterate().unwrap();
        assert_eq!(phase, Phase::Finish(Status::RoundingErrors));

        let solution = search.finish(Status::RoundingErrors);
        assert_eq!(solution.status, Status::RoundingErrors);
        assert_eq!(solution.x, pole.x);
        assert_eq!(solution.x, [0.0, 0.0]);
        assert_eq!(solution.evals, 3);
    }

    #[test]
    fn converged_run_keeps_an_accurate_inverse() {
        let (mut search, mut phase) =
            Search::start(&Bowl, &AboveLine, [0.0, 0.0], &Config::default(), ()).unwrap();

        let status = loop {
            phase = match phase {
                Phase::SelectBest => search.iterate().unwrap(),
                Phase::ShrinkRadius => search.shrink(),
                Phase::Finish(status) => break status,
            };
        };

        assert_eq!(status, Status::Converged);
        assert!(search.simplex.inverse_error() <= ROUNDING_TOLERANCE);
    }
}
