//! Trust-region subproblem for the linear models.
//!
//! Given the linear models `A` (one column per constraint, then minus the
//! objective gradient) and right-hand sides `b`, computes a step `dx` with
//! `|dx| <= rho` in two stages:
//!
//! 1. Minimize the greatest linearized violation `max_k(b_k - A_k . dx)`.
//! 2. Using any freedom left inside the ball, maximize `A_m . dx` without
//!    increasing that violation.
//!
//! The objective is handled as one extra constraint appended after stage one,
//! so both stages share the same active-set iteration. The active set keeps
//! an orthogonal matrix `Z` whose leading columns come from Gram-Schmidt on
//! the active gradients, updated by Givens rotations as constraints enter and
//! leave.

use super::linalg::{Matrix, dot, guarded_dot, snap_to_zero};

/// Step proposed by the subproblem solver.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Step {
    pub(super) dx: Vec<f64>,

    /// `false` when a degeneracy kept the step from reaching the boundary.
    pub(super) full: bool,
}

/// Solves the subproblem for `m` constraints and the objective in column `m`.
pub(super) fn solve(a: &Matrix, b: &[f64], rho: f64, m: usize) -> Step {
    Subproblem::new(a, b, rho, m).run()
}

/// Orthogonal factorization of the active constraint gradients.
///
/// `iact` is a permutation of constraint indices whose first `nact` entries
/// are active. `vmultc` follows the same ordering: Lagrange multipliers for
/// active entries, shifted residuals for the rest.
struct ActiveSet {
    z: Matrix,
    zdota: Vec<f64>,
    iact: Vec<usize>,
    vmultc: Vec<f64>,
    nact: usize,
}

impl ActiveSet {
    fn new(n: usize, m: usize) -> Self {
        let mut z = Matrix::zeros(n, n);
        for i in 0..n {
            z[(i, i)] = 1.0;
        }
        Self {
            z,
            zdota: vec![0.0; m + 1],
            iact: (0..=m).collect(),
            vmultc: vec![0.0; m + 1],
            nact: 0,
        }
    }

    fn last(&self) -> usize {
        self.nact - 1
    }

    /// Exchanges active positions `k` and `k + 1`, rotating `Z` so that its
    /// leading columns stay a Gram-Schmidt basis for the new ordering.
    fn rotate_down(&mut self, k: usize, a: &Matrix) {
        let kp = k + 1;
        let sp = dot(self.z.col(k), a.col(self.iact[kp]));
        let temp = (sp * sp + self.zdota[kp] * self.zdota[kp]).sqrt();
        let alpha = self.zdota[kp] / temp;
        let beta = sp / temp;
        self.zdota[kp] = alpha * self.zdota[k];
        self.zdota[k] = temp;
        self.z.exchange_cols(k, kp, alpha, beta);
        self.iact.swap(k, kp);
        self.vmultc.swap(k, kp);
    }

    /// Moves the active constraint at `pos` to the end of the active list.
    fn move_to_end(&mut self, pos: usize, a: &Matrix) {
        for k in pos..self.last() {
            self.rotate_down(k, a);
        }
    }
}

enum StageEnd {
    /// The step reached the trust-region boundary.
    Boundary,

    /// Stage one drove the greatest violation to zero inside the ball.
    Feasible,

    /// No further progress is possible in this stage.
    Stalled,
}

enum Advance {
    /// A multiplier or residual changed sign; this position enters or leaves.
    Blocked(usize),
    End(StageEnd),
}

struct Subproblem<'a> {
    a: &'a Matrix,
    b: &'a [f64],
    rho: f64,
    m: usize,
    mcon: usize,
    set: ActiveSet,
    dx: Vec<f64>,
    sdirn: Vec<f64>,
    vmultd: Vec<f64>,
    resmax: f64,
}

impl<'a> Subproblem<'a> {
    fn new(a: &'a Matrix, b: &'a [f64], rho: f64, m: usize) -> Self {
        let n = a.rows();
        Self {
            a,
            b,
            rho,
            m,
            mcon: m,
            set: ActiveSet::new(n, m),
            dx: vec![0.0; n],
            sdirn: vec![0.0; n],
            vmultd: vec![0.0; m + 1],
            resmax: 0.0,
        }
    }

    fn in_stage_one(&self) -> bool {
        self.mcon == self.m
    }

    fn run(mut self) -> Step {
        // The most violated constraint starts stage one; if none is violated
        // the objective stage begins immediately.
        let mut first = None;
        for k in 0..self.m {
            if self.b[k] > self.resmax {
                self.resmax = self.b[k];
                first = Some(k);
            }
        }
        for k in 0..self.m {
            self.set.vmultc[k] = self.resmax - self.b[k];
        }

        if let Some(icon) = first {
            if let StageEnd::Boundary = self.stage(icon) {
                return self.into_step(true);
            }
        }

        self.mcon = self.m + 1;
        self.set.iact[self.m] = self.m;
        self.set.vmultc[self.m] = 0.0;

        let full = !matches!(self.stage(self.m), StageEnd::Stalled);
        self.into_step(full)
    }

    fn into_step(self, full: bool) -> Step {
        Step { dx: self.dx, full }
    }

    /// Runs the active-set iteration of the current stage from position `icon`.
    ///
    /// The stage ends once three consecutive iterations neither improve the
    /// stage objective nor grow the active set, which prevents cycling.
    fn stage(&mut self, mut icon: usize) -> StageEnd {
        let mut optold = 0.0;
        let mut nactx = 0;
        let mut icount = 0;

        loop {
            let optnew = if self.in_stage_one() {
                self.resmax
            } else {
                -dot(&self.dx, self.a.col(self.m))
            };
            if icount == 0 || optnew < optold {
                optold = optnew;
                nactx = self.set.nact;
                icount = 3;
            } else if self.set.nact > nactx {
                nactx = self.set.nact;
                icount = 3;
            } else {
                icount -= 1;
                if icount == 0 {
                    return StageEnd::Stalled;
                }
            }

            if icon < self.set.nact {
                self.remove(icon);
            } else if !self.add(icon) {
                return StageEnd::Stalled;
            }

            match self.advance() {
                Advance::Blocked(next) => icon = next,
                Advance::End(end) => return end,
            }
        }
    }

    /// Adds the constraint at inactive position `icon` to the active set.
    ///
    /// Returns `false` if it cannot enter without breaking the factorization.
    #[allow(clippy::float_cmp)]
    fn add(&mut self, icon: usize) -> bool {
        let a = self.a;
        let n = self.dx.len();
        let kk = self.set.iact[icon];
        let mut dxnew = a.col(kk).to_vec();

        // Rotate the trailing columns of Z so that only one of them keeps a
        // component along the new gradient.
        let mut tot = 0.0;
        for k in (self.set.nact..n).rev() {
            let sp = guarded_dot(self.set.z.col(k), &dxnew);
            if tot == 0.0 {
                tot = sp;
            } else {
                let temp = (sp * sp + tot * tot).sqrt();
                let alpha = sp / temp;
                let beta = tot / temp;
                tot = temp;
                self.set.z.rotate_cols(k, k + 1, alpha, beta);
            }
        }

        if tot != 0.0 {
            let pos = self.set.nact;
            self.set.nact += 1;
            self.set.zdota[pos] = tot;
            self.set.vmultc[icon] = self.set.vmultc[pos];
            self.set.vmultc[pos] = 0.0;
        } else {
            // The new gradient is a combination of the active ones, so one of
            // them must leave. Express it in the active basis and pick the
            // constraint whose multiplier reaches zero first.
            let mut ratio = -1.0;
            let mut iout = None;
            for k in (0..self.set.nact).rev() {
                let zdotv = guarded_dot(self.set.z.col(k), &dxnew);
                if zdotv == 0.0 {
                    self.vmultd[k] = 0.0;
                    continue;
                }
                let temp = zdotv / self.set.zdota[k];
                if temp > 0.0 && self.set.iact[k] < self.m {
                    let tempa = self.set.vmultc[k] / temp;
                    if ratio < 0.0 || tempa < ratio {
                        ratio = tempa;
                        iout = Some(k);
                    }
                }
                if k >= 1 {
                    let kw = self.set.iact[k];
                    for (d, g) in dxnew.iter_mut().zip(a.col(kw)) {
                        *d -= temp * g;
                    }
                }
                self.vmultd[k] = temp;
            }
            let Some(iout) = iout else {
                return false;
            };

            for k in 0..self.set.nact {
                self.set.vmultc[k] = f64::max(0.0, self.set.vmultc[k] - ratio * self.vmultd[k]);
            }
            self.set.move_to_end(iout, a);

            let last = self.set.last();
            let temp = dot(self.set.z.col(last), a.col(kk));
            if temp == 0.0 {
                return false;
            }
            self.set.zdota[last] = temp;
            self.set.vmultc[icon] = 0.0;
            self.set.vmultc[last] = ratio;
        }

        let last = self.set.last();
        self.set.iact[icon] = self.set.iact[last];
        self.set.iact[last] = kk;

        // In stage two the objective must stay the last active entry.
        if !self.in_stage_one() && kk != self.m {
            self.set.rotate_down(last - 1, a);
        }

        if self.in_stage_one() {
            let temp = (dot(&self.sdirn, a.col(kk)) - 1.0) / self.set.zdota[last];
            for (s, z) in self.sdirn.iter_mut().zip(self.set.z.col(last)) {
                *s -= temp * z;
            }
        } else {
            self.objective_direction();
        }
        true
    }

    /// Removes the active constraint at position `icon`.
    fn remove(&mut self, icon: usize) {
        self.set.move_to_end(icon, self.a);
        self.set.nact -= 1;

        if self.in_stage_one() {
            let freed = self.set.z.col(self.set.nact);
            let temp = dot(&self.sdirn, freed);
            for (s, z) in self.sdirn.iter_mut().zip(freed) {
                *s -= temp * z;
            }
        } else {
            self.objective_direction();
        }
    }

    /// Stage-two direction: the objective gradient component orthogonal to
    /// every other active constraint.
    fn objective_direction(&mut self) {
        let last = self.set.last();
        let scale = 1.0 / self.set.zdota[last];
        for (s, z) in self.sdirn.iter_mut().zip(self.set.z.col(last)) {
            *s = scale * z;
        }
    }

    /// Steps along `sdirn` to the boundary (or to zero violation in stage one),
    /// stopping early where a multiplier or residual would turn negative.
    #[allow(clippy::float_cmp)]
    fn advance(&mut self) -> Advance {
        let a = self.a;
        let rho = self.rho;
        let nact = self.set.nact;

        // The 1e-6 factors avoid harmless underflow in tiny components.
        let mut dd = rho * rho;
        let mut sd = 0.0;
        let mut ss = 0.0;
        for (&d, &s) in self.dx.iter().zip(&self.sdirn) {
            if d.abs() >= 1e-6 * rho {
                dd -= d * d;
            }
            sd += d * s;
            ss += s * s;
        }
        if dd <= 0.0 {
            return Advance::End(StageEnd::Stalled);
        }
        let mut temp = (ss * dd).sqrt();
        if sd.abs() >= 1e-6 * temp {
            temp = (ss * dd + sd * sd).sqrt();
        }
        let stpful = dd / (temp + sd);
        let mut step = stpful;
        if self.in_stage_one() {
            if snap_to_zero(self.resmax, step) == 0.0 {
                return Advance::End(StageEnd::Feasible);
            }
            step = step.min(self.resmax);
        }

        let target: Vec<f64> = self
            .dx
            .iter()
            .zip(&self.sdirn)
            .map(|(d, s)| d + step * s)
            .collect();

        let resold = self.resmax;
        if self.in_stage_one() {
            self.resmax = self.set.iact[..nact]
                .iter()
                .map(|&kk| self.b[kk] - dot(a.col(kk), &target))
                .fold(0.0, f64::max);
        }

        // Multipliers the active set would have at `target`.
        let mut dxnew = target.clone();
        for k in (0..nact).rev() {
            let zdotw = guarded_dot(self.set.z.col(k), &dxnew);
            self.vmultd[k] = zdotw / self.set.zdota[k];
            if k >= 1 {
                let kk = self.set.iact[k];
                for (d, g) in dxnew.iter_mut().zip(a.col(kk)) {
                    *d -= self.vmultd[k] * g;
                }
            }
        }
        if !self.in_stage_one() {
            self.vmultd[nact - 1] = f64::max(0.0, self.vmultd[nact - 1]);
        }

        // Shifted residuals of the inactive constraints at `target`.
        for k in nact..self.mcon {
            let kk = self.set.iact[k];
            let mut total = self.resmax - self.b[kk];
            let mut sumabs = self.resmax + self.b[kk].abs();
            for (g, t) in a.col(kk).iter().zip(&target) {
                let term = g * t;
                total += term;
                sumabs += term.abs();
            }
            self.vmultd[k] = snap_to_zero(total, sumabs);
        }

        // Fraction of the step that keeps every entry nonnegative.
        let mut ratio = 1.0;
        let mut blocked = None;
        for k in 0..self.mcon {
            if self.vmultd[k] < 0.0 {
                let temp = self.set.vmultc[k] / (self.set.vmultc[k] - self.vmultd[k]);
                if temp < ratio {
                    ratio = temp;
                    blocked = Some(k);
                }
            }
        }

        let keep = 1.0 - ratio;
        for (d, t) in self.dx.iter_mut().zip(&target) {
            *d = keep * *d + ratio * t;
        }
        for k in 0..self.mcon {
            self.set.vmultc[k] = f64::max(0.0, keep * self.set.vmultc[k] + ratio * self.vmultd[k]);
        }
        if self.in_stage_one() {
            self.resmax = resold + ratio * (self.resmax - resold);
        }

        match blocked {
            Some(icon) => Advance::Blocked(icon),
            None if step == stpful => Advance::End(StageEnd::Boundary),
            None => Advance::End(StageEnd::Feasible),
        }
    }
}
