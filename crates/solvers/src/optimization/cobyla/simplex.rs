use cobyla_core::Snapshot;

use crate::optimization::Evaluation;

use super::{
    Point,
    linalg::{Matrix, dot, norm_sq},
};

/// Lower bound on `vsig / rho` for an acceptable simplex.
const ALPHA: f64 = 0.25;

/// Upper bound on `veta / rho` for an acceptable simplex.
const BETA: f64 = 2.1;

/// Repair step length as a fraction of `rho * vsig`.
const GAMMA: f64 = 0.5;

/// Edge length, relative to `rho`, above which a trial point prefers to
/// replace the far vertex.
const DELTA: f64 = 1.1;

/// Evaluated values at one vertex: the constraints, then the objective, then
/// the greatest constraint violation.
pub(super) struct Sample<I, O> {
    values: Vec<f64>,
    snapshot: Snapshot<I, O>,
}

impl<I, O> Sample<I, O> {
    pub(super) fn new(values: Vec<f64>, snapshot: Snapshot<I, O>) -> Self {
        Self { values, snapshot }
    }

    pub(super) fn from_evaluation<const N: usize, const M: usize>(
        eval: Evaluation<I, O, N, M>,
    ) -> Self {
        let max_violation = eval.max_violation();
        let mut values = Vec::with_capacity(M + 2);
        values.extend_from_slice(&eval.constraints);
        values.push(eval.objective);
        values.push(max_violation);
        Self::new(values, eval.snapshot)
    }

    pub(super) fn objective(&self) -> f64 {
        self.values[self.values.len() - 2]
    }

    pub(super) fn max_violation(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub(super) fn snapshot(&self) -> &Snapshot<I, O> {
        &self.snapshot
    }
}

/// Shape measures of the current simplex relative to a trust radius.
pub(super) struct Geometry {
    rho: f64,

    /// Distance from each vertex to the face opposite it.
    vsig: Vec<f64>,

    /// Length of each edge from the pole.
    veta: Vec<f64>,
}

impl Geometry {
    fn parsig(&self) -> f64 {
        ALPHA * self.rho
    }

    fn pareta(&self) -> f64 {
        BETA * self.rho
    }

    pub(super) fn is_acceptable(&self) -> bool {
        let (parsig, pareta) = (self.parsig(), self.pareta());
        self.vsig.iter().all(|&s| s >= parsig) && self.veta.iter().all(|&e| e <= pareta)
    }

    /// Picks the vertex a geometry repair should move, if one is needed.
    ///
    /// The longest edge beyond `beta * rho` goes first, then the vertex
    /// closest to its opposite face.
    pub(super) fn vertex_to_repair(&self) -> Option<usize> {
        if self.is_acceptable() {
            return None;
        }

        let mut jdrop = None;
        let mut temp = self.pareta();
        for (j, &eta) in self.veta.iter().enumerate() {
            if eta > temp {
                jdrop = Some(j);
                temp = eta;
            }
        }
        if jdrop.is_none() {
            for (j, &sig) in self.vsig.iter().enumerate() {
                if sig < temp {
                    jdrop = Some(j);
                    temp = sig;
                }
            }
        }
        jdrop
    }
}

/// The simplex of `n + 1` vertices with its inverse and evaluated values.
///
/// Column `n` of `sim` holds the pole (the best vertex); columns `0..n` hold
/// the other vertices as displacements from it. `simi` is the inverse of
/// those displacements. `datmat` has one column per vertex with `m`
/// constraint values, the objective and the greatest violation.
pub(super) struct Simplex<I, O> {
    n: usize,
    m: usize,
    sim: Matrix,
    simi: Matrix,
    datmat: Matrix,
    pole: Snapshot<I, O>,
    others: Vec<Snapshot<I, O>>,
}

impl<I, O> Simplex<I, O> {
    /// Starts a simplex at `x0` with axis-aligned edges of length `rho`.
    ///
    /// Only the pole is evaluated; the other vertices are added one by one
    /// with [`Simplex::extend`].
    pub(super) fn start(x0: &[f64], rho: f64, first: Sample<I, O>) -> Self {
        let n = x0.len();
        let m = first.values.len() - 2;

        let mut sim = Matrix::zeros(n, n + 1);
        let mut simi = Matrix::zeros(n, n);
        sim.col_mut(n).copy_from_slice(x0);
        for i in 0..n {
            sim[(i, i)] = rho;
            simi[(i, i)] = 1.0 / rho;
        }

        let mut datmat = Matrix::zeros(m + 2, n + 1);
        datmat.col_mut(n).copy_from_slice(&first.values);

        Self {
            n,
            m,
            sim,
            simi,
            datmat,
            pole: first.snapshot,
            others: Vec::with_capacity(n),
        }
    }

    /// Returns `true` until every initial vertex has been evaluated.
    pub(super) fn is_building(&self) -> bool {
        self.others.len() < self.n
    }

    /// Position of the next initial vertex to evaluate: the pole moved by
    /// `rho` along the next coordinate axis.
    pub(super) fn next_initial<const N: usize>(&self) -> [f64; N] {
        let j = self.others.len();
        let mut dx = [0.0; N];
        dx[j] = self.sim[(j, j)];
        self.offset(&dx)
    }

    /// Adds the next initial vertex, making it the pole if its objective is
    /// strictly lower.
    pub(super) fn extend(&mut self, sample: Sample<I, O>) {
        let n = self.n;
        let j = self.others.len();
        let rho = self.sim[(j, j)];

        if self.objective(n) <= sample.objective() {
            self.datmat.col_mut(j).copy_from_slice(&sample.values);
            self.others.push(sample.snapshot);
            return;
        }

        self.sim[(j, n)] += rho;
        for (k, &value) in sample.values.iter().enumerate() {
            self.datmat[(k, j)] = self.datmat[(k, n)];
            self.datmat[(k, n)] = value;
        }
        for k in 0..=j {
            self.sim[(j, k)] = -rho;
            let temp = -(k..=j).map(|i| self.simi[(i, k)]).sum::<f64>();
            self.simi[(j, k)] = temp;
        }
        let previous = std::mem::replace(&mut self.pole, sample.snapshot);
        self.others.push(previous);
    }

    pub(super) fn objective(&self, j: usize) -> f64 {
        self.datmat[(self.m, j)]
    }

    pub(super) fn max_violation(&self, j: usize) -> f64 {
        self.datmat[(self.m + 1, j)]
    }

    fn merit(&self, j: usize, parmu: f64) -> f64 {
        self.objective(j) + parmu * self.max_violation(j)
    }

    /// Returns `true` if vertex `j` beats vertex `best` under penalty `parmu`.
    #[allow(clippy::float_cmp)]
    fn beats(&self, j: usize, best: usize, parmu: f64) -> bool {
        let phi = self.merit(j, parmu);
        let phimin = self.merit(best, parmu);
        phi < phimin
            || (phi == phimin
                && parmu == 0.0
                && self.max_violation(j) < self.max_violation(best))
    }

    /// Index of the vertex with the lowest merit (`n` for the pole).
    ///
    /// Ties with a zero penalty go to the vertex with the lower violation.
    pub(super) fn select_best(&self, parmu: f64) -> usize {
        (0..self.n).fold(self.n, |best, j| {
            if self.beats(j, best, parmu) { j } else { best }
        })
    }

    /// Returns `true` if some vertex beats the pole under penalty `parmu`.
    pub(super) fn pole_is_beaten(&self, parmu: f64) -> bool {
        (0..self.n).any(|j| self.beats(j, self.n, parmu))
    }

    /// Moves vertex `nbest` into the pole position.
    pub(super) fn pivot(&mut self, nbest: usize) {
        let n = self.n;
        if nbest == n {
            return;
        }

        self.datmat.swap_cols(nbest, n);
        for i in 0..n {
            let temp = self.sim[(i, nbest)];
            self.sim[(i, nbest)] = 0.0;
            self.sim[(i, n)] += temp;
            let mut tempa = 0.0;
            for k in 0..n {
                self.sim[(i, k)] -= temp;
                tempa -= self.simi[(k, i)];
            }
            self.simi[(nbest, i)] = tempa;
        }
        std::mem::swap(&mut self.pole, &mut self.others[nbest]);
    }

    /// Largest entry of `simi * sim[.., 0..n] - I` in absolute value.
    pub(super) fn inverse_error(&self) -> f64 {
        let n = self.n;
        let mut error = 0.0_f64;
        for i in 0..n {
            for j in 0..n {
                let identity = if i == j { 1.0 } else { 0.0 };
                let temp = self.simi.row_dot(i, self.sim.col(j)) - identity;
                error = error.max(temp.abs());
            }
        }
        error
    }

    /// Linear interpolation of the constraints and the objective.
    ///
    /// Column `k < m` of the returned matrix is the gradient of constraint
    /// `k`, and column `m` is minus the objective gradient. The vector holds
    /// the negated values at the pole.
    pub(super) fn linear_models(&self) -> (Matrix, Vec<f64>) {
        let (n, m) = (self.n, self.m);
        let mut a = Matrix::zeros(n, m + 1);
        let mut b = vec![0.0; m + 1];

        for k in 0..=m {
            b[k] = -self.datmat[(k, n)];
            let w: Vec<f64> = self.datmat.row(k).take(n).map(|v| v + b[k]).collect();
            for i in 0..n {
                let temp = dot(&w, self.simi.col(i));
                a[(i, k)] = if k == m { -temp } else { temp };
            }
        }
        (a, b)
    }

    pub(super) fn geometry(&self, rho: f64) -> Geometry {
        let vsig = (0..self.n)
            .map(|j| 1.0 / self.simi.row(j).map(|s| s * s).sum::<f64>().sqrt())
            .collect();
        let veta = (0..self.n)
            .map(|j| norm_sq(self.sim.col(j)).sqrt())
            .collect();
        Geometry { rho, vsig, veta }
    }

    /// Step that moves vertex `jdrop` to restore the simplex shape.
    ///
    /// The step runs along row `jdrop` of the inverse, so it is orthogonal to
    /// the face opposite that vertex. Its sign is chosen to favor the penalized
    /// linear prediction at the new point.
    pub(super) fn repair_step(
        &self,
        geometry: &Geometry,
        jdrop: usize,
        a: &Matrix,
        parmu: f64,
    ) -> Vec<f64> {
        let (n, m) = (self.n, self.m);
        let scale = GAMMA * geometry.rho * geometry.vsig[jdrop];
        let mut dx: Vec<f64> = self.simi.row(jdrop).map(|s| scale * s).collect();

        let mut cvmaxp = 0.0_f64;
        let mut cvmaxm = 0.0_f64;
        let mut total = 0.0;
        for k in 0..=m {
            total = dot(a.col(k), &dx);
            if k < m {
                let temp = self.datmat[(k, n)];
                cvmaxp = cvmaxp.max(-total - temp);
                cvmaxm = cvmaxm.max(total - temp);
            }
        }
        if parmu * (cvmaxp - cvmaxm) > total + total {
            for d in &mut dx {
                *d = -*d;
            }
        }
        dx
    }

    /// Chooses the vertex a trial point at `pole + dx` should replace.
    ///
    /// A reduction in merit (`trured > 0`) makes the replacement mandatory.
    /// Otherwise only a vertex whose removal improves the simplex volume
    /// qualifies. Among vertices that keep a reasonable shape, one far from
    /// the new point is preferred.
    pub(super) fn vertex_to_replace(
        &self,
        geometry: &Geometry,
        dx: &[f64],
        trured: f64,
    ) -> Option<usize> {
        let n = self.n;
        let mut ratio = if trured <= 0.0 { 1.0 } else { 0.0 };
        let mut jdrop = None;
        let mut sigbar = vec![0.0; n];
        for (j, bar) in sigbar.iter_mut().enumerate() {
            let temp = self.simi.row_dot(j, dx).abs();
            if temp > ratio {
                jdrop = Some(j);
                ratio = temp;
            }
            *bar = temp * geometry.vsig[j];
        }

        let mut edgmax = DELTA * geometry.rho;
        let mut far = None;
        for (j, &bar) in sigbar.iter().enumerate() {
            if bar >= geometry.parsig() || bar >= geometry.vsig[j] {
                let edge = if trured > 0.0 {
                    dx.iter()
                        .zip(self.sim.col(j))
                        .map(|(d, s)| (d - s) * (d - s))
                        .sum::<f64>()
                        .sqrt()
                } else {
                    geometry.veta[j]
                };
                if edge > edgmax {
                    far = Some(j);
                    edgmax = edge;
                }
            }
        }
        far.or(jdrop)
    }

    /// Moves vertex `jdrop` to `pole + dx`, keeping the inverse in step.
    pub(super) fn replace(&mut self, jdrop: usize, dx: &[f64]) {
        let n = self.n;
        self.sim.col_mut(jdrop).copy_from_slice(dx);

        let temp = self.simi.row_dot(jdrop, dx);
        for i in 0..n {
            self.simi[(jdrop, i)] /= temp;
        }
        for j in (0..n).filter(|&j| j != jdrop) {
            let temp = self.simi.row_dot(j, dx);
            for i in 0..n {
                self.simi[(j, i)] -= temp * self.simi[(jdrop, i)];
            }
        }
    }

    /// Stores evaluated values for vertex `j`.
    pub(super) fn store(&mut self, j: usize, sample: Sample<I, O>) {
        self.datmat.col_mut(j).copy_from_slice(&sample.values);
        self.others[j] = sample.snapshot;
    }

    /// Rescales the penalty after a radius reduction.
    ///
    /// The penalty is capped by the spread of the objective across the
    /// simplex divided by the smallest spread of any constraint that is not
    /// comfortably satisfied at every vertex. If there is no such constraint
    /// the penalty is reset to zero.
    #[allow(clippy::float_cmp)]
    pub(super) fn rescaled_penalty(&self, parmu: f64) -> f64 {
        let mut denom = 0.0_f64;
        let mut spread = 0.0;
        for k in 0..=self.m {
            let (cmin, cmax) = self
                .datmat
                .row(k)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if k < self.m && cmin < 0.5 * cmax {
                let temp = cmax.max(0.0) - cmin;
                denom = if denom <= 0.0 { temp } else { denom.min(temp) };
            }
            spread = cmax - cmin;
        }

        if denom == 0.0 {
            0.0
        } else if spread < parmu * denom {
            spread / denom
        } else {
            parmu
        }
    }

    /// Position of the vertex at `pole + dx`.
    pub(super) fn offset<const N: usize>(&self, dx: &[f64]) -> [f64; N] {
        std::array::from_fn(|i| self.sim[(i, self.n)] + dx[i])
    }

    /// The pole as a [`Point`].
    pub(super) fn best<const N: usize>(&self) -> Point<N> {
        Point::new(
            self.offset(&[0.0; N]),
            self.objective(self.n),
            self.max_violation(self.n),
        )
    }

    pub(super) fn into_pole_snapshot(self) -> Snapshot<I, O> {
        self.pole
    }
}

#[cfg(test)]
impl<I, O> Simplex<I, O> {
    /// Scales entry `(i, j)` of the stored inverse.
    pub(super) fn scale_inverse(&mut self, i: usize, j: usize, factor: f64) {
        self.simi[(i, j)] *= factor;
    }
}
