use std::ops::{Index, IndexMut};

/// Dense column-major matrix sized once per run.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub(super) fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub(super) fn rows(&self) -> usize {
        self.rows
    }

    pub(super) fn col(&self, j: usize) -> &[f64] {
        &self.data[j * self.rows..(j + 1) * self.rows]
    }

    pub(super) fn col_mut(&mut self, j: usize) -> &mut [f64] {
        &mut self.data[j * self.rows..(j + 1) * self.rows]
    }

    /// Iterates over row `i`, left to right.
    pub(super) fn row(&self, i: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.cols).map(move |j| self[(i, j)])
    }

    /// Dot product of row `i` with `v`.
    pub(super) fn row_dot(&self, i: usize, v: &[f64]) -> f64 {
        self.row(i).zip(v).map(|(r, x)| r * x).sum()
    }

    pub(super) fn swap_cols(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for i in 0..self.rows {
            self.data.swap(a * self.rows + i, b * self.rows + i);
        }
    }

    /// Applies `(z_k, z_l) <- (c*z_k + s*z_l, c*z_l - s*z_k)` to columns `k`, `l`.
    pub(super) fn rotate_cols(&mut self, k: usize, l: usize, c: f64, s: f64) {
        for i in 0..self.rows {
            let zk = self[(i, k)];
            let zl = self[(i, l)];
            self[(i, k)] = c * zk + s * zl;
            self[(i, l)] = c * zl - s * zk;
        }
    }

    /// Applies `(z_k, z_l) <- (c*z_l + s*z_k, c*z_k - s*z_l)` to columns `k`, `l`.
    ///
    /// This is the rotation that exchanges the roles of two adjacent columns
    /// of an orthogonal factor while keeping the triangular structure.
    pub(super) fn exchange_cols(&mut self, k: usize, l: usize, c: f64, s: f64) {
        for i in 0..self.rows {
            let zk = self[(i, k)];
            let zl = self[(i, l)];
            self[(i, k)] = c * zl + s * zk;
            self[(i, l)] = c * zk - s * zl;
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[j * self.rows + i]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[j * self.rows + i]
    }
}

pub(super) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(super) fn norm_sq(a: &[f64]) -> f64 {
    a.iter().map(|x| x * x).sum()
}

/// Returns `value`, or zero if it cannot be told apart from rounding noise.
///
/// `magnitude` is the sum of absolute values of the terms that produced
/// `value`. When adding a tenth of `|value|` to it does not change it, the
/// cancellation is total and the result is treated as exactly zero.
#[allow(clippy::float_cmp)]
pub(super) fn snap_to_zero(value: f64, magnitude: f64) -> f64 {
    let acca = magnitude + 0.1 * value.abs();
    let accb = magnitude + 0.2 * value.abs();
    if magnitude >= acca || acca >= accb {
        0.0
    } else {
        value
    }
}

/// Dot product with [`snap_to_zero`] applied to the result.
pub(super) fn guarded_dot(a: &[f64], b: &[f64]) -> f64 {
    let (sum, magnitude) = a.iter().zip(b).fold((0.0, 0.0), |(sum, mag), (x, y)| {
        let term = x * y;
        (sum + term, mag + term.abs())
    });
    snap_to_zero(sum, magnitude)
}
