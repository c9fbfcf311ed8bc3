//! Singular value decomposition kernels.
//!
//! Both kernels solve in the least-squares, minimum-norm sense: singular values
//! at or below `eps * min(m, n) * sigma_max` are treated as zero.

use super::{non_finite, DenseKernel};
use nalgebra::linalg::SVD;
use nalgebra::{DMatrix, DVector, Dyn};

/// Sweeps after which the Jacobi iteration gives up on further rotations.
const MAX_JACOBI_SWEEPS: usize = 60;

fn cutoff(singular_values: &DVector<f64>, nrows: usize, ncols: usize) -> f64 {
    let sigma_max = singular_values.iter().copied().fold(0.0, f64::max);
    f64::EPSILON * nrows.min(ncols) as f64 * sigma_max
}

/// Bidiagonalisation followed by implicit-shift QR (nalgebra `SVD`).
pub(crate) struct Bdcsvd {
    svd: SVD<f64, Dyn, Dyn>,
    nrows: usize,
    ncols: usize,
}

impl DenseKernel for Bdcsvd {
    fn factor(a: &DMatrix<f64>) -> Self {
        Self {
            svd: SVD::new(a.clone(), true, true),
            nrows: a.nrows(),
            ncols: a.ncols(),
        }
    }

    fn nrows(&self) -> usize {
        self.nrows
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let eps = cutoff(&self.svd.singular_values, self.nrows, self.ncols);
        self.svd
            .solve(b, eps)
            .unwrap_or_else(|_| non_finite(self.ncols))
    }
}

/// One-sided (Hestenes) Jacobi SVD.
///
/// Plane rotations are applied to the columns of `A` (or `A^T` when `A` is
/// wide) until all column pairs are orthogonal; the column norms are then the
/// singular values. The decomposition is kept as
/// `A = left * diag(sigma) * right^T`.
pub(crate) struct JacobiSvd {
    left: DMatrix<f64>,
    sigma: DVector<f64>,
    right: DMatrix<f64>,
}

impl JacobiSvd {
    /// Orthogonalise the columns of a tall matrix `w` in place, returning the
    /// accumulated rotations `v` so that `w_in * v = w_out`.
    fn orthogonalize(w: &mut DMatrix<f64>) -> DMatrix<f64> {
        let n = w.ncols();
        let mut v = DMatrix::identity(n, n);
        for _ in 0..MAX_JACOBI_SWEEPS {
            let mut rotated = false;
            for p in 0..n {
                for q in p + 1..n {
                    let alpha = w.column(p).norm_squared();
                    let beta = w.column(q).norm_squared();
                    let gamma = w.column(p).dot(&w.column(q));
                    if gamma == 0.0 || gamma.abs() <= f64::EPSILON * (alpha * beta).sqrt() {
                        continue;
                    }
                    rotated = true;

                    let zeta = (beta - alpha) / (2.0 * gamma);
                    let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = c * t;
                    rotate_columns(w, p, q, c, s);
                    rotate_columns(&mut v, p, q, c, s);
                }
            }
            if !rotated {
                break;
            }
        }
        v
    }
}

fn rotate_columns(m: &mut DMatrix<f64>, p: usize, q: usize, c: f64, s: f64) {
    for i in 0..m.nrows() {
        let mp = m[(i, p)];
        let mq = m[(i, q)];
        m[(i, p)] = c * mp - s * mq;
        m[(i, q)] = s * mp + c * mq;
    }
}

impl DenseKernel for JacobiSvd {
    fn factor(a: &DMatrix<f64>) -> Self {
        let wide = a.nrows() < a.ncols();
        let mut w = if wide { a.transpose() } else { a.clone() };
        let v = Self::orthogonalize(&mut w);

        let k = w.ncols();
        let mut sigma = DVector::zeros(k);
        for j in 0..k {
            let norm = w.column(j).norm();
            sigma[j] = norm;
            if norm > 0.0 {
                w.column_mut(j).unscale_mut(norm);
            }
        }

        // w = U (tall side), v = V; for a wide matrix the roles swap.
        let (left, right) = if wide { (v, w) } else { (w, v) };
        Self { left, sigma, right }
    }

    fn nrows(&self) -> usize {
        self.left.nrows()
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let eps = cutoff(&self.sigma, self.left.nrows(), self.right.nrows());
        let mut c = self.left.tr_mul(b);
        for (ci, &s) in c.iter_mut().zip(self.sigma.iter()) {
            *ci = if s > eps { *ci / s } else { 0.0 };
        }
        &self.right * c
    }
}
