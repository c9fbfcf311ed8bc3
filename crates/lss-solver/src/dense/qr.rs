//! QR family kernels.
//!
//! `HouseholderQr`, `ColPivHouseholderQr` and the first stage of
//! `CompleteOrthogonalDecomposition` use nalgebra's QR / ColPivQR. nalgebra
//! has no fully pivoted QR, so `FullPivHouseholderQr` carries its own
//! Householder sweep.
//!
//! All kernels accept rectangular input and return least-squares solutions.

use super::{leading_rank, non_finite, DenseKernel};
use nalgebra::linalg::{ColPivQR, QR};
use nalgebra::{DMatrix, DVector, Dyn};

/// Householder QR without pivoting, `A = Q R`.
pub(crate) struct HouseholderQr {
    q: DMatrix<f64>,
    r: DMatrix<f64>,
}

impl DenseKernel for HouseholderQr {
    fn factor(a: &DMatrix<f64>) -> Self {
        let qr = QR::new(a.clone());
        Self {
            q: qr.q(),
            r: qr.unpack_r(),
        }
    }

    fn nrows(&self) -> usize {
        self.q.nrows()
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let k = self.r.nrows();
        let n = self.r.ncols();
        let c = self.q.tr_mul(b);
        let mut x = DVector::zeros(n);
        if k == 0 {
            return x;
        }
        match self.r.view((0, 0), (k, k)).solve_upper_triangular(&c) {
            Some(y) => x.rows_mut(0, k).copy_from(&y),
            None => return non_finite(n),
        }
        x
    }
}

/// Householder QR with column pivoting, `A P = Q R`.
///
/// Columns past the numerical rank get a zero coefficient (basic solution).
pub(crate) struct ColPivHouseholderQr {
    qr: ColPivQR<f64, Dyn, Dyn>,
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    rank: usize,
}

impl DenseKernel for ColPivHouseholderQr {
    fn factor(a: &DMatrix<f64>) -> Self {
        let qr = ColPivQR::new(a.clone());
        let q = qr.q();
        let r = qr.r();
        let rank = leading_rank(&r);
        Self { qr, q, r, rank }
    }

    fn nrows(&self) -> usize {
        self.q.nrows()
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let n = self.r.ncols();
        let c = self.q.tr_mul(b);
        let mut x = DVector::zeros(n);
        if self.rank > 0 {
            let head = c.rows(0, self.rank);
            match self
                .r
                .view((0, 0), (self.rank, self.rank))
                .solve_upper_triangular(&head)
            {
                Some(y) => x.rows_mut(0, self.rank).copy_from(&y),
                None => return non_finite(n),
            }
        }
        self.qr.p().inv_permute_rows(&mut x);
        x
    }
}

/// Householder QR with full pivoting, `P A P' = Q R`.
///
/// Householder vectors are stored below the diagonal of `qr` with an implicit
/// leading one; `coeffs[i]` is the matching `tau`.
pub(crate) struct FullPivHouseholderQr {
    qr: DMatrix<f64>,
    coeffs: Vec<f64>,
    row_transpositions: Vec<usize>,
    col_transpositions: Vec<usize>,
    rank: usize,
}

impl DenseKernel for FullPivHouseholderQr {
    fn factor(a: &DMatrix<f64>) -> Self {
        let (m, n) = a.shape();
        let k = m.min(n);
        let mut qr = a.clone();
        let mut coeffs = vec![0.0; k];
        let mut row_transpositions: Vec<usize> = (0..k).collect();
        let mut col_transpositions: Vec<usize> = (0..k).collect();

        for i in 0..k {
            let (mut piv_row, mut piv_col, mut biggest) = (i, i, 0.0);
            for c in i..n {
                for r in i..m {
                    let v = qr[(r, c)].abs();
                    if v > biggest {
                        biggest = v;
                        piv_row = r;
                        piv_col = c;
                    }
                }
            }
            if biggest == 0.0 {
                // Trailing block is exactly zero
                break;
            }

            row_transpositions[i] = piv_row;
            col_transpositions[i] = piv_col;
            // Only the active block takes part in the row exchange: columns
            // left of `i` hold earlier Householder vectors.
            if piv_row != i {
                for c in i..n {
                    qr.swap((i, c), (piv_row, c));
                }
            }
            if piv_col != i {
                qr.swap_columns(i, piv_col);
            }

            let c0 = qr[(i, i)];
            let tail_sq: f64 = (i + 1..m).map(|r| qr[(r, i)] * qr[(r, i)]).sum();
            if tail_sq == 0.0 {
                continue;
            }
            let norm = (c0 * c0 + tail_sq).sqrt();
            let beta = if c0 >= 0.0 { -norm } else { norm };
            let scale = 1.0 / (c0 - beta);
            for r in i + 1..m {
                qr[(r, i)] *= scale;
            }
            let tau = (beta - c0) / beta;
            coeffs[i] = tau;
            qr[(i, i)] = beta;

            for c in i + 1..n {
                let mut w = qr[(i, c)];
                for r in i + 1..m {
                    w += qr[(r, i)] * qr[(r, c)];
                }
                w *= tau;
                qr[(i, c)] -= w;
                for r in i + 1..m {
                    let v = qr[(r, i)];
                    qr[(r, c)] -= w * v;
                }
            }
        }

        let rank = leading_rank(&qr);
        Self {
            qr,
            coeffs,
            row_transpositions,
            col_transpositions,
            rank,
        }
    }

    fn nrows(&self) -> usize {
        self.qr.nrows()
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let (m, n) = self.qr.shape();
        let mut c = b.clone();
        for (i, &tau) in self.coeffs.iter().enumerate() {
            c.swap_rows(i, self.row_transpositions[i]);
            if tau == 0.0 {
                continue;
            }
            let mut w = c[i];
            for r in i + 1..m {
                w += self.qr[(r, i)] * c[r];
            }
            w *= tau;
            c[i] -= w;
            for r in i + 1..m {
                c[r] -= w * self.qr[(r, i)];
            }
        }

        let mut x = DVector::zeros(n);
        for i in (0..self.rank).rev() {
            let mut s = c[i];
            for j in i + 1..self.rank {
                s -= self.qr[(i, j)] * x[j];
            }
            x[i] = s / self.qr[(i, i)];
        }
        for i in (0..self.col_transpositions.len()).rev() {
            x.swap_rows(i, self.col_transpositions[i]);
        }
        x
    }
}

/// Complete orthogonal decomposition `A P = Q [T 0; 0 0] Z^T`.
///
/// The column-pivoted QR gives the numerical rank `r`; the leading `r` rows of
/// `R` are then reduced by a QR of their transpose, which yields the
/// minimum-norm least-squares solution.
pub(crate) struct CompleteOrthogonalDecomposition {
    qr: ColPivQR<f64, Dyn, Dyn>,
    q: DMatrix<f64>,
    /// n x rank, orthonormal columns spanning the row space of R
    z: DMatrix<f64>,
    /// rank x rank upper triangular, `R[..rank, :] = t^T z^T`
    t: DMatrix<f64>,
    rank: usize,
    ncols: usize,
}

impl DenseKernel for CompleteOrthogonalDecomposition {
    fn factor(a: &DMatrix<f64>) -> Self {
        let qr = ColPivQR::new(a.clone());
        let q = qr.q();
        let r = qr.r();
        let rank = leading_rank(&r);
        let (z, t) = if rank > 0 {
            let trapezoid_t = r.rows(0, rank).transpose();
            let second = QR::new(trapezoid_t);
            (second.q(), second.unpack_r())
        } else {
            (DMatrix::zeros(a.ncols(), 0), DMatrix::zeros(0, 0))
        };
        Self {
            qr,
            q,
            z,
            t,
            rank,
            ncols: a.ncols(),
        }
    }

    fn nrows(&self) -> usize {
        self.q.nrows()
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let mut x = DVector::zeros(self.ncols);
        if self.rank == 0 {
            return x;
        }
        let c = self.q.tr_mul(b);
        let head = c.rows(0, self.rank);
        let w = match self.t.tr_solve_upper_triangular(&head) {
            Some(w) => w,
            None => return non_finite(self.ncols),
        };
        x.copy_from(&(&self.z * w));
        self.qr.p().inv_permute_rows(&mut x);
        x
    }
}
