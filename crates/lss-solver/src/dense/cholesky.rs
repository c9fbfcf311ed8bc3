//! Cholesky family kernels. Both read only the lower triangle of `A`.

use super::{non_finite, DenseKernel};
use faer::linalg::solvers::{Lblt, SolveCore};
use faer::{Conj, Mat, MatMut, Side};
use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector, Dyn};

/// `A = L L^T` for symmetric positive definite `A` (nalgebra `Cholesky`).
///
/// A matrix that is not positive definite leaves no factor behind and every
/// subsequent solve yields NaN.
pub(crate) struct Llt {
    chol: Option<Cholesky<f64, Dyn>>,
    nrows: usize,
}

impl DenseKernel for Llt {
    fn factor(a: &DMatrix<f64>) -> Self {
        Self {
            chol: Cholesky::new(a.clone()),
            nrows: a.nrows(),
        }
    }

    fn nrows(&self) -> usize {
        self.nrows
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        match &self.chol {
            Some(chol) => chol.solve(b),
            None => non_finite(self.nrows),
        }
    }
}

/// `P A P^T = L D L^T` with Bunch-Kaufman pivoting (faer `Lblt`).
///
/// `D` has 1x1 and 2x2 blocks, so symmetric indefinite input factors as well.
/// A singular `A` gives non-finite solutions.
pub(crate) struct Ldlt {
    lblt: Lblt<f64>,
    nrows: usize,
}

impl DenseKernel for Ldlt {
    fn factor(a: &DMatrix<f64>) -> Self {
        let n = a.nrows();
        let mat = Mat::from_fn(n, n, |i, j| a[(i, j)]);
        Self {
            lblt: Lblt::new(mat.as_ref(), Side::Lower),
            nrows: n,
        }
    }

    fn nrows(&self) -> usize {
        self.nrows
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let mut x = b.clone();
        self.lblt.solve_in_place_with_conj(
            Conj::No,
            MatMut::from_column_major_slice_mut(x.as_mut_slice(), self.nrows, 1),
        );
        x
    }
}
