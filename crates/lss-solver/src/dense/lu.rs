//! LU kernels backed by nalgebra.

use super::{non_finite, DenseKernel};
use nalgebra::linalg::{FullPivLU, LU};
use nalgebra::{DMatrix, DVector, Dyn};

/// LU with partial pivoting.
pub(crate) struct PartialPivLu {
    lu: LU<f64, Dyn, Dyn>,
    nrows: usize,
}

impl DenseKernel for PartialPivLu {
    fn factor(a: &DMatrix<f64>) -> Self {
        Self {
            lu: LU::new(a.clone()),
            nrows: a.nrows(),
        }
    }

    fn nrows(&self) -> usize {
        self.nrows
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        self.lu.solve(b).unwrap_or_else(|| non_finite(self.nrows))
    }
}

/// LU with full (row and column) pivoting.
pub(crate) struct FullPivLu {
    lu: FullPivLU<f64, Dyn, Dyn>,
    nrows: usize,
}

impl DenseKernel for FullPivLu {
    fn factor(a: &DMatrix<f64>) -> Self {
        Self {
            lu: FullPivLU::new(a.clone()),
            nrows: a.nrows(),
        }
    }

    fn nrows(&self) -> usize {
        self.nrows
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        self.lu.solve(b).unwrap_or_else(|| non_finite(self.nrows))
    }
}
