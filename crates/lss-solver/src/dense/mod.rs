//! Dense solvers.
//!
//! `DenseSolver<K>` adapts one dense kernel to [`SolverInterface`]; the
//! factory [`make_dense_solver`] maps a catalog name to the matching kernel.
//!
//! ```text
//! make_dense_solver("ColPivHouseholderQR")
//!         │ parse against DenseSolverType::ALL
//!         ▼
//! Box<DenseSolver<ColPivHouseholderQr>>  ──decompose(A)──▶ kernel = factor(A)
//!                                        ──solve(b)─────▶ kernel.solve(b)
//! ```

mod cholesky;
mod lu;
mod qr;
mod svd;

use crate::catalog::DenseSolverType;
use crate::error::{Result, SolverError};
use crate::traits::{DenseSolverInterface, SolverInterface};
use log::debug;
use nalgebra::{DMatrix, DVector};

use cholesky::{Ldlt, Llt};
use lu::{FullPivLu, PartialPivLu};
use qr::{ColPivHouseholderQr, CompleteOrthogonalDecomposition, FullPivHouseholderQr, HouseholderQr};
use svd::{Bdcsvd, JacobiSvd};

/// A factorization of a dense matrix that can solve against new right-hand sides.
pub(crate) trait DenseKernel: Send + Sized {
    /// Factorize `a` from scratch.
    fn factor(a: &DMatrix<f64>) -> Self;

    /// Row count of the factorized matrix.
    fn nrows(&self) -> usize;

    /// Solve with a right-hand side of length `nrows()`. Singular systems give
    /// non-finite entries.
    fn solve(&self, b: &DVector<f64>) -> DVector<f64>;
}

/// Adapter exposing one dense kernel through the solver interface.
pub(crate) struct DenseSolver<K> {
    kind: DenseSolverType,
    kernel: Option<K>,
}

impl<K: DenseKernel> DenseSolver<K> {
    pub(crate) fn new(kind: DenseSolverType) -> Self {
        Self { kind, kernel: None }
    }
}

impl<K: DenseKernel> SolverInterface<DMatrix<f64>> for DenseSolver<K> {
    fn decompose(&mut self, a: &DMatrix<f64>) -> Result<()> {
        if self.kind.requires_square() && !a.is_square() {
            return Err(SolverError::NotSquare {
                solver: self.kind.name(),
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        debug!("{}: decomposing {}x{} matrix", self.kind, a.nrows(), a.ncols());
        self.kernel = Some(K::factor(a));
        Ok(())
    }

    fn solve(&mut self, b: &DVector<f64>) -> Result<DVector<f64>> {
        let kernel = self.kernel.as_ref().ok_or(SolverError::NotDecomposed)?;
        if b.len() != kernel.nrows() {
            return Err(SolverError::DimensionMismatch {
                expected: kernel.nrows(),
                found: b.len(),
            });
        }
        Ok(kernel.solve(b))
    }

    fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Make a dense solver from its catalog name.
///
/// Available types are:
///  - PartialPivLU
///  - FullPivLU
///  - HouseholderQR
///  - ColPivHouseholderQR
///  - FullPivHouseholderQR
///  - CompleteOrthogonalDecomposition
///  - BDCSVD
///  - JacobiSVD
///  - LLT
///  - LDLT
///
/// An unknown name yields [`SolverError::InvalidArgument`] listing the catalog.
/// LLT and LDLT expect symmetric positive (semi-)definite input; this is not
/// checked.
///
/// ```
/// use lss_solver::make_dense_solver;
/// use nalgebra::{DMatrix, DVector};
///
/// let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 3.0]);
/// let b = DVector::from_vec(vec![4.0, 9.0]);
/// let mut solver = make_dense_solver("PartialPivLU").unwrap();
/// solver.decompose(&a).unwrap();
/// let x = solver.solve(&b).unwrap();
/// assert!((x[0] - 2.0).abs() < 1e-12 && (x[1] - 3.0).abs() < 1e-12);
/// ```
pub fn make_dense_solver(type_name: &str) -> Result<Box<DenseSolverInterface>> {
    let kind: DenseSolverType = type_name.parse()?;
    debug!("creating dense solver {}", kind);
    Ok(dense_solver(kind))
}

/// Construct the dense solver for an already validated catalog entry.
pub fn dense_solver(kind: DenseSolverType) -> Box<DenseSolverInterface> {
    match kind {
        DenseSolverType::PartialPivLu => Box::new(DenseSolver::<PartialPivLu>::new(kind)),
        DenseSolverType::FullPivLu => Box::new(DenseSolver::<FullPivLu>::new(kind)),
        DenseSolverType::HouseholderQr => Box::new(DenseSolver::<HouseholderQr>::new(kind)),
        DenseSolverType::ColPivHouseholderQr => {
            Box::new(DenseSolver::<ColPivHouseholderQr>::new(kind))
        }
        DenseSolverType::FullPivHouseholderQr => {
            Box::new(DenseSolver::<FullPivHouseholderQr>::new(kind))
        }
        DenseSolverType::CompleteOrthogonalDecomposition => {
            Box::new(DenseSolver::<CompleteOrthogonalDecomposition>::new(kind))
        }
        DenseSolverType::Bdcsvd => Box::new(DenseSolver::<Bdcsvd>::new(kind)),
        DenseSolverType::JacobiSvd => Box::new(DenseSolver::<JacobiSvd>::new(kind)),
        DenseSolverType::Llt => Box::new(DenseSolver::<Llt>::new(kind)),
        DenseSolverType::Ldlt => Box::new(DenseSolver::<Ldlt>::new(kind)),
    }
}

/// Result returned by kernels that cannot produce a solution.
pub(crate) fn non_finite(n: usize) -> DVector<f64> {
    DVector::from_element(n, f64::NAN)
}

/// Number of leading diagonal entries of `r` above the rank threshold
/// `eps * min(m, n) * max_i |r_ii|`.
pub(crate) fn leading_rank(r: &DMatrix<f64>) -> usize {
    let k = r.nrows().min(r.ncols());
    if k == 0 {
        return 0;
    }
    let max_pivot = (0..k).map(|i| r[(i, i)].abs()).fold(0.0, f64::max);
    let threshold = f64::EPSILON * k as f64 * max_pivot;
    (0..k).take_while(|&i| r[(i, i)].abs() > threshold).count()
}
