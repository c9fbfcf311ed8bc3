//! Sparse solvers.
//!
//! `SparseSolver<K>` adapts one sparse kernel to [`SparseSolverInterface`]
//! and tracks the symbolic/numeric state; kernels only see the matrices.
//!
//! | name     | kernel                                  | ordering             |
//! |----------|-----------------------------------------|----------------------|
//! | BiCGSTAB | right-preconditioned BiCGSTAB           | (preconditioner's)   |
//! | SparseQR | faer sparse Householder QR              | COLAMD (faer)        |
//! | SparseLU | faer sparse LU, partial pivoting        | COLAMD (faer)        |

mod bicgstab;
mod lu;
mod preconditioners;
mod qr;

use crate::catalog::{PreconditionerType, SparseSolverType};
use crate::config::SparseSolverConfig;
use crate::error::{Result, SolverError};
use crate::traits::{ComputationInfo, SolveInfo, SolverInterface, SparseSolverInterface};
use crate::dense::non_finite;
use faer::sparse::{SparseColMat, Triplet};
use log::{debug, warn};
use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;

use bicgstab::BiCgStab;
use lu::SparseLu;
use preconditioners::{
    DiagonalPreconditioner, IdentityPreconditioner, IncompleteLut, SimplicialCholesky,
};
use qr::SparseQr;

/// Two-phase factorization of a sparse matrix.
pub(crate) trait SparseKernel: Send {
    /// Symbolic phase: orderings and anything else that depends on the
    /// pattern alone.
    fn analyze_pattern(&mut self, a: &CscMatrix<f64>);

    /// Numeric phase against the analyzed pattern.
    fn factorize(&mut self, a: &CscMatrix<f64>) -> ComputationInfo;

    /// Solve with a right-hand side of length `nrows`.
    fn solve(&mut self, b: &DVector<f64>) -> (DVector<f64>, ComputationInfo);

    fn solve_info(&self) -> Option<SolveInfo> {
        None
    }
}

/// Shape and non-zero count the symbolic analysis was done for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PatternKey {
    nrows: usize,
    ncols: usize,
    nnz: usize,
}

impl PatternKey {
    fn of(a: &CscMatrix<f64>) -> Self {
        Self {
            nrows: a.nrows(),
            ncols: a.ncols(),
            nnz: a.nnz(),
        }
    }
}

/// Adapter exposing one sparse kernel through the sparse solver interface.
pub(crate) struct SparseSolver<K> {
    kind: SparseSolverType,
    kernel: K,
    analyzed: Option<PatternKey>,
    /// Shape of the factorized matrix
    factorized: Option<(usize, usize)>,
    /// Status of the last `factorize`, kept across solves
    factor_info: ComputationInfo,
    info: ComputationInfo,
}

impl<K: SparseKernel> SparseSolver<K> {
    pub(crate) fn new(kind: SparseSolverType, kernel: K) -> Self {
        Self {
            kind,
            kernel,
            analyzed: None,
            factorized: None,
            factor_info: ComputationInfo::default(),
            info: ComputationInfo::default(),
        }
    }
}

impl<K: SparseKernel> SolverInterface<CscMatrix<f64>> for SparseSolver<K> {
    fn decompose(&mut self, a: &CscMatrix<f64>) -> Result<()> {
        self.analyze_pattern(a)?;
        self.factorize(a)
    }

    fn solve(&mut self, b: &DVector<f64>) -> Result<DVector<f64>> {
        let (nrows, ncols) = self.factorized.ok_or(SolverError::NotDecomposed)?;
        if b.len() != nrows {
            return Err(SolverError::DimensionMismatch {
                expected: nrows,
                found: b.len(),
            });
        }
        if self.factor_info != ComputationInfo::Success {
            self.info = self.factor_info;
            return Ok(non_finite(ncols));
        }
        let (x, info) = self.kernel.solve(b);
        if info != ComputationInfo::Success {
            warn!("{}: solve finished with {}", self.kind, info.as_str());
        }
        self.info = info;
        Ok(x)
    }

    fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl<K: SparseKernel> SparseSolverInterface for SparseSolver<K> {
    fn analyze_pattern(&mut self, a: &CscMatrix<f64>) -> Result<()> {
        debug!(
            "{}: analyzing {}x{} pattern with {} non-zeros",
            self.kind,
            a.nrows(),
            a.ncols(),
            a.nnz()
        );
        self.kernel.analyze_pattern(a);
        self.analyzed = Some(PatternKey::of(a));
        self.factorized = None;
        self.factor_info = ComputationInfo::Success;
        self.info = ComputationInfo::Success;
        Ok(())
    }

    fn factorize(&mut self, a: &CscMatrix<f64>) -> Result<()> {
        if self.analyzed != Some(PatternKey::of(a)) {
            self.analyze_pattern(a)?;
        }
        debug!("{}: factorizing", self.kind);
        self.info = self.kernel.factorize(a);
        self.factor_info = self.info;
        if self.info != ComputationInfo::Success {
            warn!("{}: factorization finished with {}", self.kind, self.info.as_str());
        }
        self.factorized = Some((a.nrows(), a.ncols()));
        Ok(())
    }

    fn info(&self) -> ComputationInfo {
        self.info
    }

    fn solve_info(&self) -> Option<SolveInfo> {
        self.kernel.solve_info()
    }
}

/// Make a sparse solver from its catalog name with the default configuration.
///
/// Valid sparse solver types are:
///  - BiCGSTAB
///  - SparseQR
///  - SparseLU
///
/// `preconditioner` selects the BiCGSTAB preconditioner and is ignored by
/// the direct solvers. Valid preconditioners are:
///  - SimplicialCholesky
///  - IncompleteLUT
///  - Diagonal
///  - Identity
///
/// ```
/// use lss_solver::make_sparse_solver;
/// use nalgebra::DVector;
/// use nalgebra_sparse::{CooMatrix, CscMatrix};
///
/// let mut coo = CooMatrix::new(2, 2);
/// coo.push(0, 0, 2.0);
/// coo.push(1, 1, 3.0);
/// let a = CscMatrix::from(&coo);
///
/// let mut solver = make_sparse_solver("BiCGSTAB", "Diagonal").unwrap();
/// solver.decompose(&a).unwrap();
/// let x = solver.solve(&DVector::from_vec(vec![4.0, 9.0])).unwrap();
/// assert!(!solver.fail());
/// assert!((x[0] - 2.0).abs() < 1e-10 && (x[1] - 3.0).abs() < 1e-10);
/// ```
pub fn make_sparse_solver(
    type_name: &str,
    preconditioner: &str,
) -> Result<Box<dyn SparseSolverInterface>> {
    make_sparse_solver_with_config(type_name, preconditioner, &SparseSolverConfig::default())
}

/// Make a sparse solver from its catalog name with explicit tuning.
pub fn make_sparse_solver_with_config(
    type_name: &str,
    preconditioner: &str,
    config: &SparseSolverConfig,
) -> Result<Box<dyn SparseSolverInterface>> {
    let kind: SparseSolverType = type_name.parse()?;
    if !kind.is_iterative() && !preconditioner.is_empty() {
        debug!("{}: ignoring preconditioner {:?}", kind, preconditioner);
    }
    let solver: Box<dyn SparseSolverInterface> = match kind {
        SparseSolverType::SparseLu => Box::new(SparseSolver::new(kind, SparseLu::default())),
        SparseSolverType::SparseQr => {
            Box::new(SparseSolver::new(kind, SparseQr::default()))
        }
        SparseSolverType::BiCgStab => {
            let preconditioner: PreconditionerType = preconditioner.parse()?;
            debug!("creating BiCGSTAB with {} preconditioner", preconditioner);
            bicgstab_solver(preconditioner, config)
        }
    };
    debug!("creating sparse solver {}", kind);
    Ok(solver)
}

fn bicgstab_solver(
    preconditioner: PreconditionerType,
    config: &SparseSolverConfig,
) -> Box<dyn SparseSolverInterface> {
    let kind = SparseSolverType::BiCgStab;
    let iterative = config.iterative.clone();
    match preconditioner {
        PreconditionerType::SimplicialCholesky => Box::new(SparseSolver::new(
            kind,
            BiCgStab::new(SimplicialCholesky::default(), iterative),
        )),
        PreconditionerType::IncompleteLut => Box::new(SparseSolver::new(
            kind,
            BiCgStab::new(IncompleteLut::new(config.ilut.clone()), iterative),
        )),
        PreconditionerType::Diagonal => Box::new(SparseSolver::new(
            kind,
            BiCgStab::new(DiagonalPreconditioner::default(), iterative),
        )),
        PreconditionerType::Identity => Box::new(SparseSolver::new(
            kind,
            BiCgStab::new(IdentityPreconditioner, iterative),
        )),
    }
}

/// Copy `a` into faer's CSC representation.
pub(crate) fn faer_matrix(a: &CscMatrix<f64>) -> Option<SparseColMat<usize, f64>> {
    let triplets: Vec<_> = a
        .triplet_iter()
        .map(|(i, j, &v)| Triplet::new(i, j, v))
        .collect();
    match SparseColMat::try_new_from_triplets(a.nrows(), a.ncols(), &triplets) {
        Ok(mat) => Some(mat),
        Err(err) => {
            debug!("cannot convert {}x{} matrix: {:?}", a.nrows(), a.ncols(), err);
            None
        }
    }
}

/// `NumericalIssue` when the solution has non-finite entries.
pub(crate) fn finite_or_issue(x: &DVector<f64>) -> ComputationInfo {
    if x.iter().all(|v| v.is_finite()) {
        ComputationInfo::Success
    } else {
        ComputationInfo::NumericalIssue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra_sparse::CooMatrix;

    fn spd_tridiagonal(n: usize) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(n, n);
        for i in 0..n {
            coo.push(i, i, 4.0);
            if i + 1 < n {
                coo.push(i, i + 1, -1.0);
                coo.push(i + 1, i, -1.0);
            }
        }
        CscMatrix::from(&coo)
    }

    #[test]
    fn test_fail_is_false_before_any_step() {
        for kind in SparseSolverType::ALL {
            let solver = make_sparse_solver(kind.name(), "Identity").unwrap();
            assert!(!solver.fail());
            assert_eq!(solver.info(), ComputationInfo::Success);
            assert!(solver.solve_info().is_none());
        }
    }

    #[test]
    fn test_solve_before_factorize() {
        let a = spd_tridiagonal(3);
        let mut solver = make_sparse_solver("SparseLU", "").unwrap();
        let b = DVector::from_element(3, 1.0);
        assert_eq!(solver.solve(&b).unwrap_err(), SolverError::NotDecomposed);

        solver.analyze_pattern(&a).unwrap();
        assert_eq!(solver.solve(&b).unwrap_err(), SolverError::NotDecomposed);

        solver.factorize(&a).unwrap();
        assert!(solver.solve(&b).is_ok());
    }

    #[test]
    fn test_factorize_without_analysis_runs_it() {
        let a = spd_tridiagonal(5);
        let x_star = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = &a * &x_star;
        for name in ["SparseLU", "SparseQR"] {
            let mut solver = make_sparse_solver(name, "").unwrap();
            solver.factorize(&a).unwrap();
            assert!(!solver.fail());
            let x = solver.solve(&b).unwrap();
            for i in 0..5 {
                assert_relative_eq!(x[i], x_star[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_rhs_dimension_mismatch() {
        let a = spd_tridiagonal(4);
        let mut solver = make_sparse_solver("SparseQR", "").unwrap();
        solver.decompose(&a).unwrap();
        assert_eq!(
            solver.solve(&DVector::zeros(3)).unwrap_err(),
            SolverError::DimensionMismatch {
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_preconditioner_ignored_for_direct_solvers() {
        assert!(make_sparse_solver("SparseLU", "NotAPreconditioner").is_ok());
        assert!(make_sparse_solver("SparseQR", "").is_ok());
        assert!(make_sparse_solver("BiCGSTAB", "").is_err());
    }

    fn csc(m: usize, n: usize, entries: &[(usize, usize, f64)]) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(m, n);
        for &(i, j, v) in entries {
            coo.push(i, j, v);
        }
        CscMatrix::from(&coo)
    }

    #[test]
    fn test_solve_keeps_factorization_status() {
        let tall = csc(3, 2, &[(0, 0, 1.0), (1, 1, 1.0)]);
        let wide = csc(2, 3, &[(0, 0, 1.0), (1, 1, 1.0), (0, 2, 1.0)]);
        for (name, preconditioner, a) in [
            ("SparseLU", "", &tall),
            ("BiCGSTAB", "Identity", &tall),
            ("SparseQR", "", &wide),
        ] {
            let mut solver = make_sparse_solver(name, preconditioner).unwrap();
            solver.decompose(a).unwrap();
            assert_eq!(solver.info(), ComputationInfo::InvalidInput, "{}", name);

            let x = solver.solve(&DVector::from_element(a.nrows(), 1.0)).unwrap();
            assert_eq!(x.len(), a.ncols());
            assert!(x.iter().all(|v| v.is_nan()));
            assert_eq!(solver.info(), ComputationInfo::InvalidInput, "{}", name);
        }
    }

    #[test]
    fn test_refactorize_with_new_pattern() {
        let a = spd_tridiagonal(4);
        // Same shape and non-zero count as `a`, different pattern
        let other = csc(
            4,
            4,
            &[
                (0, 0, 4.0),
                (1, 1, 4.0),
                (2, 2, 4.0),
                (3, 3, 4.0),
                (0, 3, 1.0),
                (1, 0, 1.0),
                (1, 3, 1.0),
                (2, 0, 1.0),
                (2, 3, 1.0),
                (3, 0, 1.0),
            ],
        );
        assert_eq!(a.nnz(), other.nnz());
        let x_star = DVector::from_vec(vec![1.0, -1.0, 2.0, 0.5]);
        for name in ["SparseLU", "SparseQR"] {
            let mut solver = make_sparse_solver(name, "").unwrap();
            solver.decompose(&a).unwrap();
            solver.factorize(&other).unwrap();
            assert!(!solver.fail());
            let x = solver.solve(&(&other * &x_star)).unwrap();
            for i in 0..4 {
                assert_relative_eq!(x[i], x_star[i], epsilon = 1e-12);
            }
        }
    }
}
