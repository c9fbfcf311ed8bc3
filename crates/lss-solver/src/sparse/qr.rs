//! Sparse Householder QR, backed by faer.
//!
//! `SymbolicQr` orders the columns with COLAMD and computes the structure of
//! `R`; `factorize` fills in the values. Solves are least-squares solves, so
//! `A` may have more rows than columns. faer does not reveal the rank: a rank
//! deficient `A` shows up as a non-finite solution and a `NumericalIssue`.

use super::{faer_matrix, finite_or_issue, SparseKernel};
use crate::dense::non_finite;
use crate::traits::ComputationInfo;
use faer::linalg::solvers::SolveLstsqCore;
use faer::sparse::linalg::solvers::{Qr, SymbolicQr};
use faer::{Conj, MatMut};
use log::debug;
use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use nalgebra_sparse::pattern::SparsityPattern;

#[derive(Default)]
pub(crate) struct SparseQr {
    pattern: Option<SparsityPattern>,
    symbolic: Option<SymbolicQr<usize>>,
    qr: Option<Qr<usize, f64>>,
    ncols: usize,
}

impl SparseKernel for SparseQr {
    fn analyze_pattern(&mut self, a: &CscMatrix<f64>) {
        self.symbolic = None;
        self.qr = None;
        self.pattern = Some(a.pattern().clone());
        if a.nrows() < a.ncols() {
            return;
        }
        let Some(mat) = faer_matrix(a) else {
            return;
        };
        match SymbolicQr::try_new(mat.as_ref().symbolic()) {
            Ok(symbolic) => self.symbolic = Some(symbolic),
            Err(err) => debug!("SparseQR: symbolic analysis failed: {:?}", err),
        }
    }

    fn factorize(&mut self, a: &CscMatrix<f64>) -> ComputationInfo {
        self.qr = None;
        self.ncols = a.ncols();
        if a.nrows() < a.ncols() {
            debug!(
                "SparseQR: {}x{} has more columns than rows",
                a.nrows(),
                a.ncols()
            );
            return ComputationInfo::InvalidInput;
        }
        if self.pattern.as_ref() != Some(a.pattern()) {
            self.analyze_pattern(a);
        }
        let (Some(symbolic), Some(mat)) = (self.symbolic.clone(), faer_matrix(a)) else {
            return ComputationInfo::InvalidInput;
        };
        match Qr::try_new_with_symbolic(symbolic, mat.as_ref()) {
            Ok(qr) => {
                self.qr = Some(qr);
                ComputationInfo::Success
            }
            Err(err) => {
                debug!("SparseQR: numeric factorization failed: {:?}", err);
                ComputationInfo::NumericalIssue
            }
        }
    }

    fn solve(&mut self, b: &DVector<f64>) -> (DVector<f64>, ComputationInfo) {
        let Some(qr) = &self.qr else {
            return (non_finite(self.ncols), ComputationInfo::NumericalIssue);
        };
        let m = b.len();
        let mut work = b.clone();
        qr.solve_lstsq_in_place_with_conj(
            Conj::No,
            MatMut::from_column_major_slice_mut(work.as_mut_slice(), m, 1),
        );
        let x = work.rows(0, self.ncols).into_owned();
        let info = finite_or_issue(&x);
        (x, info)
    }
}
