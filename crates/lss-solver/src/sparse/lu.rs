//! Sparse LU with partial pivoting, backed by faer.
//!
//! `analyze_pattern` computes the fill-reducing column ordering and the
//! symbolic structure (`SymbolicLu`); `factorize` reuses it for every new set
//! of values.

use super::{faer_matrix, finite_or_issue, SparseKernel};
use crate::dense::non_finite;
use crate::traits::ComputationInfo;
use faer::linalg::solvers::SolveCore;
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
use faer::{Conj, MatMut};
use log::debug;
use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use nalgebra_sparse::pattern::SparsityPattern;

#[derive(Default)]
pub(crate) struct SparseLu {
    pattern: Option<SparsityPattern>,
    symbolic: Option<SymbolicLu<usize>>,
    lu: Option<Lu<usize, f64>>,
}

impl SparseKernel for SparseLu {
    fn analyze_pattern(&mut self, a: &CscMatrix<f64>) {
        self.symbolic = None;
        self.lu = None;
        self.pattern = Some(a.pattern().clone());
        if a.nrows() != a.ncols() {
            return;
        }
        let Some(mat) = faer_matrix(a) else {
            return;
        };
        match SymbolicLu::try_new(mat.as_ref().symbolic()) {
            Ok(symbolic) => self.symbolic = Some(symbolic),
            Err(err) => debug!("SparseLU: symbolic analysis failed: {:?}", err),
        }
    }

    fn factorize(&mut self, a: &CscMatrix<f64>) -> ComputationInfo {
        self.lu = None;
        if a.nrows() != a.ncols() {
            return ComputationInfo::InvalidInput;
        }
        if self.pattern.as_ref() != Some(a.pattern()) {
            self.analyze_pattern(a);
        }
        let (Some(symbolic), Some(mat)) = (self.symbolic.clone(), faer_matrix(a)) else {
            return ComputationInfo::InvalidInput;
        };
        match Lu::try_new_with_symbolic(symbolic, mat.as_ref()) {
            Ok(lu) => {
                self.lu = Some(lu);
                ComputationInfo::Success
            }
            Err(err) => {
                debug!("SparseLU: numeric factorization failed: {:?}", err);
                ComputationInfo::NumericalIssue
            }
        }
    }

    fn solve(&mut self, b: &DVector<f64>) -> (DVector<f64>, ComputationInfo) {
        let Some(lu) = &self.lu else {
            return (non_finite(b.len()), ComputationInfo::NumericalIssue);
        };
        let n = b.len();
        let mut x = b.clone();
        lu.solve_in_place_with_conj(
            Conj::No,
            MatMut::from_column_major_slice_mut(x.as_mut_slice(), n, 1),
        );
        let info = finite_or_issue(&x);
        (x, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra_sparse::CooMatrix;

    fn csc(n: usize, entries: &[(usize, usize, f64)]) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(n, n);
        for &(i, j, v) in entries {
            coo.push(i, j, v);
        }
        CscMatrix::from(&coo)
    }

    #[test]
    fn test_sparse_lu_nonsymmetric() {
        // Zero leading diagonal forces a row interchange
        let a = csc(
            4,
            &[
                (0, 0, 0.0),
                (1, 0, 3.0),
                (0, 1, 2.0),
                (2, 1, 1.0),
                (1, 2, -1.0),
                (2, 2, 4.0),
                (3, 2, 2.0),
                (0, 3, 1.0),
                (3, 3, 5.0),
            ],
        );
        let x_star = DVector::from_vec(vec![1.0, -2.0, 0.5, 3.0]);
        let b = &a * &x_star;

        let mut lu = SparseLu::default();
        lu.analyze_pattern(&a);
        assert_eq!(lu.factorize(&a), ComputationInfo::Success);
        let (x, info) = lu.solve(&b);
        assert_eq!(info, ComputationInfo::Success);
        for i in 0..4 {
            assert_relative_eq!(x[i], x_star[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sparse_lu_bidiagonal() {
        let n = 200;
        let mut entries = Vec::new();
        for i in 0..n {
            entries.push((i, i, 2.0));
            if i + 1 < n {
                entries.push((i + 1, i, -1.0));
            }
        }
        let a = csc(n, &entries);
        let x_star = DVector::from_fn(n, |i, _| 1.0 + (i % 5) as f64);
        let b = &a * &x_star;

        let mut lu = SparseLu::default();
        lu.analyze_pattern(&a);
        assert_eq!(lu.factorize(&a), ComputationInfo::Success);
        let (x, info) = lu.solve(&b);
        assert_eq!(info, ComputationInfo::Success);
        for i in 0..n {
            assert_relative_eq!(x[i], x_star[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_sparse_lu_singular() {
        // Second column is structurally empty
        let a = csc(2, &[(0, 0, 1.0), (1, 0, 1.0)]);
        let mut lu = SparseLu::default();
        lu.analyze_pattern(&a);
        let factor_info = lu.factorize(&a);
        let (x, solve_info) = lu.solve(&DVector::from_vec(vec![1.0, 1.0]));
        assert!(
            factor_info == ComputationInfo::NumericalIssue
                || solve_info == ComputationInfo::NumericalIssue
        );
        assert!(x.iter().any(|v| !v.is_finite()));
    }

    #[test]
    fn test_sparse_lu_rejects_rectangular() {
        let mut coo = CooMatrix::new(3, 2);
        coo.push(0, 0, 1.0);
        coo.push(1, 1, 1.0);
        let a = CscMatrix::from(&coo);
        let mut lu = SparseLu::default();
        lu.analyze_pattern(&a);
        assert_eq!(lu.factorize(&a), ComputationInfo::InvalidInput);
    }
}
