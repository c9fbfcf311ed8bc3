//! Preconditioners for BiCGSTAB.
//!
//! A preconditioner approximates `A^(-1)`. It goes through the same two
//! phases as the solver that owns it: `analyze_pattern` once per sparsity
//! pattern, `factorize` once per set of values.
//!
//! - `IdentityPreconditioner`: no preconditioning
//! - `DiagonalPreconditioner` (Jacobi): scales by `1 / A_ii`
//! - `IncompleteLut`: dual-threshold incomplete LU
//! - `SimplicialCholesky`: complete sparse Cholesky `L L^T`

use crate::catalog::PreconditionerType;
use crate::config::IlutConfig;
use crate::traits::ComputationInfo;
use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::{CscCholesky, CscSymbolicCholesky};
use nalgebra_sparse::CscMatrix;
use nalgebra_sparse::pattern::SparsityPattern;
use std::collections::BTreeMap;

/// Approximate inverse of a square sparse matrix.
pub(crate) trait Preconditioner: Send {
    /// Catalog entry this preconditioner implements.
    const KIND: PreconditionerType;

    /// Symbolic phase. The default does nothing.
    fn analyze_pattern(&mut self, _a: &CscMatrix<f64>) {}

    /// Numeric phase, `a` is square.
    fn factorize(&mut self, a: &CscMatrix<f64>) -> ComputationInfo;

    /// `M^(-1) r`
    fn apply(&self, r: &DVector<f64>) -> DVector<f64>;
}

/// `M = I`
#[derive(Debug, Clone, Default)]
pub(crate) struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    const KIND: PreconditionerType = PreconditionerType::Identity;

    fn factorize(&mut self, _a: &CscMatrix<f64>) -> ComputationInfo {
        ComputationInfo::Success
    }

    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        r.clone()
    }
}

/// Diagonal (Jacobi) preconditioner
///
/// M = diag(A); a zero or missing diagonal entry is replaced by one.
#[derive(Debug, Clone, Default)]
pub(crate) struct DiagonalPreconditioner {
    inv_diag: Vec<f64>,
}

impl Preconditioner for DiagonalPreconditioner {
    const KIND: PreconditionerType = PreconditionerType::Diagonal;

    fn factorize(&mut self, a: &CscMatrix<f64>) -> ComputationInfo {
        let mut inv_diag = vec![1.0; a.ncols()];
        for j in 0..a.ncols() {
            let col = a.col(j);
            for (&i, &v) in col.row_indices().iter().zip(col.values()) {
                if i == j && v != 0.0 {
                    inv_diag[j] = 1.0 / v;
                }
            }
        }
        self.inv_diag = inv_diag;
        ComputationInfo::Success
    }

    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            r.len(),
            r.iter().zip(&self.inv_diag).map(|(ri, di)| ri * di),
        )
    }
}

/// Incomplete LU with dual threshold (ILUT).
///
/// Rows of `A` are eliminated one at a time in their natural order. Entries
/// smaller than `drop_tolerance * ||row||` are dropped, and
/// only the `fill_in` largest entries of each row of `L` and of `U` are kept.
pub(crate) struct IncompleteLut {
    config: IlutConfig,
    l_rows: Vec<Vec<(usize, f64)>>,
    u_rows: Vec<Vec<(usize, f64)>>,
    diag: Vec<f64>,
}

impl IncompleteLut {
    pub(crate) fn new(config: IlutConfig) -> Self {
        Self {
            config,
            l_rows: Vec::new(),
            u_rows: Vec::new(),
            diag: Vec::new(),
        }
    }

    /// Keep the `limit` largest entries by magnitude, sorted by column.
    fn keep_largest(mut entries: Vec<(usize, f64)>, limit: usize) -> Vec<(usize, f64)> {
        if entries.len() > limit {
            entries.sort_by(|x, y| y.1.abs().total_cmp(&x.1.abs()));
            entries.truncate(limit);
            entries.sort_by_key(|&(j, _)| j);
        }
        entries
    }
}

impl Preconditioner for IncompleteLut {
    const KIND: PreconditionerType = PreconditionerType::IncompleteLut;

    fn factorize(&mut self, a: &CscMatrix<f64>) -> ComputationInfo {
        let n = a.ncols();
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (i, j, &v) in a.triplet_iter() {
            rows[i].push((j, v));
        }

        let fill_in = ((a.nnz() * self.config.fill_factor) / n.max(1) + 1).min(n);
        let droptol = self.config.drop_tolerance;
        let mut l_rows: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
        let mut u_rows: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
        let mut diag: Vec<f64> = Vec::with_capacity(n);

        for (i, row) in rows.into_iter().enumerate() {
            let mut w: BTreeMap<usize, f64> = BTreeMap::new();
            for (j, v) in row {
                *w.entry(j).or_insert(0.0) += v;
            }
            let row_norm = w.values().map(|v| v * v).sum::<f64>().sqrt();
            let cutoff = droptol * row_norm;

            let mut next = w.range(..i).next().map(|(&k, _)| k);
            while let Some(k) = next {
                let l = w[&k] / diag[k];
                if l.abs() <= cutoff {
                    w.remove(&k);
                } else {
                    w.insert(k, l);
                    for &(j, u) in &u_rows[k] {
                        *w.entry(j).or_insert(0.0) -= l * u;
                    }
                }
                next = w.range(k + 1..i).next().map(|(&k, _)| k);
            }

            let mut d = w.remove(&i).unwrap_or(0.0);
            if d == 0.0 {
                d = if row_norm > 0.0 {
                    droptol.sqrt() * row_norm
                } else {
                    1.0
                };
            }

            let (lower, upper): (Vec<_>, Vec<_>) = w
                .into_iter()
                .filter(|&(_, v)| v.abs() > cutoff)
                .partition(|&(j, _)| j < i);
            l_rows.push(Self::keep_largest(lower, fill_in));
            u_rows.push(Self::keep_largest(upper, fill_in));
            diag.push(d);
        }

        debug!(
            "IncompleteLUT: {} rows, fill in {}, nnz(L) {}, nnz(U) {}",
            n,
            fill_in,
            l_rows.iter().map(Vec::len).sum::<usize>(),
            u_rows.iter().map(Vec::len).sum::<usize>()
        );
        self.l_rows = l_rows;
        self.u_rows = u_rows;
        self.diag = diag;
        ComputationInfo::Success
    }

    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        let n = self.diag.len();
        let mut y = r.clone();
        for i in 0..n {
            let s: f64 = self.l_rows[i].iter().map(|&(j, l)| l * y[j]).sum();
            y[i] -= s;
        }
        for i in (0..n).rev() {
            let s: f64 = self.u_rows[i].iter().map(|&(j, u)| u * y[j]).sum();
            y[i] = (y[i] - s) / self.diag[i];
        }
        y
    }
}

/// Sparse Cholesky `A = L L^T` used as an exact preconditioner.
///
/// The elimination tree and the pattern of `L` are computed in
/// `analyze_pattern`; `factorize` only fills in the values. A matrix that is
/// not positive definite reports `NumericalIssue`.
#[derive(Default)]
pub(crate) struct SimplicialCholesky {
    pattern: Option<SparsityPattern>,
    symbolic: Option<CscSymbolicCholesky>,
    factor: Option<CscCholesky<f64>>,
}

impl Preconditioner for SimplicialCholesky {
    const KIND: PreconditionerType = PreconditionerType::SimplicialCholesky;

    fn analyze_pattern(&mut self, a: &CscMatrix<f64>) {
        self.pattern = Some(a.pattern().clone());
        self.symbolic = Some(CscSymbolicCholesky::factor(a.pattern().clone()));
        self.factor = None;
    }

    fn factorize(&mut self, a: &CscMatrix<f64>) -> ComputationInfo {
        if self.pattern.as_ref() != Some(a.pattern()) {
            self.analyze_pattern(a);
        }
        let Some(symbolic) = self.symbolic.clone() else {
            return ComputationInfo::InvalidInput;
        };
        match CscCholesky::factor_numerical(symbolic, a.values()) {
            Ok(factor) => {
                self.factor = Some(factor);
                ComputationInfo::Success
            }
            Err(err) => {
                debug!("SimplicialCholesky: {:?}", err);
                self.factor = None;
                ComputationInfo::NumericalIssue
            }
        }
    }

    fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        match &self.factor {
            Some(factor) => {
                let rhs = DMatrix::from_column_slice(r.len(), 1, r.as_slice());
                let x = factor.solve(&rhs);
                DVector::from_column_slice(x.as_slice())
            }
            None => r.clone(),
        }
    }
}
