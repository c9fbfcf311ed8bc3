//! Solver trait definitions.
//!
//! These traits are the single call-site contract shared by every algorithm
//! in the catalogs. Callers hold a `Box<dyn …>` returned by a factory and
//! never name the concrete kernel.

use crate::error::Result;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;
use serde::Serialize;

/// Outcome of the most recent factorization or solve step of a sparse solver.
///
/// Serializes to the same lowercase identifier as [`ComputationInfo::as_str`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationInfo {
    /// The step completed.
    #[default]
    Success,
    /// The factorization hit a zero pivot, a non-SPD matrix or a breakdown.
    NumericalIssue,
    /// An iterative solve exhausted its budget before reaching the tolerance.
    NoConvergence,
    /// The input cannot be handled by the algorithm (e.g. rectangular LU).
    InvalidInput,
}

impl ComputationInfo {
    /// Short lowercase identifier, used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputationInfo::Success => "success",
            ComputationInfo::NumericalIssue => "numerical_issue",
            ComputationInfo::NoConvergence => "no_convergence",
            ComputationInfo::InvalidInput => "invalid_input",
        }
    }
}

/// Solver convergence and diagnostic info.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveInfo {
    /// Number of iterations of the last solve
    pub iterations: usize,
    /// Final relative residual estimate (if available)
    pub residual_norm: Option<f64>,
    /// Catalog name of the solver, e.g. "BiCGSTAB+Diagonal"
    pub solver_name: String,
}

/// Uniform protocol to solve `A x = b` for a matrix representation `M`.
pub trait SolverInterface<M>: Send {
    /// Factorize `a`, replacing any previous factorization held by `self`.
    fn decompose(&mut self, a: &M) -> Result<()>;

    /// Solve against the current factorization. `b` is left untouched.
    fn solve(&mut self, b: &DVector<f64>) -> Result<DVector<f64>>;

    /// Catalog name this instance was built from.
    fn name(&self) -> &'static str;
}

/// Dense solvers are driven through `SolverInterface` over `DMatrix<f64>`.
pub type DenseSolverInterface = dyn SolverInterface<DMatrix<f64>>;

/// Sparse solvers split the decomposition into a symbolic and a numeric
/// phase and report numerical failure through a status flag.
///
/// `decompose(a)` is `analyze_pattern(a)` followed by `factorize(a)`.
pub trait SparseSolverInterface: SolverInterface<CscMatrix<f64>> {
    /// Symbolic analysis of the sparsity pattern of `a`.
    fn analyze_pattern(&mut self, a: &CscMatrix<f64>) -> Result<()>;

    /// Numeric factorization of `a`.
    ///
    /// Runs the symbolic analysis first when no analysis with `a`'s shape and
    /// non-zero count is available.
    fn factorize(&mut self, a: &CscMatrix<f64>) -> Result<()>;

    /// Status of the most recent factorization or solve step.
    fn info(&self) -> ComputationInfo;

    /// `true` when the most recent factorization or solve step did not succeed.
    fn fail(&self) -> bool {
        self.info() != ComputationInfo::Success
    }

    /// Diagnostics of the last solve, for solvers that iterate.
    fn solve_info(&self) -> Option<SolveInfo> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_like_as_str() {
        for info in [
            ComputationInfo::Success,
            ComputationInfo::NumericalIssue,
            ComputationInfo::NoConvergence,
            ComputationInfo::InvalidInput,
        ] {
            let json = serde_json::to_string(&info).unwrap();
            assert_eq!(json, format!("\"{}\"", info.as_str()));
        }
        assert_eq!(ComputationInfo::default(), ComputationInfo::Success);
    }
}
