//! Error types for lss-solver

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

/// Errors raised by the factories and by misuse of a solver instance.
///
/// Numerical trouble is not an error: sparse solvers report it through
/// [`crate::SparseSolverInterface::fail`], dense solvers through non-finite
/// entries in the returned solution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// A factory was given a name outside its catalog.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("solve called before the system was decomposed")]
    NotDecomposed,

    #[error("dimension mismatch: expected {expected} rows, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("{solver} requires a square matrix, got {rows}x{cols}")]
    NotSquare {
        solver: &'static str,
        rows: usize,
        cols: usize,
    },
}
