//! Runtime-selectable linear system solvers.
//!
//! A solver is picked by name from a fixed catalog, built by a factory and
//! then driven through `decompose` / `solve`:
//!
//! - dense: [`make_dense_solver`] over `DMatrix<f64>` (LU, QR, SVD and
//!   Cholesky variants)
//! - sparse: [`make_sparse_solver`] over `CscMatrix<f64>` (BiCGSTAB with a
//!   named preconditioner, SparseQR, SparseLU), with the decomposition split
//!   into `analyze_pattern` and `factorize`
//!
//! An unknown name is a [`SolverError::InvalidArgument`] whose message lists
//! the valid names. Numerical failure of a sparse solver is reported by
//! [`SparseSolverInterface::fail`].

pub mod catalog;
pub mod config;
pub mod dense;
pub mod error;
pub mod sparse;
pub mod traits;

pub use catalog::{DenseSolverType, PreconditionerType, SparseSolverType};
pub use config::{IlutConfig, IterativeConfig, SparseSolverConfig};
pub use dense::{dense_solver, make_dense_solver};
pub use error::{Result, SolverError};
pub use sparse::{make_sparse_solver, make_sparse_solver_with_config};
pub use traits::{
    ComputationInfo, DenseSolverInterface, SolveInfo, SolverInterface, SparseSolverInterface,
};
