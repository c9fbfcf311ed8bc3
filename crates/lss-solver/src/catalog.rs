//! Solver and preconditioner catalogs.
//!
//! Each catalog is a closed enum. `ALL` and `name()` form the one table that
//! both the factories and their error messages are generated from.

use crate::error::SolverError;
use std::fmt;
use std::str::FromStr;

/// Dense decomposition algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenseSolverType {
    /// LU with partial (row) pivoting, square systems
    PartialPivLu,
    /// LU with full pivoting, square systems
    FullPivLu,
    /// Householder QR without pivoting
    HouseholderQr,
    /// Householder QR with column pivoting (rank revealing)
    ColPivHouseholderQr,
    /// Householder QR with row and column pivoting (rank revealing)
    FullPivHouseholderQr,
    /// Column-pivoted QR followed by a QR of the trapezoid, minimum-norm solutions
    CompleteOrthogonalDecomposition,
    /// Bidiagonalisation-based SVD
    Bdcsvd,
    /// One-sided Jacobi SVD
    JacobiSvd,
    /// Cholesky, symmetric positive definite input
    Llt,
    /// Symmetric LDL^T with Bunch-Kaufman pivoting
    Ldlt,
}

impl DenseSolverType {
    pub const ALL: [DenseSolverType; 10] = [
        DenseSolverType::PartialPivLu,
        DenseSolverType::FullPivLu,
        DenseSolverType::HouseholderQr,
        DenseSolverType::ColPivHouseholderQr,
        DenseSolverType::FullPivHouseholderQr,
        DenseSolverType::CompleteOrthogonalDecomposition,
        DenseSolverType::Bdcsvd,
        DenseSolverType::JacobiSvd,
        DenseSolverType::Llt,
        DenseSolverType::Ldlt,
    ];

    /// Catalog name accepted by [`crate::make_dense_solver`].
    pub fn name(&self) -> &'static str {
        match self {
            DenseSolverType::PartialPivLu => "PartialPivLU",
            DenseSolverType::FullPivLu => "FullPivLU",
            DenseSolverType::HouseholderQr => "HouseholderQR",
            DenseSolverType::ColPivHouseholderQr => "ColPivHouseholderQR",
            DenseSolverType::FullPivHouseholderQr => "FullPivHouseholderQR",
            DenseSolverType::CompleteOrthogonalDecomposition => "CompleteOrthogonalDecomposition",
            DenseSolverType::Bdcsvd => "BDCSVD",
            DenseSolverType::JacobiSvd => "JacobiSVD",
            DenseSolverType::Llt => "LLT",
            DenseSolverType::Ldlt => "LDLT",
        }
    }

    /// Whether the algorithm only accepts square matrices.
    pub fn requires_square(&self) -> bool {
        matches!(
            self,
            DenseSolverType::PartialPivLu
                | DenseSolverType::FullPivLu
                | DenseSolverType::Llt
                | DenseSolverType::Ldlt
        )
    }
}

impl fmt::Display for DenseSolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DenseSolverType {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                let mut msg = format!("Invalid dense solver type found: {}\n", s);
                msg.push_str(&name_list(
                    "Available types are:",
                    Self::ALL.iter().map(|t| t.name()),
                ));
                SolverError::InvalidArgument(msg)
            })
    }
}

/// Sparse algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseSolverType {
    /// Preconditioned biconjugate gradient stabilized (iterative)
    BiCgStab,
    /// Householder QR with fill-reducing column ordering (direct, rank revealing)
    SparseQr,
    /// Left-looking LU with partial pivoting (direct)
    SparseLu,
}

impl SparseSolverType {
    pub const ALL: [SparseSolverType; 3] = [
        SparseSolverType::BiCgStab,
        SparseSolverType::SparseQr,
        SparseSolverType::SparseLu,
    ];

    /// Catalog name accepted by [`crate::make_sparse_solver`].
    pub fn name(&self) -> &'static str {
        match self {
            SparseSolverType::BiCgStab => "BiCGSTAB",
            SparseSolverType::SparseQr => "SparseQR",
            SparseSolverType::SparseLu => "SparseLU",
        }
    }

    /// Whether the algorithm needs a preconditioner selection.
    pub fn is_iterative(&self) -> bool {
        matches!(self, SparseSolverType::BiCgStab)
    }
}

impl fmt::Display for SparseSolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SparseSolverType {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                let mut msg = format!("Invalid sparse solver type found: {}\n", s);
                msg.push_str(&name_list(
                    "Valid sparse solver types are:",
                    Self::ALL.iter().map(|t| t.name()),
                ));
                SolverError::InvalidArgument(msg)
            })
    }
}

/// Preconditioners for the iterative sparse solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreconditionerType {
    /// Exact sparse Cholesky of the system matrix (SPD input)
    SimplicialCholesky,
    /// Incomplete LU with dual threshold dropping
    IncompleteLut,
    /// Jacobi scaling by the inverse diagonal
    Diagonal,
    /// No preconditioning
    Identity,
}

impl PreconditionerType {
    pub const ALL: [PreconditionerType; 4] = [
        PreconditionerType::SimplicialCholesky,
        PreconditionerType::IncompleteLut,
        PreconditionerType::Diagonal,
        PreconditionerType::Identity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PreconditionerType::SimplicialCholesky => "SimplicialCholesky",
            PreconditionerType::IncompleteLut => "IncompleteLUT",
            PreconditionerType::Diagonal => "Diagonal",
            PreconditionerType::Identity => "Identity",
        }
    }
}

impl fmt::Display for PreconditionerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PreconditionerType {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                let mut msg = if s.is_empty() {
                    "Empty preconditioner found\n".to_string()
                } else {
                    format!("Invalid preconditioner found: {}\n", s)
                };
                msg.push_str(&name_list(
                    "Valid preconditioners are:",
                    Self::ALL.iter().map(|t| t.name()),
                ));
                SolverError::InvalidArgument(msg)
            })
    }
}

/// Indented, comma separated listing used by every catalog error.
fn name_list<'a>(header: &str, names: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<&str> = names.collect();
    format!("  {}\n    {}", header, names.join(",\n    "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_names_round_trip() {
        for t in DenseSolverType::ALL {
            assert_eq!(t.name().parse::<DenseSolverType>().unwrap(), t);
        }
    }

    #[test]
    fn test_matching_is_exact() {
        assert!("partialpivlu".parse::<DenseSolverType>().is_err());
        assert!(" LLT".parse::<DenseSolverType>().is_err());
        assert!("Sparse".parse::<SparseSolverType>().is_err());
        assert!("identity".parse::<PreconditionerType>().is_err());
    }

    #[test]
    fn test_dense_error_lists_catalog() {
        let err = "QR".parse::<DenseSolverType>().unwrap_err();
        let SolverError::InvalidArgument(msg) = err else {
            panic!("expected InvalidArgument");
        };
        assert!(msg.starts_with("Invalid dense solver type found: QR\n"));
        assert!(msg.ends_with("    LLT,\n    LDLT"));
        for t in DenseSolverType::ALL {
            assert!(msg.contains(t.name()), "missing {} in {}", t.name(), msg);
        }
    }

    #[test]
    fn test_preconditioner_empty_vs_invalid() {
        let empty = "".parse::<PreconditionerType>().unwrap_err().to_string();
        assert!(empty.starts_with("Empty preconditioner found"));

        let invalid = "ILU".parse::<PreconditionerType>().unwrap_err().to_string();
        assert!(invalid.starts_with("Invalid preconditioner found: ILU"));

        for msg in [empty, invalid] {
            for p in PreconditionerType::ALL {
                assert!(msg.contains(p.name()));
            }
        }
    }

    #[test]
    fn test_square_only_types() {
        let square: Vec<_> = DenseSolverType::ALL
            .iter()
            .filter(|t| t.requires_square())
            .map(|t| t.name())
            .collect();
        assert_eq!(square, vec!["PartialPivLU", "FullPivLU", "LLT", "LDLT"]);
    }
}
