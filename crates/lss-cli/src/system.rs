//! JSON linear system input and solution report.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix};
use lss_solver::{ComputationInfo, SolveInfo};
use serde::{Deserialize, Serialize};

/// `A x = b` in triplet form. Duplicate `(row, col)` entries are summed.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemFile {
    pub rows: usize,
    pub cols: usize,
    pub entries: Vec<(usize, usize, f64)>,
    pub rhs: Vec<f64>,
}

impl SystemFile {
    pub fn parse(text: &str) -> Result<Self, String> {
        let system: SystemFile =
            serde_json::from_str(text).map_err(|err| format!("invalid system file: {err}"))?;
        system.validate()?;
        Ok(system)
    }

    fn validate(&self) -> Result<(), String> {
        if self.rhs.len() != self.rows {
            return Err(format!(
                "rhs has {} entries, expected {}",
                self.rhs.len(),
                self.rows
            ));
        }
        if let Some((i, j, _)) = self
            .entries
            .iter()
            .find(|&&(i, j, _)| i >= self.rows || j >= self.cols)
        {
            return Err(format!(
                "entry ({i}, {j}) outside a {}x{} matrix",
                self.rows, self.cols
            ));
        }
        Ok(())
    }

    fn coo(&self) -> CooMatrix<f64> {
        let mut coo = CooMatrix::new(self.rows, self.cols);
        for &(i, j, v) in &self.entries {
            coo.push(i, j, v);
        }
        coo
    }

    pub fn dense(&self) -> DMatrix<f64> {
        DMatrix::from(&self.coo())
    }

    pub fn sparse(&self) -> CscMatrix<f64> {
        CscMatrix::from(&self.coo())
    }

    pub fn rhs(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.rhs)
    }

    /// `||A x - b||`
    pub fn residual_norm(&self, x: &DVector<f64>) -> f64 {
        (&self.sparse() * x - self.rhs()).norm()
    }
}

/// Output of `lss-cli solve`.
#[derive(Debug, Serialize)]
pub struct SolveReport {
    pub solver: String,
    pub solution: Vec<f64>,
    pub residual_norm: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ComputationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SolveInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM: &str = r#"{
        "rows": 2,
        "cols": 2,
        "entries": [[0, 0, 1.0], [0, 0, 1.0], [1, 1, 3.0], [1, 0, 0.5]],
        "rhs": [4.0, 9.0]
    }"#;

    #[test]
    fn test_duplicates_are_summed() {
        let system = SystemFile::parse(SYSTEM).unwrap();
        let dense = system.dense();
        assert_eq!(dense[(0, 0)], 2.0);
        assert_eq!(dense[(1, 0)], 0.5);
        let sparse = system.sparse();
        assert_eq!(sparse.nnz(), 3);
    }

    #[test]
    fn test_residual_norm() {
        let system = SystemFile::parse(SYSTEM).unwrap();
        let x = DVector::from_vec(vec![2.0, 8.0 / 3.0]);
        assert!(system.residual_norm(&x) < 1e-12);
    }

    #[test]
    fn test_rejects_out_of_range_entry() {
        let text = r#"{"rows": 1, "cols": 1, "entries": [[0, 1, 1.0]], "rhs": [1.0]}"#;
        let err = SystemFile::parse(text).unwrap_err();
        assert!(err.contains("outside a 1x1 matrix"));
    }

    #[test]
    fn test_rejects_short_rhs() {
        let text = r#"{"rows": 2, "cols": 2, "entries": [], "rhs": [1.0]}"#;
        assert!(SystemFile::parse(text).is_err());
    }

    #[test]
    fn test_report_omits_missing_fields() {
        let report = SolveReport {
            solver: "LLT".to_string(),
            solution: vec![1.0],
            residual_norm: 0.0,
            status: None,
            stats: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("status"));
        assert!(!json.contains("stats"));
    }

    #[test]
    fn test_report_with_status_and_stats() {
        let report = SolveReport {
            solver: "BiCGSTAB+Identity".to_string(),
            solution: vec![1.0],
            residual_norm: 0.0,
            status: Some(ComputationInfo::NoConvergence),
            stats: Some(SolveInfo {
                iterations: 3,
                residual_norm: Some(0.5),
                solver_name: "BiCGSTAB+Identity".to_string(),
            }),
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "no_convergence");
        assert_eq!(json["stats"]["iterations"], 3);
        assert_eq!(json["stats"]["solver_name"], "BiCGSTAB+Identity");
    }
}
