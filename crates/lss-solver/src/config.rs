//! Sparse solver configuration.
//!
//! Tuning knobs for the iterative solver and the incomplete LUT
//! preconditioner. The factories use
//! `SparseSolverConfig::default()` unless a configuration is passed
//! explicitly.

use serde::{Deserialize, Serialize};

/// Configuration for the BiCGSTAB iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeConfig {
    /// Relative residual tolerance ||r|| / ||b|| for convergence
    pub tolerance: f64,
    /// Maximum iterations (None = twice the number of columns)
    pub max_iterations: Option<usize>,
}

impl Default for IterativeConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: None,
        }
    }
}

impl IterativeConfig {
    /// Iteration budget for a system with `ncols` unknowns.
    pub fn max_iterations_for(&self, ncols: usize) -> usize {
        self.max_iterations.unwrap_or(2 * ncols)
    }
}

/// Configuration for the incomplete LUT preconditioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IlutConfig {
    /// Entries below `drop_tolerance * ||row||` are discarded
    pub drop_tolerance: f64,
    /// Fill allowed per row of L and of U, relative to the average row count of A
    pub fill_factor: usize,
}

impl Default for IlutConfig {
    fn default() -> Self {
        Self {
            drop_tolerance: 1e-12,
            fill_factor: 10,
        }
    }
}

/// Complete sparse solver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseSolverConfig {
    /// BiCGSTAB iteration settings
    pub iterative: IterativeConfig,
    /// Incomplete LUT settings
    pub ilut: IlutConfig,
}

impl SparseSolverConfig {
    /// Tight iterative tolerance with a generous iteration budget.
    pub fn high_accuracy() -> Self {
        Self {
            iterative: IterativeConfig {
                tolerance: 1e-14,
                max_iterations: Some(10_000),
            },
            ..Default::default()
        }
    }

    /// Configuration with a fixed iteration budget.
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            iterative: IterativeConfig {
                max_iterations: Some(max_iterations),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Configuration with a denser incomplete LUT.
    pub fn ilut(drop_tolerance: f64, fill_factor: usize) -> Self {
        Self {
            ilut: IlutConfig {
                drop_tolerance,
                fill_factor,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SparseSolverConfig::default();
        assert_eq!(config.iterative.tolerance, 1e-10);
        assert_eq!(config.iterative.max_iterations, None);
        assert_eq!(config.iterative.max_iterations_for(7), 14);
        assert_eq!(config.ilut.fill_factor, 10);
    }

    #[test]
    fn test_preset_configs() {
        let accurate = SparseSolverConfig::high_accuracy();
        assert_eq!(accurate.iterative.max_iterations_for(3), 10_000);

        let capped = SparseSolverConfig::with_max_iterations(0);
        assert_eq!(capped.iterative.max_iterations_for(100), 0);
        assert_eq!(capped.iterative.tolerance, 1e-10);

        let ilut = SparseSolverConfig::ilut(1e-4, 2);
        assert_eq!(ilut.ilut.drop_tolerance, 1e-4);
        assert_eq!(ilut.ilut.fill_factor, 2);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "iterative": { "tolerance": 1e-8, "max_iterations": 50 },
            "ilut": { "drop_tolerance": 1e-3, "fill_factor": 5 }
        }"#;
        let config: SparseSolverConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.iterative.max_iterations, Some(50));
        assert_eq!(config.ilut.fill_factor, 5);
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: SparseSolverConfig =
            serde_json::from_str(r#"{ "iterative": { "max_iterations": 7 } }"#).unwrap();
        assert_eq!(config.iterative.max_iterations, Some(7));
        assert_eq!(config.iterative.tolerance, 1e-10);
        assert_eq!(config.ilut.drop_tolerance, 1e-12);
    }
}
