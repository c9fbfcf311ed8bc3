//! BiCGSTAB (Bi-Conjugate Gradient Stabilized) solver
//!
//! Krylov method for square non-symmetric systems, right-preconditioned by
//! one of the catalog preconditioners. The iteration starts from `x = 0` and
//! restarts with a fresh shadow residual when `rho` underflows.

use super::preconditioners::Preconditioner;
use super::SparseKernel;
use crate::catalog::SparseSolverType;
use crate::config::IterativeConfig;
use crate::dense::non_finite;
use crate::traits::{ComputationInfo, SolveInfo};
use log::debug;
use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;

pub(crate) struct BiCgStab<P> {
    preconditioner: P,
    config: IterativeConfig,
    matrix: Option<CscMatrix<f64>>,
    preconditioner_info: ComputationInfo,
    last_solve: Option<SolveInfo>,
}

impl<P: Preconditioner> BiCgStab<P> {
    pub(crate) fn new(preconditioner: P, config: IterativeConfig) -> Self {
        Self {
            preconditioner,
            config,
            matrix: None,
            preconditioner_info: ComputationInfo::Success,
            last_solve: None,
        }
    }

    /// Display name, e.g. "BiCGSTAB+Diagonal"
    fn display_name() -> String {
        format!("{}+{}", SparseSolverType::BiCgStab.name(), P::KIND.name())
    }

    /// Run the iteration. Returns the iterate, the iteration count, the
    /// relative residual and the outcome.
    fn iterate(
        &self,
        a: &CscMatrix<f64>,
        b: &DVector<f64>,
    ) -> (DVector<f64>, usize, f64, ComputationInfo) {
        let n = b.len();
        let mut x = DVector::zeros(n);
        let rhs_sq_norm = b.norm_squared();
        if rhs_sq_norm == 0.0 {
            return (x, 0, 0.0, ComputationInfo::Success);
        }

        let tolerance = self.config.tolerance;
        let max_iterations = self.config.max_iterations_for(a.ncols());
        let threshold = tolerance * tolerance * rhs_sq_norm;
        let eps2 = f64::EPSILON * f64::EPSILON;

        let mut r = b.clone();
        let mut r0 = r.clone();
        let mut r0_sq_norm = r0.norm_squared();
        let mut rho = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;
        let mut v = DVector::zeros(n);
        let mut p = DVector::zeros(n);

        let mut i = 0;
        let mut restarts = 0;
        while r.norm_squared() > threshold && i < max_iterations {
            let rho_old = rho;
            rho = r0.dot(&r);
            if rho.abs() < eps2 * r0_sq_norm {
                // The shadow residual became orthogonal to r: restart from
                // the current iterate.
                r = b - a * &x;
                r0 = r.clone();
                r0_sq_norm = r.norm_squared();
                rho = r0_sq_norm;
                if restarts == 0 {
                    i = 0;
                }
                restarts += 1;
                debug!("BiCGSTAB: restart {} at iteration {}", restarts, i);
            }

            let beta = (rho / rho_old) * (alpha / omega);
            p = &r + (&p - &v * omega) * beta;

            let y = self.preconditioner.apply(&p);
            v = a * &y;
            let r0v = r0.dot(&v);
            if r0v == 0.0 || !r0v.is_finite() {
                let residual = (r.norm_squared() / rhs_sq_norm).sqrt();
                return (x, i, residual, ComputationInfo::NumericalIssue);
            }
            alpha = rho / r0v;
            let s = &r - &v * alpha;

            let z = self.preconditioner.apply(&s);
            let t = a * &z;
            let t_sq_norm = t.norm_squared();
            omega = if t_sq_norm > 0.0 {
                t.dot(&s) / t_sq_norm
            } else {
                0.0
            };

            x += &y * alpha + &z * omega;
            r = &s - &t * omega;
            i += 1;
        }

        let residual = (r.norm_squared() / rhs_sq_norm).sqrt();
        let info = if !residual.is_finite() {
            ComputationInfo::NumericalIssue
        } else if residual <= tolerance {
            ComputationInfo::Success
        } else {
            ComputationInfo::NoConvergence
        };
        (x, i, residual, info)
    }
}

impl<P: Preconditioner> SparseKernel for BiCgStab<P> {
    fn analyze_pattern(&mut self, a: &CscMatrix<f64>) {
        if a.nrows() == a.ncols() {
            self.preconditioner.analyze_pattern(a);
        }
        self.matrix = None;
    }

    fn factorize(&mut self, a: &CscMatrix<f64>) -> ComputationInfo {
        self.matrix = None;
        self.last_solve = None;
        if a.nrows() != a.ncols() {
            self.preconditioner_info = ComputationInfo::InvalidInput;
            return self.preconditioner_info;
        }
        self.preconditioner_info = self.preconditioner.factorize(a);
        self.matrix = Some(a.clone());
        self.preconditioner_info
    }

    fn solve(&mut self, b: &DVector<f64>) -> (DVector<f64>, ComputationInfo) {
        let Some(a) = self.matrix.as_ref() else {
            return (non_finite(b.len()), self.preconditioner_info);
        };
        if self.preconditioner_info != ComputationInfo::Success {
            return (non_finite(b.len()), self.preconditioner_info);
        }

        let (x, iterations, residual, info) = self.iterate(a, b);
        debug!(
            "{}: {} iterations, relative residual = {:.6e}, {}",
            Self::display_name(),
            iterations,
            residual,
            info.as_str()
        );
        self.last_solve = Some(SolveInfo {
            iterations,
            residual_norm: Some(residual),
            solver_name: Self::display_name(),
        });
        (x, info)
    }

    fn solve_info(&self) -> Option<SolveInfo> {
        self.last_solve.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::preconditioners::{DiagonalPreconditioner, IdentityPreconditioner};
    use approx::assert_relative_eq;
    use nalgebra_sparse::CooMatrix;

    fn convection_diffusion(n: usize) -> CscMatrix<f64> {
        // Non-symmetric tridiagonal
        let mut coo = CooMatrix::new(n, n);
        for i in 0..n {
            coo.push(i, i, 4.0);
            if i + 1 < n {
                coo.push(i, i + 1, -1.5);
                coo.push(i + 1, i, -0.5);
            }
        }
        CscMatrix::from(&coo)
    }

    fn prepared<P: Preconditioner>(p: P, config: IterativeConfig, a: &CscMatrix<f64>) -> BiCgStab<P> {
        let mut solver = BiCgStab::new(p, config);
        solver.analyze_pattern(a);
        assert_eq!(solver.factorize(a), ComputationInfo::Success);
        solver
    }

    #[test]
    fn test_bicgstab_nonsymmetric() {
        let a = convection_diffusion(20);
        let x_star = DVector::from_fn(20, |i, _| (i as f64).sin());
        let b = &a * &x_star;
        let mut solver = prepared(DiagonalPreconditioner::default(), IterativeConfig::default(), &a);
        let (x, info) = solver.solve(&b);
        assert_eq!(info, ComputationInfo::Success);
        for i in 0..20 {
            assert_relative_eq!(x[i], x_star[i], epsilon = 1e-8);
        }
        let stats = solver.solve_info().unwrap();
        assert_eq!(stats.solver_name, "BiCGSTAB+Diagonal");
        assert!(stats.iterations > 0 && stats.iterations <= 40);
        assert!(stats.residual_norm.unwrap() <= 1e-10);
    }

    #[test]
    fn test_zero_rhs_returns_zero() {
        let a = convection_diffusion(4);
        let mut solver = prepared(IdentityPreconditioner, IterativeConfig::default(), &a);
        let (x, info) = solver.solve(&DVector::zeros(4));
        assert_eq!(info, ComputationInfo::Success);
        assert_eq!(x, DVector::zeros(4));
        assert_eq!(solver.solve_info().unwrap().iterations, 0);
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let a = convection_diffusion(10);
        let config = IterativeConfig {
            max_iterations: Some(0),
            ..Default::default()
        };
        let mut solver = prepared(IdentityPreconditioner, config, &a);
        let (x, info) = solver.solve(&DVector::from_element(10, 1.0));
        assert_eq!(info, ComputationInfo::NoConvergence);
        assert_eq!(x, DVector::zeros(10));
    }

    #[test]
    fn test_rectangular_is_invalid_input() {
        let mut coo = CooMatrix::new(3, 2);
        coo.push(0, 0, 1.0);
        coo.push(1, 1, 1.0);
        let a = CscMatrix::from(&coo);
        let mut solver = BiCgStab::new(IdentityPreconditioner, IterativeConfig::default());
        solver.analyze_pattern(&a);
        assert_eq!(solver.factorize(&a), ComputationInfo::InvalidInput);
    }
}
