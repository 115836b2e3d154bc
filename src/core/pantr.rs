//! PANTR (§4.7): trust-region inner solver using truncated Steihaug-CG on a
//! Gauss-Newton-like quadratic model of `psi` restricted to the inactive
//! set, with the plain prox-gradient step as a global-convergence
//! safeguard whenever the trust-region step fails to improve the FBE
//! (mirroring the Armijo fallback the line-search solvers use).

use crate::cancel::CancellationToken;
use crate::config::{NewtonParams, PanocParams};
use crate::core::fbe;
use crate::direction::steihaug_cg::{self, TerminationReason};
use crate::error::SolverResult;
use crate::matrix_operations::{all_finite, inner_product, norm2, norm2_squared};
use crate::problem::Problem;
use crate::stats::{InnerStats, ProgressCallback, ProgressSnapshot, SolverStatus};
use std::time::Instant;

/// `hess_psi_prod(x, alpha, v, out)`: `out <- alpha * Hess_psi(x) * v`, see
/// [`crate::problem::Problem::eval_hess_psi_prod`].
pub struct Pantr<'a, H> {
    problem: &'a dyn Problem,
    params: PanocParams,
    newton: NewtonParams,
    tolerance: f64,
    hess_psi_prod: H,
    token: CancellationToken,
    radius: f64,
    grad_psi: Vec<f64>,
    x_hat: Vec<f64>,
    p: Vec<f64>,
    inactive: Vec<usize>,
    step: Vec<f64>,
    x_trial: Vec<f64>,
    grad_psi_trial: Vec<f64>,
    x_hat_trial: Vec<f64>,
    p_trial: Vec<f64>,
}

impl<'a, H> Pantr<'a, H>
where
    H: FnMut(&[f64], f64, &[f64], &mut [f64]) -> bool,
{
    pub fn new(problem: &'a dyn Problem, hess_psi_prod: H) -> Self {
        let n = problem.n();
        let newton = NewtonParams::default();
        Pantr {
            problem,
            params: PanocParams::default(),
            radius: newton.initial_radius,
            newton,
            tolerance: 1e-6,
            hess_psi_prod,
            token: CancellationToken::new(),
            grad_psi: vec![0.0; n],
            x_hat: vec![0.0; n],
            p: vec![0.0; n],
            inactive: vec![0; n],
            step: vec![0.0; n],
            x_trial: vec![0.0; n],
            grad_psi_trial: vec![0.0; n],
            x_hat_trial: vec![0.0; n],
            p_trial: vec![0.0; n],
        }
    }

    pub fn with_params(mut self, params: PanocParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_newton_params(mut self, newton: NewtonParams) -> Self {
        self.radius = newton.initial_radius;
        self.newton = newton;
        self
    }

    /// # Panics
    /// If `tolerance` is not positive.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        assert!(tolerance > 0.0);
        self.tolerance = tolerance;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    fn model_hess_vec(&mut self, x: &[f64], v_restricted: &[f64], out_restricted: &mut [f64]) {
        let n = x.len();
        let mut full_v = vec![0.0; n];
        let mut full_out = vec![0.0; n];
        for (jj, &j) in self.inactive.iter().enumerate() {
            full_v[j] = v_restricted[jj];
        }
        (self.hess_psi_prod)(x, 1.0, &full_v, &mut full_out);
        for (jj, &j) in self.inactive.iter().enumerate() {
            out_restricted[jj] = full_out[j];
        }
    }

    pub fn solve(&mut self, x: &mut [f64]) -> SolverResult<InnerStats> {
        self.solve_with_progress(x, None)
    }

    pub fn solve_with_progress(&mut self, x: &mut [f64], mut progress: Option<&mut dyn ProgressCallback>) -> SolverResult<InnerStats> {
        let start = Instant::now();
        let mut stats = InnerStats::default();

        let (gamma, mut psi, mut h_val, lip_backtracks) =
            fbe::initialize_gamma(self.problem, &self.params.lipschitz, x, &mut self.grad_psi, &mut self.x_hat, &mut self.p)?;
        stats.lipschitz_backtracks += lip_backtracks;

        tracing::debug!(n = x.len(), gamma, tolerance = self.tolerance, "starting inner solve");

        let mut final_status = SolverStatus::Busy;

        for iteration in 0..self.params.max_iter {
            if self.token.is_stopped() {
                final_status = SolverStatus::Interrupted;
                break;
            }
            if start.elapsed() >= self.params.max_time {
                final_status = SolverStatus::MaxTime;
                break;
            }
            if !all_finite(x) {
                final_status = SolverStatus::NotFinite;
                break;
            }

            stats.final_fpr_norm = norm2(&self.p) / gamma;
            if fbe::stop_measure(self.params.stop_crit, gamma, &self.p) <= self.tolerance {
                final_status = SolverStatus::Converged;
                break;
            }

            let fbe_current = psi + inner_product(&self.grad_psi, &self.p) + norm2_squared(&self.p) / (2.0 * gamma) + h_val;
            tracing::trace!(iteration, psi, fbe = fbe_current, radius = self.radius, fpr_norm = stats.final_fpr_norm, "inner iteration");

            if let Some(cb) = progress.as_deref_mut() {
                cb.call(&ProgressSnapshot {
                    iteration,
                    outer_iteration: 0,
                    x,
                    p: &self.p,
                    p_norm_squared: norm2_squared(&self.p),
                    x_hat: &self.x_hat,
                    fbe: fbe_current,
                    psi,
                    grad_psi: &self.grad_psi,
                    lipschitz_estimate: self.params.lipschitz.l_gamma_factor / gamma,
                    gamma,
                    tau_or_radius: self.radius,
                    tolerance: self.tolerance,
                    sigma: &[],
                    y: &[],
                });
            }

            let k = self.problem.eval_inactive_indices_res_lna(gamma, x, &self.grad_psi, &mut self.inactive);
            self.inactive.truncate(k);

            self.step.iter_mut().for_each(|v| *v = 0.0);
            let mut accepted = false;

            if !self.inactive.is_empty() {
                let g_restricted: Vec<f64> = self.inactive.iter().map(|&j| self.grad_psi[j]).collect();
                let x_snapshot = x.to_vec();
                let radius = self.radius;
                let cg_tol = (self.tolerance * 1e-2).max(1e-12);
                let max_cg_iterations = self.newton.max_cg_iterations;
                let cg = steihaug_cg::solve(
                    |v, out| self.model_hess_vec(&x_snapshot, v, out),
                    &g_restricted,
                    radius,
                    cg_tol,
                    max_cg_iterations,
                );

                for (jj, &j) in self.inactive.iter().enumerate() {
                    self.step[j] = cg.d[jj];
                }
                for i in 0..x.len() {
                    self.x_trial[i] = x[i] + self.step[i];
                }

                let psi_trial = self.problem.eval_f(&self.x_trial)?;
                let actual_reduction = psi - psi_trial;

                let mut hv = vec![0.0; g_restricted.len()];
                self.model_hess_vec(&x_snapshot, &cg.d, &mut hv);
                let quad = inner_product(&cg.d, &hv);
                let predicted_reduction = -(inner_product(&g_restricted, &cg.d) + 0.5 * quad);

                let rho = if predicted_reduction.abs() > 0.0 {
                    actual_reduction / predicted_reduction
                } else {
                    -1.0
                };
                tracing::trace!(iteration, rho, radius = self.radius, cg_reason = ?cg.reason, "trust-region step evaluated");

                if rho >= self.newton.rho_acceptable && predicted_reduction > 0.0 {
                    self.problem.eval_grad_f(&self.x_trial, &mut self.grad_psi_trial)?;
                    let h_trial = self.problem.eval_prox_grad_step(
                        gamma,
                        &self.x_trial,
                        &self.grad_psi_trial,
                        &mut self.x_hat_trial,
                        &mut self.p_trial,
                    )?;
                    x.copy_from_slice(&self.x_trial);
                    self.x_hat.copy_from_slice(&self.x_hat_trial);
                    self.p.copy_from_slice(&self.p_trial);
                    self.grad_psi.copy_from_slice(&self.grad_psi_trial);
                    psi = psi_trial;
                    h_val = h_trial;
                    accepted = true;

                    if rho >= self.newton.rho_good && cg.reason == TerminationReason::TrustRegionBoundary {
                        self.radius = (self.radius * self.newton.radius_factor_good).min(self.newton.max_radius);
                    } else if rho < self.newton.rho_good {
                        self.radius = (self.radius * self.newton.radius_factor_acceptable).max(self.newton.min_radius);
                    }
                } else {
                    self.radius = (self.radius * self.newton.radius_factor_rejected).max(self.newton.min_radius);
                }
            }

            if !accepted {
                // Safeguard: fall back to the plain prox-gradient step so
                // the iteration always makes progress even when the
                // trust-region model is untrustworthy (empty J, rejected
                // step, or CG stalling).
                for i in 0..x.len() {
                    self.x_trial[i] = self.x_hat[i];
                }
                let psi_trial = self.problem.eval_f(&self.x_trial)?;
                self.problem.eval_grad_f(&self.x_trial, &mut self.grad_psi_trial)?;
                let h_trial = self.problem.eval_prox_grad_step(
                    gamma,
                    &self.x_trial,
                    &self.grad_psi_trial,
                    &mut self.x_hat_trial,
                    &mut self.p_trial,
                )?;
                x.copy_from_slice(&self.x_trial);
                self.x_hat.copy_from_slice(&self.x_hat_trial);
                self.p.copy_from_slice(&self.p_trial);
                self.grad_psi.copy_from_slice(&self.grad_psi_trial);
                psi = psi_trial;
                h_val = h_trial;
            }

            stats.iterations = iteration + 1;
        }

        if final_status == SolverStatus::Busy {
            final_status = SolverStatus::MaxIter;
        }
        stats.status = final_status;
        stats.elapsed_time = start.elapsed();
        tracing::debug!(status = ?stats.status, iterations = stats.iterations, final_fpr_norm = stats.final_fpr_norm, "inner solve finished");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Box as Bounds;

    struct Quadratic {
        c: Bounds,
        d: Bounds,
    }

    impl Problem for Quadratic {
        fn n(&self) -> usize {
            2
        }
        fn m(&self) -> usize {
            0
        }
        fn c(&self) -> &Bounds {
            &self.c
        }
        fn d(&self) -> &Bounds {
            &self.d
        }
        fn eval_f(&self, x: &[f64]) -> SolverResult<f64> {
            Ok(0.5 * (3.0 * x[0] * x[0] + x[1] * x[1]))
        }
        fn eval_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<()> {
            grad[0] = 3.0 * x[0];
            grad[1] = x[1];
            Ok(())
        }
        fn eval_g(&self, _x: &[f64], _g: &mut [f64]) -> SolverResult<()> {
            Ok(())
        }
        fn eval_grad_g_prod(&self, _x: &[f64], _y: &[f64], _out: &mut [f64]) -> SolverResult<()> {
            Ok(())
        }
        fn eval_prox_grad_step(&self, gamma: f64, x: &[f64], grad_psi: &[f64], x_hat: &mut [f64], p: &mut [f64]) -> SolverResult<f64> {
            Ok(crate::problem::box_constr::default_prox_grad_step(&self.c, &[], gamma, x, grad_psi, x_hat, p))
        }
    }

    #[test]
    fn pantr_converges_on_simple_quadratic() {
        let problem = Quadratic {
            c: Bounds::free(2),
            d: Bounds::free(0),
        };
        let hess = |_x: &[f64], alpha: f64, v: &[f64], out: &mut [f64]| {
            out[0] = alpha * 3.0 * v[0];
            out[1] = alpha * v[1];
            true
        };
        let mut x = [4.0, -2.0];
        let mut pantr = Pantr::new(&problem, hess).with_tolerance(1e-7);
        let stats = pantr.solve(&mut x).unwrap();
        assert_eq!(stats.status, SolverStatus::Converged);
        assert!(x[0].abs() < 1e-3);
        assert!(x[1].abs() < 1e-3);
    }
}
