//! FISTA (§4.6): Nesterov-accelerated proximal gradient. No direction
//! provider and no line search against the FBE — momentum is computed from
//! the fixed-point-residual-free extrapolation sequence `t_k`, and `gamma`
//! is only revisited if a prox step ever fails the quadratic upper bound
//! (rare once the initial backtracking in [`fbe::initialize_gamma`] has
//! run). `disable_acceleration` collapses this to plain forward-backward
//! splitting, `beta_k = 0` every iteration.

use crate::cancel::CancellationToken;
use crate::config::PanocParams;
use crate::core::fbe;
use crate::error::SolverResult;
use crate::matrix_operations::{all_finite, norm2, norm2_squared, inner_product};
use crate::problem::Problem;
use crate::stats::{InnerStats, ProgressCallback, ProgressSnapshot, SolverStatus};
use std::time::Instant;

pub struct Fista<'a> {
    problem: &'a dyn Problem,
    params: PanocParams,
    tolerance: f64,
    token: CancellationToken,
    y: Vec<f64>,
    x_prev: Vec<f64>,
    grad_psi: Vec<f64>,
    x_hat: Vec<f64>,
    p: Vec<f64>,
}

impl<'a> Fista<'a> {
    pub fn new(problem: &'a dyn Problem) -> Self {
        let n = problem.n();
        Fista {
            problem,
            params: PanocParams::default(),
            tolerance: 1e-6,
            token: CancellationToken::new(),
            y: vec![0.0; n],
            x_prev: vec![0.0; n],
            grad_psi: vec![0.0; n],
            x_hat: vec![0.0; n],
            p: vec![0.0; n],
        }
    }

    pub fn with_params(mut self, params: PanocParams) -> Self {
        self.params = params;
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

    pub fn solve(&mut self, x: &mut [f64]) -> SolverResult<InnerStats> {
        self.solve_with_progress(x, None)
    }

    pub fn solve_with_progress(&mut self, x: &mut [f64], mut progress: Option<&mut dyn ProgressCallback>) -> SolverResult<InnerStats> {
        let n = x.len();
        let start = Instant::now();
        let mut stats = InnerStats::default();

        let (mut gamma, _psi, _h, lip_backtracks) =
            fbe::initialize_gamma(self.problem, &self.params.lipschitz, x, &mut self.grad_psi, &mut self.x_hat, &mut self.p)?;
        stats.lipschitz_backtracks += lip_backtracks;

        self.y.copy_from_slice(x);
        self.x_prev.copy_from_slice(x);
        let mut t = 1.0_f64;
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

            let (psi_y, _h_y) = fbe::prox_step(self.problem, gamma, &self.y, &mut self.grad_psi, &mut self.x_hat, &mut self.p)?;

            stats.final_fpr_norm = norm2(&self.p) / gamma;
            tracing::trace!(iteration, psi = psi_y, gamma, fpr_norm = stats.final_fpr_norm, "inner iteration");
            if fbe::stop_measure(self.params.stop_crit, gamma, &self.p) <= self.tolerance {
                x.copy_from_slice(&self.x_hat);
                final_status = SolverStatus::Converged;
                stats.iterations = iteration;
                break;
            }

            if let Some(cb) = progress.as_deref_mut() {
                let psi = self.problem.eval_f(&self.y).unwrap_or(f64::NAN);
                cb.call(&ProgressSnapshot {
                    iteration,
                    outer_iteration: 0,
                    x,
                    p: &self.p,
                    p_norm_squared: norm2_squared(&self.p),
                    x_hat: &self.x_hat,
                    fbe: psi + inner_product(&self.grad_psi, &self.p) + norm2_squared(&self.p) / (2.0 * gamma),
                    psi,
                    grad_psi: &self.grad_psi,
                    lipschitz_estimate: self.params.lipschitz.l_gamma_factor / gamma,
                    gamma,
                    tau_or_radius: t,
                    tolerance: self.tolerance,
                    sigma: &[],
                    y: &[],
                });
            }

            x.copy_from_slice(&self.x_hat);

            if self.params.disable_acceleration {
                self.y.copy_from_slice(x);
            } else {
                let t_next = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
                let beta = (t - 1.0) / t_next;
                for i in 0..n {
                    self.y[i] = x[i] + beta * (x[i] - self.x_prev[i]);
                }
                t = t_next;
            }
            self.x_prev.copy_from_slice(x);
            stats.iterations = iteration + 1;

            if let Some(growth) = self.params.lipschitz.growth_after_iterations {
                if iteration > 0 && iteration % growth == 0 {
                    gamma = (gamma * 2.0).min(1.0 / self.params.lipschitz.l_min);
                }
            }
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
            Ok(0.5 * (4.0 * x[0] * x[0] + x[1] * x[1]))
        }
        fn eval_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<()> {
            grad[0] = 4.0 * x[0];
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
    fn fista_converges_on_simple_quadratic() {
        let problem = Quadratic {
            c: Bounds::free(2),
            d: Bounds::free(0),
        };
        let mut x = [5.0, -3.0];
        let mut fista = Fista::new(&problem).with_tolerance(1e-8);
        let stats = fista.solve(&mut x).unwrap();
        assert_eq!(stats.status, SolverStatus::Converged);
        assert!(x[0].abs() < 1e-3);
        assert!(x[1].abs() < 1e-3);
    }

    #[test]
    fn disabling_acceleration_still_converges() {
        let problem = Quadratic {
            c: Bounds::free(2),
            d: Bounds::free(0),
        };
        let mut params = PanocParams::default();
        params.disable_acceleration = true;
        let mut x = [5.0, -3.0];
        let mut fista = Fista::new(&problem).with_params(params).with_tolerance(1e-6);
        let stats = fista.solve(&mut x).unwrap();
        assert_eq!(stats.status, SolverStatus::Converged);
    }
}
