use std::time::Instant;

use crate::alm::augmented_problem::AugmentedProblem;
use crate::cancel::CancellationToken;
use crate::config::{AlmParams, LbfgsParams, PanocParams};
use crate::core::fista::Fista;
use crate::core::panoc::Panoc;
use crate::core::zerofpr::ZeroFpr;
use crate::direction::lbfgs::Lbfgs;
use crate::error::SolverResult;
use crate::matrix_operations::norm2;
use crate::problem::Problem;
use crate::stats::{AlmStats, InnerStats, SolverStatus};

/// Which inner solver drives each penalized subproblem. PANTR is not listed
/// here because its Hessian-vector-product closure is a type parameter on
/// [`crate::core::pantr::Pantr`] rather than a runtime choice; driving ALM
/// with PANTR means building that loop by hand around
/// [`AugmentedProblem`] instead of going through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerSolverChoice {
    Panoc,
    ZeroFpr,
    Fista,
}

impl Default for InnerSolverChoice {
    fn default() -> Self {
        InnerSolverChoice::Panoc
    }
}

/// Drives a sequence of inner proximal-gradient solves on
/// [`AugmentedProblem`] subproblems, updating the Lagrange multipliers `y`
/// and the per-constraint penalty `sigma` between solves (§4.8).
pub struct AlmOptimizer<'p> {
    problem: &'p dyn Problem,
    params: AlmParams,
    inner_solver: InnerSolverChoice,
    inner_params: PanocParams,
    lbfgs_params: LbfgsParams,
    token: CancellationToken,
}

impl<'p> AlmOptimizer<'p> {
    pub fn new(problem: &'p dyn Problem) -> Self {
        AlmOptimizer {
            problem,
            params: AlmParams::default(),
            inner_solver: InnerSolverChoice::default(),
            inner_params: PanocParams::default(),
            lbfgs_params: LbfgsParams::default(),
            token: CancellationToken::new(),
        }
    }

    pub fn with_params(mut self, params: AlmParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_inner_solver(mut self, choice: InnerSolverChoice) -> Self {
        self.inner_solver = choice;
        self
    }

    pub fn with_inner_params(mut self, params: PanocParams) -> Self {
        self.inner_params = params;
        self
    }

    pub fn with_lbfgs_params(mut self, params: LbfgsParams) -> Self {
        self.lbfgs_params = params;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    fn solve_inner(&self, augmented: &AugmentedProblem<'p>, x: &mut [f64], epsilon: f64) -> SolverResult<InnerStats> {
        match self.inner_solver {
            InnerSolverChoice::Panoc => {
                let n = self.problem.n();
                let mut direction = Lbfgs::new(n, self.lbfgs_params);
                Panoc::new(augmented, &mut direction)
                    .with_params(self.inner_params)
                    .with_tolerance(epsilon)
                    .with_cancellation(self.token.clone())
                    .solve(x)
            }
            InnerSolverChoice::ZeroFpr => {
                let n = self.problem.n();
                let mut direction = Lbfgs::new(n, self.lbfgs_params);
                ZeroFpr::new(augmented, &mut direction)
                    .with_params(self.inner_params)
                    .with_tolerance(epsilon)
                    .with_cancellation(self.token.clone())
                    .solve(x)
            }
            InnerSolverChoice::Fista => Fista::new(augmented)
                .with_params(self.inner_params)
                .with_tolerance(epsilon)
                .with_cancellation(self.token.clone())
                .solve(x),
        }
    }

    /// Runs the full outer loop: repeatedly solves the current penalized
    /// subproblem to tolerance `epsilon`, measures the projected constraint
    /// violation `delta`, then updates `y` and `sigma` before tightening
    /// `epsilon` for the next round. `x` is both the initial guess and the
    /// returned solution, warm-started across outer iterations.
    pub fn solve(&mut self, x: &mut [f64]) -> SolverResult<AlmStats> {
        let start = Instant::now();
        let m = self.problem.m();

        let mut y = vec![0.0; m];
        let mut sigma = vec![self.params.sigma_min; m];
        if m > 0 {
            let mut g0 = vec![0.0; m];
            self.problem.eval_g(x, &mut g0)?;
            let mut z0 = g0.clone();
            self.problem.eval_proj_diff_g(&mut z0);
            let violation0 = norm2(&z0);
            if self.params.scale_initial_penalty_by_violation && violation0 > 1e-12 {
                let scaled = (self.params.initial_penalty_factor / violation0).clamp(self.params.sigma_min, self.params.sigma_max);
                sigma.iter_mut().for_each(|s| *s = scaled);
            }
        }

        let mut epsilon = self.params.epsilon_initial;
        let mut prev_violation = f64::INFINITY;
        let mut prev_violation_per_constraint = vec![f64::INFINITY; m];
        let mut stats = AlmStats::default();

        let mut final_status = SolverStatus::Busy;

        for outer_iter in 0..self.params.max_iter {
            if self.token.is_stopped() {
                final_status = SolverStatus::Interrupted;
                break;
            }
            if start.elapsed() >= self.params.max_time {
                final_status = SolverStatus::MaxTime;
                break;
            }

            let augmented = AugmentedProblem::new(self.problem, &y, &sigma);
            let inner_stats = self.solve_inner(&augmented, x, epsilon)?;
            if inner_stats.status != SolverStatus::Converged {
                stats.inner_convergence_failures += 1;
            }
            stats.inner = inner_stats;
            stats.outer_iterations = outer_iter + 1;
            stats.epsilon = epsilon;
            stats.penalty_norm = norm2(&sigma);
            tracing::debug!(
                outer_iter,
                epsilon,
                inner_status = ?stats.inner.status,
                inner_iterations = stats.inner.iterations,
                penalty_norm = stats.penalty_norm,
                "outer iteration"
            );

            if m > 0 {
                let z = augmented.constraint_residual(x)?;
                let violation = norm2(&z);
                stats.delta = violation;
                tracing::trace!(outer_iter, violation, "constraint violation");

                if violation <= self.params.delta_final && epsilon <= self.params.epsilon_final {
                    final_status = SolverStatus::Converged;
                    break;
                }

                for i in 0..m {
                    if i < self.problem.k_split() {
                        continue;
                    }
                    y[i] += sigma[i] * z[i];
                }
                self.problem.eval_proj_multipliers(&mut y, self.params.m_bound);

                for i in 0..m {
                    let increase = if self.params.single_penalty_factor {
                        violation > self.params.violation_ratio_threshold * prev_violation
                    } else {
                        z[i].abs() > self.params.violation_ratio_threshold * prev_violation_per_constraint[i]
                    };
                    if increase {
                        sigma[i] = (sigma[i] * self.params.penalty_factor).min(self.params.sigma_max);
                    }
                }
                prev_violation = violation;
                prev_violation_per_constraint = z.iter().map(|v| v.abs()).collect();
            } else {
                stats.delta = 0.0;
                if epsilon <= self.params.epsilon_final {
                    final_status = SolverStatus::Converged;
                    break;
                }
            }

            epsilon = (epsilon * self.params.epsilon_update_factor).max(self.params.epsilon_final);
        }

        if final_status == SolverStatus::Busy {
            final_status = SolverStatus::MaxIter;
        }
        stats.status = final_status;
        stats.elapsed_time = start.elapsed();
        tracing::debug!(status = ?stats.status, outer_iterations = stats.outer_iterations, delta = stats.delta, "ALM solve finished");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Box as Bounds;

    /// `min 0.5*x^2` s.t. `x = 1`, encoded as `g(x) = x`, `D = {1}`.
    struct EqualityConstrained {
        c: Bounds,
        d: Bounds,
    }

    impl Problem for EqualityConstrained {
        fn n(&self) -> usize {
            1
        }
        fn m(&self) -> usize {
            1
        }
        fn c(&self) -> &Bounds {
            &self.c
        }
        fn d(&self) -> &Bounds {
            &self.d
        }
        fn eval_f(&self, x: &[f64]) -> SolverResult<f64> {
            Ok(0.5 * x[0] * x[0])
        }
        fn eval_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<()> {
            grad[0] = x[0];
            Ok(())
        }
        fn eval_g(&self, x: &[f64], g: &mut [f64]) -> SolverResult<()> {
            g[0] = x[0];
            Ok(())
        }
        fn eval_grad_g_prod(&self, _x: &[f64], y: &[f64], out: &mut [f64]) -> SolverResult<()> {
            out[0] = y[0];
            Ok(())
        }
        fn eval_prox_grad_step(&self, gamma: f64, x: &[f64], grad_psi: &[f64], x_hat: &mut [f64], p: &mut [f64]) -> SolverResult<f64> {
            Ok(crate::problem::box_constr::default_prox_grad_step(&self.c, &[], gamma, x, grad_psi, x_hat, p))
        }
    }

    #[test]
    fn converges_to_the_equality_constrained_minimizer() {
        let problem = EqualityConstrained {
            c: Bounds::free(1),
            d: Bounds::new(vec![1.0], vec![1.0]),
        };
        let mut x = [0.0];
        let mut alm = AlmOptimizer::new(&problem);
        let stats = alm.solve(&mut x).unwrap();
        assert_eq!(stats.status, SolverStatus::Converged);
        assert!((x[0] - 1.0).abs() < 1e-3, "x = {:?}", x);
    }

    #[test]
    fn unconstrained_problem_runs_a_single_outer_iteration() {
        struct Unconstrained {
            c: Bounds,
            d: Bounds,
        }
        impl Problem for Unconstrained {
            fn n(&self) -> usize {
                1
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
                Ok(0.5 * x[0] * x[0])
            }
            fn eval_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<()> {
                grad[0] = x[0];
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
        let problem = Unconstrained {
            c: Bounds::free(1),
            d: Bounds::free(0),
        };
        let mut x = [3.0];
        let mut alm = AlmOptimizer::new(&problem);
        let stats = alm.solve(&mut x).unwrap();
        assert_eq!(stats.status, SolverStatus::Converged);
        assert_eq!(stats.outer_iterations, 1);
        assert!(x[0].abs() < 1e-3);
    }
}
