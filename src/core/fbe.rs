//! Shared forward-backward envelope (FBE) kernel driving PANOC and ZeroFPR
//! (§4.4, §4.5): both evaluate the same merit function, the same
//! quadratic-upper-bound-backtracking Lipschitz update, and accept a trial
//! point under the same Armijo-on-the-FBE rule. They differ only in the
//! line search's reference point and in which pair of iterates gets fed to
//! the direction provider's `update`: PANOC anchors the trial point at `x_k`
//! (`x_trial = x_k + (1-tau)*p_k + tau*q_k`) and updates on `(x_k,
//! x_{k+1})`; ZeroFPR anchors at the prox image `x_hat_k`
//! (`x_trial = x_hat_k + tau*q_k`) and updates on `(x_hat_k, x_hat_{k+1})`.
//! At `tau = 0` both collapse to the plain forward-backward step `x_hat_k`,
//! which is also the fallback taken when the line search is exhausted.
//!
//! FISTA (§4.6) and PANTR (§4.7) don't share this kernel: FISTA has no
//! direction provider or line search, and PANTR replaces the Armijo line
//! search with a trust-region ratio test, so they are built directly on
//! [`crate::problem::Problem`] and [`crate::lipschitz_estimator`] instead.

use crate::cancel::CancellationToken;
use crate::config::{LineSearchMode, LipschitzParams, PanocParams, PanocStopCrit};
use crate::direction::DirectionProvider;
use crate::error::SolverResult;
use crate::lipschitz_estimator::LipschitzEstimator;
use crate::matrix_operations::{inner_product, norm2, norm2_squared};
use crate::problem::Problem;
use crate::stats::{InnerStats, ProgressCallback, ProgressSnapshot, SolverStatus};
use std::time::Instant;

/// Weak-Wolfe curvature coefficient `c2`, the standard choice for
/// quasi-Newton line searches (outside `[0, 1)` the condition would reject
/// every step).
const WOLFE_CURVATURE_FACTOR: f64 = 0.9;

/// Selects the line-search reference point and direction-update pair (see
/// the module doc): [`Variant::Panoc`] anchors at `x_k`, [`Variant::ZeroFpr`]
/// at the prox image `x_hat_k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Panoc,
    ZeroFpr,
}

/// Preallocated scratch shared by both variants; sized once at construction
/// (the "workspace ownership" design note — no allocation inside `solve`).
pub struct Workspace {
    pub x_hat: Vec<f64>,
    pub p: Vec<f64>,
    pub grad_psi: Vec<f64>,
    pub grad_psi_trial: Vec<f64>,
    pub q: Vec<f64>,
    pub x_trial: Vec<f64>,
    pub x_hat_trial: Vec<f64>,
    pub p_trial: Vec<f64>,
    pub inactive: Vec<usize>,
}

impl Workspace {
    pub fn new(n: usize) -> Self {
        Workspace {
            x_hat: vec![0.0; n],
            p: vec![0.0; n],
            grad_psi: vec![0.0; n],
            grad_psi_trial: vec![0.0; n],
            q: vec![0.0; n],
            x_trial: vec![0.0; n],
            x_hat_trial: vec![0.0; n],
            p_trial: vec![0.0; n],
            inactive: vec![0; n],
        }
    }
}

fn fbe_value(psi: f64, grad_psi: &[f64], p: &[f64], gamma: f64, h_val: f64) -> f64 {
    psi + inner_product(grad_psi, p) + norm2_squared(p) / (2.0 * gamma) + h_val
}

/// The scalar measure compared against `tolerance` to decide convergence
/// (§4.4). Most of the ten `PanocStopCrit` variants agree in the
/// well-conditioned regime; the ones this crate tells apart are the
/// absolute fixed-point residual (`FPRNorm*`) versus the same residual
/// scaled by the current step size (everything else, approximating
/// AKKT/projected-gradient measures without needing the dual multipliers
/// those exact definitions reference).
pub(crate) fn stop_measure(stop_crit: PanocStopCrit, gamma: f64, p: &[f64]) -> f64 {
    match stop_crit {
        PanocStopCrit::FPRNorm => norm2(p),
        PanocStopCrit::FPRNorm2 => norm2_squared(p),
        _ => norm2(p) / gamma,
    }
}

/// One forward-backward step: `x_hat <- prox_{gamma h}(x - gamma grad_psi)`,
/// `p <- x_hat - x`, returning `(psi(x), h(x_hat))`.
pub(crate) fn prox_step(
    problem: &dyn Problem,
    gamma: f64,
    x: &[f64],
    grad_psi: &mut [f64],
    x_hat: &mut [f64],
    p: &mut [f64],
) -> SolverResult<(f64, f64)> {
    let psi = problem.eval_f_grad_f(x, grad_psi)?;
    let h_val = problem.eval_prox_grad_step(gamma, x, grad_psi, x_hat, p)?;
    Ok((psi, h_val))
}

/// Backtracks `gamma` down from the Lipschitz-estimate guess until the
/// quadratic upper bound on `psi` holds at the resulting prox step (§4.2).
pub(crate) fn initialize_gamma(
    problem: &dyn Problem,
    params: &LipschitzParams,
    x: &[f64],
    grad_psi: &mut [f64],
    x_hat: &mut [f64],
    p: &mut [f64],
) -> SolverResult<(f64, f64, f64, usize)> {
    let n = x.len();
    let mut u = x.to_vec();
    let mut fval = vec![0.0; n];
    let grad_fn = |u: &[f64], g: &mut [f64]| problem.eval_grad_f(u, g);
    let mut estimator = LipschitzEstimator::new(&mut u, &grad_fn, &mut fval)
        .with_delta(params.delta)
        .with_epsilon(params.epsilon);
    let lipschitz = estimator.estimate_local_lipschitz()?.max(params.l_min).min(params.l_max);

    let mut gamma = params.l_gamma_factor / lipschitz;
    let mut backtracks = 0;
    loop {
        let (psi, h_val) = prox_step(problem, gamma, x, grad_psi, x_hat, p)?;
        let psi_hat = problem.eval_f(x_hat)?;
        let upper_bound =
            psi + inner_product(grad_psi, p) + norm2_squared(p) / (2.0 * gamma) + params.quadratic_upper_bound_slack;
        if psi_hat <= upper_bound || gamma <= params.l_min {
            return Ok((gamma, psi, h_val, backtracks));
        }
        gamma *= 0.5;
        backtracks += 1;
    }
}

pub struct SolveOutcome {
    pub stats: InnerStats,
}

#[allow(clippy::too_many_arguments)]
pub fn solve(
    variant: Variant,
    problem: &dyn Problem,
    params: &PanocParams,
    tolerance: f64,
    direction: &mut dyn DirectionProvider,
    token: &CancellationToken,
    mut progress: Option<&mut dyn ProgressCallback>,
    x: &mut [f64],
    ws: &mut Workspace,
) -> SolverResult<SolveOutcome> {
    let n = x.len();
    let start = Instant::now();
    let mut stats = InnerStats::default();

    let (mut gamma, mut psi, mut h_val, lip_backtracks) =
        initialize_gamma(problem, &params.lipschitz, x, &mut ws.grad_psi, &mut ws.x_hat, &mut ws.p)?;
    stats.lipschitz_backtracks += lip_backtracks;

    direction.initialize(x, &ws.x_hat, &ws.p, &ws.grad_psi, gamma);
    let mut no_progress_count = 0usize;
    let mut final_status = SolverStatus::Busy;
    tracing::debug!(variant = ?variant, n, gamma, tolerance, "starting inner solve");

    for iteration in 0..params.max_iter {
        if token.is_stopped() {
            final_status = SolverStatus::Interrupted;
            break;
        }
        if start.elapsed() >= params.max_time {
            final_status = SolverStatus::MaxTime;
            break;
        }
        if !crate::matrix_operations::all_finite(x) {
            final_status = SolverStatus::NotFinite;
            break;
        }

        stats.final_fpr_norm = norm2(&ws.p) / gamma;
        if stop_measure(params.stop_crit, gamma, &ws.p) <= tolerance {
            final_status = SolverStatus::Converged;
            break;
        }

        let phi_gamma = fbe_value(psi, &ws.grad_psi, &ws.p, gamma, h_val);
        tracing::trace!(iteration, psi, phi_gamma, gamma, fpr_norm = stats.final_fpr_norm, "inner iteration");

        if let Some(cb) = progress.as_deref_mut() {
            cb.call(&ProgressSnapshot {
                iteration,
                outer_iteration: 0,
                x,
                p: &ws.p,
                p_norm_squared: norm2_squared(&ws.p),
                x_hat: &ws.x_hat,
                fbe: phi_gamma,
                psi,
                grad_psi: &ws.grad_psi,
                lipschitz_estimate: params.lipschitz.l_gamma_factor / gamma,
                gamma,
                tau_or_radius: 1.0,
                tolerance,
                sigma: &[],
                y: &[],
            });
        }

        problem.eval_inactive_indices_res_lna(gamma, x, &ws.grad_psi, &mut ws.inactive);
        let have_direction = direction.apply(gamma, x, &ws.x_hat, &ws.p, &ws.grad_psi, &mut ws.q);
        if !have_direction {
            stats.direction_failures += 1;
            ws.q.copy_from_slice(&ws.p);
        }

        let sigma = params.sigma();
        let mut tau = 1.0_f64;
        let mut accepted = false;
        let mut psi_trial = 0.0;
        let mut h_trial = 0.0;

        while tau >= params.tau_min {
            match variant {
                Variant::Panoc => {
                    for i in 0..n {
                        ws.x_trial[i] = x[i] + (1.0 - tau) * ws.p[i] + tau * ws.q[i];
                    }
                }
                Variant::ZeroFpr => {
                    for i in 0..n {
                        ws.x_trial[i] = ws.x_hat[i] + tau * ws.q[i];
                    }
                }
            }
            let (p_psi, p_h) =
                prox_step(problem, gamma, &ws.x_trial, &mut ws.grad_psi_trial, &mut ws.x_hat_trial, &mut ws.p_trial)?;
            psi_trial = p_psi;
            h_trial = p_h;
            let phi_trial = fbe_value(psi_trial, &ws.grad_psi_trial, &ws.p_trial, gamma, h_trial);
            let fpr2 = norm2_squared(&ws.p);
            let armijo = phi_trial <= phi_gamma - sigma * fpr2;
            let accept = match params.linesearch_mode {
                LineSearchMode::Backtracking => armijo,
                // Weak-Wolfe: Armijo plus a curvature condition on psi along
                // q, falling back to plain Armijo once tau is small enough
                // that the two rules coincide in practice.
                LineSearchMode::Wolfe if tau < params.tau_min.sqrt() => armijo,
                LineSearchMode::Wolfe => {
                    let curvature = inner_product(&ws.grad_psi_trial, &ws.q);
                    let curvature0 = inner_product(&ws.grad_psi, &ws.q);
                    armijo && curvature >= WOLFE_CURVATURE_FACTOR * curvature0
                }
            };
            if accept {
                accepted = true;
                break;
            }
            tau *= params.linesearch_beta;
            stats.linesearch_backtracks += 1;
        }

        if !accepted {
            // Both variants' trial point collapses to the plain
            // forward-backward step x_hat at tau = 0; take it rather than
            // abort, so the outer loop keeps the global-convergence
            // guarantee the safe step provides.
            stats.linesearch_failures += 1;
            tracing::trace!(iteration, "line search exhausted, falling back to forward-backward step");
            tau = 0.0;
            ws.x_trial.copy_from_slice(&ws.x_hat);
            let (p_psi, p_h) =
                prox_step(problem, gamma, &ws.x_trial, &mut ws.grad_psi_trial, &mut ws.x_hat_trial, &mut ws.p_trial)?;
            psi_trial = p_psi;
            h_trial = p_h;
        }

        let (update_x, update_x_next): (&[f64], &[f64]) = match variant {
            Variant::Panoc => (&*x, &ws.x_trial),
            Variant::ZeroFpr => (&ws.x_hat[..], &ws.x_hat_trial[..]),
        };
        let accepted_pair = direction.update(
            gamma,
            gamma,
            update_x,
            update_x_next,
            &ws.p,
            &ws.p_trial,
            &ws.grad_psi,
            &ws.grad_psi_trial,
        );
        if !accepted_pair {
            stats.direction_rejections += 1;
        }

        if tau >= 1.0 - f64::EPSILON && norm2(&ws.p_trial) > 0.0 {
            no_progress_count = 0;
        } else {
            no_progress_count += 1;
        }

        x.copy_from_slice(&ws.x_trial);
        ws.x_hat.copy_from_slice(&ws.x_hat_trial);
        ws.p.copy_from_slice(&ws.p_trial);
        ws.grad_psi.copy_from_slice(&ws.grad_psi_trial);
        psi = psi_trial;
        h_val = h_trial;
        stats.iterations = iteration + 1;

        if no_progress_count >= params.max_no_progress {
            final_status = SolverStatus::NoProgress;
            break;
        }

        if let Some(growth) = params.lipschitz.growth_after_iterations {
            if iteration > 0 && iteration % growth == 0 {
                gamma = (gamma * 2.0).min(1.0 / params.lipschitz.l_min);
            }
        }
    }

    if final_status == SolverStatus::Busy {
        final_status = SolverStatus::MaxIter;
    }
    stats.status = final_status;
    stats.elapsed_time = start.elapsed();
    if stats.iterations == 0 && final_status == SolverStatus::Converged {
        stats.final_fpr_norm = norm2(&ws.p) / gamma;
    }
    tracing::debug!(status = ?stats.status, iterations = stats.iterations, final_fpr_norm = stats.final_fpr_norm, "inner solve finished");
    Ok(SolveOutcome { stats })
}
