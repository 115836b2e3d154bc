//! Flat parameter structs for every tunable in §4 (§6, "Configuration").
//!
//! Every struct derives `serde::{Serialize, Deserialize}` so a caller-owned
//! loader (TOML/JSON/CLI flags — all out of scope here, §1) can populate
//! them; this crate itself never reads a file or parses a string.

use serde::{Deserialize, Serialize};

/// Stop criterion selectable per inner solve (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanocStopCrit {
    ApproxKKT,
    ApproxKKT2,
    ProjGradNorm,
    ProjGradNorm2,
    ProjGradUnitNorm,
    ProjGradUnitNorm2,
    FPRNorm,
    FPRNorm2,
    Ipopt,
    LBFGSBpp,
}

impl Default for PanocStopCrit {
    fn default() -> Self {
        PanocStopCrit::ApproxKKT
    }
}

/// How the initial L-BFGS Hessian approximation `H_0` is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LbfgsStepSize {
    /// `H_0 = gamma * I` using the current proximal-gradient step size.
    BasedOnExternalStepSize,
    /// `H_0 = (s.z / z.z) * I`, the classical Barzilai-Borwein scaling.
    BasedOnCurvature,
}

impl Default for LbfgsStepSize {
    fn default() -> Self {
        LbfgsStepSize::BasedOnExternalStepSize
    }
}

/// Line-search acceptance rule for PANOC/ZeroFPR (§4.4, supplemented from
/// `alpaqa`'s `inner/wolfe.hpp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSearchMode {
    /// FBE-sufficient-decrease Armijo backtracking, the default rule.
    Backtracking,
    /// Weak-Wolfe acceptance on the FBE directional derivative, falling
    /// back to `Backtracking` once `tau` drops below `tau_min`.
    Wolfe,
}

impl Default for LineSearchMode {
    fn default() -> Self {
        LineSearchMode::Backtracking
    }
}

/// Lipschitz estimation and step-size bookkeeping, shared by every inner
/// solver (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LipschitzParams {
    pub l_min: f64,
    pub l_max: f64,
    /// `gamma = l_gamma_factor / L_hat`.
    pub l_gamma_factor: f64,
    /// Relative perturbation magnitude used by the initial estimate.
    pub epsilon: f64,
    /// Fallback absolute perturbation when `||x||` is tiny.
    pub delta: f64,
    /// Slack `eps_qu` in the quadratic-upper-bound test.
    pub quadratic_upper_bound_slack: f64,
    /// Attempt `gamma <- min(2*gamma, 1/l_min)` after this many iterations
    /// without a backtrack. `None` disables growth.
    pub growth_after_iterations: Option<usize>,
}

impl Default for LipschitzParams {
    fn default() -> Self {
        LipschitzParams {
            l_min: 1e-8,
            l_max: 1e12,
            l_gamma_factor: 0.95,
            epsilon: 1e-6,
            delta: 1e-6,
            quadratic_upper_bound_slack: 10.0 * f64::EPSILON,
            growth_after_iterations: None,
        }
    }
}

/// L-BFGS direction-provider parameters (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LbfgsParams {
    pub memory: usize,
    pub cbfgs_epsilon: f64,
    pub cbfgs_alpha: f64,
    pub step_size: LbfgsStepSize,
    /// Rescale stored `z` by `gamma_new / gamma_old` on a step-size change
    /// rather than discarding the whole history (§4.3, §9: defaults to
    /// reset for the *structured* variant, but plain L-BFGS rescales).
    pub rescale_on_gamma_change: bool,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        LbfgsParams {
            memory: 10,
            cbfgs_epsilon: 1e-10,
            cbfgs_alpha: 1.0,
            step_size: LbfgsStepSize::default(),
            rescale_on_gamma_change: true,
        }
    }
}

/// Anderson-acceleration direction-provider parameters (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AndersonParams {
    pub memory: usize,
    /// Drop a QR column if its update makes the factor nearly singular.
    pub regularization: f64,
}

impl Default for AndersonParams {
    fn default() -> Self {
        AndersonParams {
            memory: 10,
            regularization: 1e-10,
        }
    }
}

/// Convex-Newton / Newton-TR direction-provider parameters (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonParams {
    /// Tikhonov regularization coefficient `zeta` in `zeta*||p/gamma||^nu`.
    pub regularization_zeta: f64,
    pub regularization_nu: f64,
    /// Trust-region radius growth/shrink factors (PANTR only).
    pub radius_factor_good: f64,
    pub radius_factor_acceptable: f64,
    pub radius_factor_rejected: f64,
    pub initial_radius: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Acceptance thresholds on the model-reduction ratio `rho`.
    pub rho_acceptable: f64,
    pub rho_good: f64,
    pub max_cg_iterations: usize,
}

impl Default for NewtonParams {
    fn default() -> Self {
        NewtonParams {
            regularization_zeta: 1e-10,
            regularization_nu: 1.0,
            radius_factor_good: 2.0,
            radius_factor_acceptable: 1.0,
            radius_factor_rejected: 0.5,
            initial_radius: 1.0,
            min_radius: 1e-12,
            max_radius: 1e8,
            rho_acceptable: 0.1,
            rho_good: 0.75,
            max_cg_iterations: 100,
        }
    }
}

/// Parameters shared by the line-search-based inner solvers: PANOC,
/// ZeroFPR and FISTA (§4.4-§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanocParams {
    pub lipschitz: LipschitzParams,
    pub stop_crit: PanocStopCrit,
    pub max_iter: usize,
    pub max_time: std::time::Duration,
    pub max_no_progress: usize,
    /// Armijo sufficient-decrease factor `sigma`; `None` uses the
    /// default `0.5 * (1 - l_gamma_factor)`.
    pub linesearch_strictness_factor: Option<f64>,
    pub linesearch_mode: LineSearchMode,
    /// Backtracking shrink factor `beta < 1`.
    pub linesearch_beta: f64,
    pub tau_min: f64,
    /// FISTA only: fall back to plain proximal gradient.
    pub disable_acceleration: bool,
}

impl Default for PanocParams {
    fn default() -> Self {
        PanocParams {
            lipschitz: LipschitzParams::default(),
            stop_crit: PanocStopCrit::default(),
            max_iter: 1000,
            max_time: std::time::Duration::from_secs(60),
            max_no_progress: 10,
            linesearch_strictness_factor: None,
            linesearch_mode: LineSearchMode::default(),
            linesearch_beta: 0.5,
            tau_min: 1e-12,
            disable_acceleration: false,
        }
    }
}

impl PanocParams {
    pub fn sigma(&self) -> f64 {
        self.linesearch_strictness_factor
            .unwrap_or(0.5 * (1.0 - self.lipschitz.l_gamma_factor))
    }
}

/// ALM outer-loop parameters (§4.8), with representative defaults for the
/// penalty-update and multiplier-projection schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlmParams {
    pub epsilon_final: f64,
    pub delta_final: f64,
    pub penalty_factor: f64,
    pub sigma_max: f64,
    pub sigma_min: f64,
    pub epsilon_initial: f64,
    pub epsilon_update_factor: f64,
    pub violation_ratio_threshold: f64,
    pub max_iter: usize,
    pub max_time: std::time::Duration,
    pub m_bound: f64,
    pub single_penalty_factor: bool,
    /// §9 open question: what to do when `initial_penalty == 0`.
    /// `true` multiplies `initial_penalty_factor` into the observed
    /// violation; `false` falls back to the fixed floor `sigma_min`.
    pub scale_initial_penalty_by_violation: bool,
    pub initial_penalty_factor: f64,
}

impl Default for AlmParams {
    fn default() -> Self {
        AlmParams {
            epsilon_final: 1e-8,
            delta_final: 1e-8,
            penalty_factor: 10.0,
            sigma_max: 1e9,
            sigma_min: 1e-9,
            epsilon_initial: 1.0,
            epsilon_update_factor: 0.1,
            violation_ratio_threshold: 0.1,
            max_iter: 100,
            max_time: std::time::Duration::from_secs(5 * 60),
            m_bound: 1e9,
            single_penalty_factor: false,
            scale_initial_penalty_by_violation: true,
            initial_penalty_factor: 20.0,
        }
    }
}
