//! Termination statuses, iteration counters and the progress callback.

use std::time::Duration;

/// Outcome of a solve call, shared by every inner solver and by ALM (§4.4,
/// §6). Only ALM surfaces this to the caller (§7); inner solvers return it
/// up to ALM, which decides whether to keep iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// A solve is in progress; never observed by a caller after `solve`
    /// returns, but used internally to seed the "first iteration" state.
    Busy,
    /// Stop criterion satisfied within tolerance.
    Converged,
    /// Outer or inner iteration budget exhausted.
    MaxIter,
    /// Wall-clock budget exhausted.
    MaxTime,
    /// A problem evaluation kept producing non-finite output after retry,
    /// or the Lipschitz estimate saturated at `l_max`.
    NotFinite,
    /// Step size below floor, or the line search fell back to the plain
    /// forward-backward step, for `max_no_progress` consecutive iterations.
    NoProgress,
    /// `CancellationToken::stop` was observed at the top of an iteration.
    Interrupted,
}

impl SolverStatus {
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, SolverStatus::Converged)
    }
}

/// Accumulated statistics for a single inner-solver `solve` call.
#[derive(Debug, Clone, Default)]
pub struct InnerStats {
    pub iterations: usize,
    pub elapsed_time: Duration,
    pub lipschitz_backtracks: usize,
    pub linesearch_backtracks: usize,
    pub linesearch_failures: usize,
    /// Number of `apply()` calls the direction provider itself reported as
    /// failed (Cholesky on non-PD matrix, cautious-BFGS rejection, ...);
    /// recovered locally by falling back to the plain prox step (§4.3, §7).
    pub direction_failures: usize,
    pub direction_rejections: usize,
    pub final_fpr_norm: f64,
    pub status: SolverStatus,
}

impl Default for SolverStatus {
    fn default() -> Self {
        SolverStatus::Busy
    }
}

/// Accumulated statistics returned by [`crate::alm::AlmOptimizer::solve`]
/// (§6, the `ALMSolver::operator()` invocation API).
#[derive(Debug, Clone, Default)]
pub struct AlmStats {
    pub outer_iterations: usize,
    pub inner: InnerStats,
    pub elapsed_time: Duration,
    pub inner_convergence_failures: usize,
    pub epsilon: f64,
    pub delta: f64,
    pub penalty_norm: f64,
    pub status: SolverStatus,
}

/// A read-only snapshot handed to the user's progress callback once per
/// inner-solver iteration (§4.10).
///
/// The snapshot borrows its vector fields; per the design note on cyclic
/// references, none of this is valid beyond the callback invocation, so
/// implementations that want to retain data must copy it out.
pub struct ProgressSnapshot<'a> {
    pub iteration: usize,
    pub outer_iteration: usize,
    pub x: &'a [f64],
    pub p: &'a [f64],
    pub p_norm_squared: f64,
    pub x_hat: &'a [f64],
    pub fbe: f64,
    pub psi: f64,
    pub grad_psi: &'a [f64],
    pub lipschitz_estimate: f64,
    pub gamma: f64,
    /// Line-search step `tau` for PANOC/ZeroFPR, trust-region radius `delta`
    /// for PANTR.
    pub tau_or_radius: f64,
    pub tolerance: f64,
    pub sigma: &'a [f64],
    pub y: &'a [f64],
}

/// Callback invoked once per inner-solver iteration. Held as a trait object
/// so different inner solvers can share the same signature without a type
/// parameter leaking through every public API.
pub trait ProgressCallback {
    fn call(&mut self, snapshot: &ProgressSnapshot<'_>);
}

impl<F> ProgressCallback for F
where
    F: FnMut(&ProgressSnapshot<'_>),
{
    fn call(&mut self, snapshot: &ProgressSnapshot<'_>) {
        self(snapshot)
    }
}
