//! Finite-difference gradient checking (§4.10), grounded in the
//! `gradient-checker` driver: compare an analytic gradient against a
//! one-sided forward-difference approximation and report the absolute and
//! relative infinity-norm error.
//!
//! This is a development/debugging aid, not something the solvers call
//! themselves; it borrows the exact step-size heuristic the original tool
//! uses (`h_i = x_i * eps` unless that underflows the floor `delta`).

use crate::error::SolverResult;
use crate::matrix_operations::norm_inf;

/// Forward-difference step-size parameters. The defaults match the ones
/// hardcoded in the original gradient checker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiniteDiffParams {
    pub epsilon: f64,
    pub delta: f64,
}

impl Default for FiniteDiffParams {
    fn default() -> Self {
        FiniteDiffParams {
            epsilon: 5e-6,
            delta: 1e-2 * 5e-6,
        }
    }
}

/// Result of comparing a finite-difference gradient against an analytic one.
#[derive(Debug, Clone)]
pub struct GradientCheckReport {
    pub finite_diff: Vec<f64>,
    pub analytic: Vec<f64>,
    pub abs_error: f64,
    pub rel_error: f64,
}

impl GradientCheckReport {
    /// Matches `alpaqa`'s CLI threshold of "a few times the perturbation
    /// size"; callers that want a stricter bound should inspect
    /// `rel_error` themselves instead of using this helper.
    pub fn looks_consistent(&self) -> bool {
        self.rel_error < 1e-2
    }
}

/// One-sided forward difference of a scalar function `f` at `x`, using a
/// per-coordinate step `h_i = max(|x_i| * eps, delta)` with the sign of
/// `x_i` (falling back to `+delta` at `x_i == 0`).
pub fn finite_diff_gradient(mut f: impl FnMut(&[f64]) -> SolverResult<f64>, x: &[f64], params: FiniteDiffParams) -> SolverResult<Vec<f64>> {
    let n = x.len();
    let mut grad = vec![0.0; n];
    let f0 = f(x)?;
    let mut x_perturbed = x.to_vec();
    for i in 0..n {
        let h = if x[i].abs() * params.epsilon > params.delta {
            x[i] * params.epsilon
        } else {
            params.delta
        };
        x_perturbed[i] = x[i] + h;
        let f1 = f(&x_perturbed)?;
        grad[i] = (f1 - f0) / h;
        x_perturbed[i] = x[i];
    }
    Ok(grad)
}

/// Runs [`finite_diff_gradient`] against `f` and compares it to the
/// `analytic` gradient the caller already computed (typically via
/// [`crate::problem::Problem::eval_grad_f`]).
pub fn check_gradient(
    f: impl FnMut(&[f64]) -> SolverResult<f64>,
    x: &[f64],
    analytic: &[f64],
    params: FiniteDiffParams,
) -> SolverResult<GradientCheckReport> {
    let finite_diff = finite_diff_gradient(f, x, params)?;
    let diff: Vec<f64> = finite_diff.iter().zip(analytic.iter()).map(|(&a, &b)| a - b).collect();
    let abs_error = norm_inf(&diff);
    let fd_norm = norm_inf(&finite_diff);
    let rel_error = if fd_norm > 0.0 { abs_error / fd_norm } else { abs_error };
    let report = GradientCheckReport {
        finite_diff,
        analytic: analytic.to_vec(),
        abs_error,
        rel_error,
    };
    tracing::debug!(abs_error = report.abs_error, rel_error = report.rel_error, "gradient check");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_analytic_gradient_of_quadratic() {
        let f = |x: &[f64]| -> SolverResult<f64> { Ok(0.5 * (3.0 * x[0] * x[0] + x[1] * x[1])) };
        let x = [1.3, -0.7];
        let analytic = [3.0 * x[0], x[1]];
        let report = check_gradient(f, &x, &analytic, FiniteDiffParams::default()).unwrap();
        assert!(report.looks_consistent(), "rel_error = {}", report.rel_error);
    }

    #[test]
    fn detects_a_deliberately_wrong_gradient() {
        let f = |x: &[f64]| -> SolverResult<f64> { Ok(0.5 * (3.0 * x[0] * x[0] + x[1] * x[1])) };
        let x = [1.3, -0.7];
        let wrong = [0.0, 0.0];
        let report = check_gradient(f, &x, &wrong, FiniteDiffParams::default()).unwrap();
        assert!(!report.looks_consistent());
    }
}
