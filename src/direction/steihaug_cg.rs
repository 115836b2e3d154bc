//! Truncated (Steihaug) conjugate gradient for PANTR's trust-region
//! subproblem (§4.7): `min_d g^T d + 1/2 d^T H d` s.t. `||d|| <= radius`.
//!
//! Unlike the other modules in [`super`] this is not a [`super::DirectionProvider`] —
//! PANTR calls it directly to solve the trust-region model each iteration,
//! rather than maintaining cross-iteration history the way the quasi-Newton
//! providers do.

use crate::matrix_operations::{axpy, inner_product, norm2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The residual dropped below tolerance strictly inside the region.
    Converged,
    /// A direction of non-positive curvature was found; truncated to the
    /// region boundary.
    NegativeCurvature,
    /// The unconstrained CG step would leave the region; truncated to the
    /// boundary.
    TrustRegionBoundary,
    MaxIterations,
}

pub struct CgResult {
    pub d: Vec<f64>,
    pub reason: TerminationReason,
    pub iterations: usize,
}

/// Positive root `tau` of `||d + tau*p|| = radius`.
fn boundary_tau(d: &[f64], p: &[f64], radius: f64) -> f64 {
    let pp = inner_product(p, p);
    if pp <= 0.0 {
        return 0.0;
    }
    let dp = inner_product(d, p);
    let dd = inner_product(d, d);
    let c = dd - radius * radius;
    let disc = (dp * dp - pp * c).max(0.0).sqrt();
    (-dp + disc) / pp
}

/// Solves the trust-region subproblem with `hess_vec_prod(v, out)` computing
/// `out <- H * v`. `g` is the model gradient (`grad_psi` restricted to the
/// coordinates PANTR passes in). Returns `d = 0` immediately if `||g|| <=
/// tol`.
pub fn solve(
    mut hess_vec_prod: impl FnMut(&[f64], &mut [f64]),
    g: &[f64],
    radius: f64,
    tol: f64,
    max_iter: usize,
) -> CgResult {
    let n = g.len();
    let mut d = vec![0.0; n];
    let mut r = g.to_vec();
    let mut p: Vec<f64> = r.iter().map(|&v| -v).collect();
    let mut r_norm2 = inner_product(&r, &r);

    if r_norm2.sqrt() <= tol {
        return CgResult {
            d,
            reason: TerminationReason::Converged,
            iterations: 0,
        };
    }

    let mut hp = vec![0.0; n];
    for it in 0..max_iter.max(1) {
        hess_vec_prod(&p, &mut hp);
        let php = inner_product(&p, &hp);
        if php <= 0.0 {
            let tau = boundary_tau(&d, &p, radius);
            let mut d_boundary = vec![0.0; n];
            axpy(tau, &d, &p, &mut d_boundary);
            return CgResult {
                d: d_boundary,
                reason: TerminationReason::NegativeCurvature,
                iterations: it + 1,
            };
        }
        let step = r_norm2 / php;
        let mut d_next = vec![0.0; n];
        axpy(step, &d, &p, &mut d_next);
        if norm2(&d_next) >= radius {
            let tau = boundary_tau(&d, &p, radius);
            let mut d_boundary = vec![0.0; n];
            axpy(tau, &d, &p, &mut d_boundary);
            return CgResult {
                d: d_boundary,
                reason: TerminationReason::TrustRegionBoundary,
                iterations: it + 1,
            };
        }
        d = d_next;

        let mut r_next = vec![0.0; n];
        axpy(step, &r, &hp, &mut r_next);
        let r_next_norm2 = inner_product(&r_next, &r_next);
        if r_next_norm2.sqrt() <= tol {
            return CgResult {
                d,
                reason: TerminationReason::Converged,
                iterations: it + 1,
            };
        }

        let beta = r_next_norm2 / r_norm2;
        let mut p_next = vec![0.0; n];
        for i in 0..n {
            p_next[i] = -r_next[i] + beta * p[i];
        }
        r = r_next;
        p = p_next;
        r_norm2 = r_next_norm2;
    }

    CgResult {
        d,
        reason: TerminationReason::MaxIterations,
        iterations: max_iter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_on_spd_system_inside_region() {
        // H = diag(2, 4), g = [4, 8] => unconstrained minimizer d = [-2, -2]
        let result = solve(
            |v, out| {
                out[0] = 2.0 * v[0];
                out[1] = 4.0 * v[1];
            },
            &[4.0, 8.0],
            10.0,
            1e-10,
            50,
        );
        assert_eq!(result.reason, TerminationReason::Converged);
        assert!((result.d[0] - (-2.0)).abs() < 1e-6);
        assert!((result.d[1] - (-2.0)).abs() < 1e-6);
    }

    #[test]
    fn truncates_to_boundary_when_region_is_tight() {
        let result = solve(
            |v, out| {
                out[0] = 2.0 * v[0];
                out[1] = 4.0 * v[1];
            },
            &[4.0, 8.0],
            1.0,
            1e-10,
            50,
        );
        assert_eq!(result.reason, TerminationReason::TrustRegionBoundary);
        assert!((norm2(&result.d) - 1.0).abs() < 1e-8);
    }

    #[test]
    fn negative_curvature_truncates_immediately() {
        let result = solve(
            |v, out| {
                out[0] = -v[0];
            },
            &[1.0],
            2.0,
            1e-10,
            50,
        );
        assert_eq!(result.reason, TerminationReason::NegativeCurvature);
        assert!((result.d[0].abs() - 2.0).abs() < 1e-8);
    }

    #[test]
    fn zero_gradient_returns_zero_step() {
        let result = solve(
            |v, out| {
                out[0] = v[0];
            },
            &[0.0],
            1.0,
            1e-10,
            50,
        );
        assert_eq!(result.reason, TerminationReason::Converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.d, vec![0.0]);
    }
}
