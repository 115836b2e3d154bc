//! Free functions over `&[f64]` used throughout the solver.
//!
//! Kept as plain slice operations (not an `ndarray`/`nalgebra` vector type)
//! so every inner-solver workspace stays a flat, pre-allocated `Vec<f64>` —
//! see the "workspace ownership" design note: no allocation happens inside
//! an iteration. The genuinely dense, small linear-algebra problems
//! (`direction::newton`'s reduced Hessian solve, `direction::anderson`'s
//! normal-equations solve) use `ndarray::Array2` instead, since those are
//! built fresh each call and gain nothing from the flat-`Vec` discipline.

/// Euclidean (2-) norm.
pub fn norm2(x: &[f64]) -> f64 {
    x.iter().map(|&xi| xi * xi).sum::<f64>().sqrt()
}

/// Squared Euclidean norm, avoiding the `sqrt` when only a comparison is
/// needed (e.g. quadratic-upper-bound checks).
pub fn norm2_squared(x: &[f64]) -> f64 {
    x.iter().map(|&xi| xi * xi).sum()
}

/// `||a - b||^2` without materializing the difference vector.
pub fn norm2_squared_diff(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// `||a - b||`.
pub fn norm2_diff(a: &[f64], b: &[f64]) -> f64 {
    norm2_squared_diff(a, b).sqrt()
}

/// Supremum (infinity) norm.
pub fn norm_inf(x: &[f64]) -> f64 {
    x.iter().fold(0.0_f64, |acc, &xi| acc.max(xi.abs()))
}

/// Inner product `<a, b>`.
pub fn inner_product(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// `out[i] = a[i] + alpha * b[i]`, the workhorse of every prox/FBE update.
pub fn axpy(alpha: f64, a: &[f64], b: &[f64], out: &mut [f64]) {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), out.len());
    out.iter_mut()
        .zip(a.iter())
        .zip(b.iter())
        .for_each(|((o, &ai), &bi)| *o = ai + alpha * bi);
}

/// `true` iff every component of `x` is finite.
pub fn all_finite(x: &[f64]) -> bool {
    x.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norms_agree_on_simple_vector() {
        let x = [3.0, 4.0];
        assert_eq!(norm2(&x), 5.0);
        assert_eq!(norm2_squared(&x), 25.0);
        assert_eq!(norm_inf(&x), 4.0);
    }

    #[test]
    fn axpy_matches_manual_loop() {
        let a = [1.0, 2.0, 3.0];
        let b = [0.5, -1.0, 2.0];
        let mut out = [0.0; 3];
        axpy(2.0, &a, &b, &mut out);
        assert_eq!(out, [2.0, 0.0, 7.0]);
    }
}
