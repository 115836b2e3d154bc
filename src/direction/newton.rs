//! Convex Newton / Newton-TR direction provider (§4.3), adapted from
//! alpaqa's `directions/panoc/convex-newton.hpp`.
//!
//! Builds the dense `H_JJ = Hess_psi(x)` restricted to the inactive set `J`
//! from repeated Hessian-vector products (one unit vector per `J` column)
//! into an `ndarray::Array2`, then solves `(H_JJ + reg*I) d_J = -grad_psi_J`
//! with a Levenberg-style regularized Cholesky that doubles the shift until
//! the factorization succeeds. The reference crate for a generic modified
//! Cholesky (`modcholesky`) covers the same ground as a from-scratch shift
//! loop but its public return shape could not be checked against a real
//! build here, so the factorization is inlined instead — it is short enough
//! that `regularization_zeta`/`regularization_nu` (already config fields)
//! are the only knobs it needs.

use ndarray::{Array1, Array2};

use super::DirectionProvider;
use crate::config::NewtonParams;

/// Attempts `L L^T = h + shift*I` for increasing `shift`, on a dense copy of
/// `h`. Returns `L` (lower triangular) on success.
fn regularized_cholesky(h: &Array2<f64>, initial_shift: f64, max_attempts: usize) -> Option<Array2<f64>> {
    let k = h.nrows();
    if k == 0 {
        return Some(Array2::zeros((0, 0)));
    }
    let mut shift = initial_shift;
    for _ in 0..max_attempts.max(1) {
        let mut l = Array2::<f64>::zeros((k, k));
        let mut ok = true;
        for i in 0..k {
            for j in 0..=i {
                let mut sum = h[[i, j]] + if i == j { shift } else { 0.0 };
                for m in 0..j {
                    sum -= l[[i, m]] * l[[j, m]];
                }
                if i == j {
                    if sum <= 0.0 {
                        ok = false;
                        break;
                    }
                    l[[i, j]] = sum.sqrt();
                } else {
                    l[[i, j]] = sum / l[[j, j]];
                }
            }
            if !ok {
                break;
            }
        }
        if ok {
            return Some(l);
        }
        shift = (shift * 10.0).max(1e-12);
    }
    None
}

fn cholesky_solve(l: &Array2<f64>, rhs: &Array1<f64>) -> Array1<f64> {
    let k = l.nrows();
    let mut y = Array1::<f64>::zeros(k);
    for i in 0..k {
        let mut sum = rhs[i];
        for j in 0..i {
            sum -= l[[i, j]] * y[j];
        }
        y[i] = sum / l[[i, i]];
    }
    let mut x = Array1::<f64>::zeros(k);
    for i in (0..k).rev() {
        let mut sum = y[i];
        for j in (i + 1)..k {
            sum -= l[[j, i]] * x[j];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// `hess_psi_prod(x, alpha, v, out)`: `out <- alpha * Hess_psi(x) * v`, see
/// [`crate::problem::Problem::eval_hess_psi_prod`].
pub struct Newton<H> {
    params: NewtonParams,
    hess_psi_prod: H,
    n: usize,
    inactive: Vec<usize>,
    solve_failures: usize,
}

impl<H> Newton<H>
where
    H: FnMut(&[f64], f64, &[f64], &mut [f64]) -> bool,
{
    pub fn new(n: usize, params: NewtonParams, hess_psi_prod: H) -> Self {
        Newton {
            params,
            hess_psi_prod,
            n,
            inactive: Vec::new(),
            solve_failures: 0,
        }
    }

    pub fn set_inactive_indices(&mut self, inactive: &[usize]) {
        self.inactive.clear();
        self.inactive.extend_from_slice(inactive);
    }

    pub fn solve_failures(&self) -> usize {
        self.solve_failures
    }

    fn build_reduced_hessian(&mut self, x: &[f64]) -> Option<Array2<f64>> {
        let k = self.inactive.len();
        let mut out = Array2::<f64>::zeros((k, k));
        let mut e = vec![0.0; self.n];
        let mut col = vec![0.0; self.n];
        for (jj, &j) in self.inactive.iter().enumerate() {
            e.iter_mut().for_each(|v| *v = 0.0);
            e[j] = 1.0;
            if !(self.hess_psi_prod)(x, 1.0, &e, &mut col) {
                return None;
            }
            for (ii, &i) in self.inactive.iter().enumerate() {
                out[[ii, jj]] = col[i];
            }
        }
        Some(out)
    }
}

impl<H> DirectionProvider for Newton<H>
where
    H: FnMut(&[f64], f64, &[f64], &mut [f64]) -> bool,
{
    fn initialize(&mut self, _x0: &[f64], _x_hat0: &[f64], _p0: &[f64], _grad_psi0: &[f64], _gamma0: f64) {
        self.inactive.clear();
        self.solve_failures = 0;
    }

    fn update(
        &mut self,
        _gamma: f64,
        _gamma_next: f64,
        _x: &[f64],
        _x_next: &[f64],
        _p: &[f64],
        _p_next: &[f64],
        _grad_psi: &[f64],
        _grad_psi_next: &[f64],
    ) -> bool {
        // The Newton direction is recomputed from scratch each iteration
        // from Hess_psi directly; there is no pair history to accept.
        true
    }

    fn apply(&mut self, gamma: f64, x: &[f64], _x_hat: &[f64], p: &[f64], grad_psi: &[f64], q: &mut [f64]) -> bool {
        if self.inactive.is_empty() {
            return false;
        }
        let k = self.inactive.len();
        let h = match self.build_reduced_hessian(x) {
            Some(h) => h,
            None => {
                self.solve_failures += 1;
                return false;
            }
        };
        let reg = self.params.regularization_zeta * (1.0 / gamma).powf(self.params.regularization_nu);
        let l = match regularized_cholesky(&h, reg, 8) {
            Some(l) => l,
            None => {
                self.solve_failures += 1;
                return false;
            }
        };
        let rhs = Array1::from_iter(self.inactive.iter().map(|&i| -grad_psi[i]));
        let d_j = cholesky_solve(&l, &rhs);

        q.copy_from_slice(p);
        for (jj, &j) in self.inactive.iter().enumerate() {
            q[j] = d_j[jj];
        }
        let _ = k;
        true
    }

    fn changed_gamma(&mut self, _gamma: f64, _old_gamma: f64) {
        // Nothing to rescale: the next `apply` rebuilds H_JJ from scratch.
    }

    fn reset(&mut self) {
        self.inactive.clear();
    }

    fn has_initial_direction(&self) -> bool {
        !self.inactive.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag_hess(vals: Vec<f64>) -> impl FnMut(&[f64], f64, &[f64], &mut [f64]) -> bool {
        move |_x, alpha, v, out| {
            for i in 0..v.len() {
                out[i] = alpha * vals[i] * v[i];
            }
            true
        }
    }

    #[test]
    fn solves_diagonal_system_exactly_without_regularization() {
        let mut newton = Newton::new(2, NewtonParams::default(), diag_hess(vec![2.0, 4.0]));
        newton.set_inactive_indices(&[0, 1]);
        let x = [0.0, 0.0];
        let grad_psi = [4.0, 8.0];
        let p = [0.0, 0.0];
        let mut q = [0.0, 0.0];
        assert!(newton.apply(1.0, &x, &x, &p, &grad_psi, &mut q));
        // d_i = -grad_i / (diag_i + reg) ~= -2.0 for both coordinates
        assert!((q[0] - (-2.0)).abs() < 1e-6);
        assert!((q[1] - (-2.0)).abs() < 1e-6);
    }

    #[test]
    fn falls_back_when_no_inactive_coordinates() {
        let mut newton = Newton::new(2, NewtonParams::default(), diag_hess(vec![1.0, 1.0]));
        let x = [0.0, 0.0];
        let grad_psi = [1.0, 1.0];
        let p = [0.3, -0.3];
        let mut q = [0.0, 0.0];
        assert!(!newton.apply(1.0, &x, &x, &p, &grad_psi, &mut q));
    }

    #[test]
    fn regularizes_nonpositive_curvature_instead_of_failing() {
        let mut newton = Newton::new(1, NewtonParams::default(), diag_hess(vec![-1.0]));
        newton.set_inactive_indices(&[0]);
        let x = [0.0];
        let grad_psi = [1.0];
        let p = [0.0];
        let mut q = [0.0];
        assert!(newton.apply(1.0, &x, &x, &p, &grad_psi, &mut q));
        assert!(q[0].is_finite());
        assert_eq!(newton.solve_failures(), 0);
    }
}
