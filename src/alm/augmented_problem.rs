//! Wraps a user [`Problem`] into the unconstrained-looking `psi(x; y, sigma)
//! = f(x) + sigma/2 * ||g(x) - y/sigma - Pi_D(g(x) - y/sigma)||^2` the inner
//! solvers actually optimize (§3, §4.8). A fresh wrapper is constructed for
//! each outer iteration with that iteration's `y`/`sigma`; evaluation
//! methods take `&self` (the `Problem` contract), so the scratch buffers
//! still live behind a `RefCell` the way a single-threaded wrapper type
//! conventionally would.

use std::cell::RefCell;

use crate::constraints::Box as Bounds;
use crate::error::SolverResult;
use crate::problem::Problem;
use crate::sparsity::SparsityDescriptor;

pub struct AugmentedProblem<'p> {
    inner: &'p dyn Problem,
    y: RefCell<Vec<f64>>,
    sigma: RefCell<Vec<f64>>,
    scratch_g: RefCell<Vec<f64>>,
    scratch_z: RefCell<Vec<f64>>,
    scratch_jt: RefCell<Vec<f64>>,
}

impl<'p> AugmentedProblem<'p> {
    pub fn new(inner: &'p dyn Problem, y: &[f64], sigma: &[f64]) -> Self {
        let m = inner.m();
        AugmentedProblem {
            inner,
            y: RefCell::new(y.to_vec()),
            sigma: RefCell::new(sigma.to_vec()),
            scratch_g: RefCell::new(vec![0.0; m]),
            scratch_z: RefCell::new(vec![0.0; m]),
            scratch_jt: RefCell::new(vec![0.0; inner.n()]),
        }
    }

    /// `z <- g(x) - y/sigma`, projected: `z <- z - Pi_D(z)`. Returns a copy
    /// so the outer loop can measure infeasibility without re-evaluating
    /// `g` itself.
    pub fn constraint_residual(&self, x: &[f64]) -> SolverResult<Vec<f64>> {
        let m = self.inner.m();
        if m == 0 {
            return Ok(Vec::new());
        }
        let mut g = vec![0.0; m];
        self.inner.eval_g(x, &mut g)?;
        let y = self.y.borrow();
        let sigma = self.sigma.borrow();
        let mut z: Vec<f64> = g
            .iter()
            .zip(y.iter())
            .zip(sigma.iter())
            .map(|((&gi, &yi), &si)| gi - yi / si)
            .collect();
        self.inner.eval_proj_diff_g(&mut z);
        Ok(z)
    }
}

impl<'p> Problem for AugmentedProblem<'p> {
    fn n(&self) -> usize {
        self.inner.n()
    }

    fn m(&self) -> usize {
        // The inner solvers never see the original `g`; the augmented term
        // is folded entirely into `f`/`grad_f` below.
        0
    }

    fn c(&self) -> &Bounds {
        self.inner.c()
    }

    fn d(&self) -> &Bounds {
        self.inner.d()
    }

    fn k_split(&self) -> usize {
        self.inner.k_split()
    }

    fn l1_weights(&self) -> &[f64] {
        self.inner.l1_weights()
    }

    fn eval_f(&self, x: &[f64]) -> SolverResult<f64> {
        let f = self.inner.eval_f(x)?;
        let m = self.inner.m();
        if m == 0 {
            return Ok(f);
        }
        let mut g = self.scratch_g.borrow_mut();
        self.inner.eval_g(x, &mut g)?;
        let y = self.y.borrow();
        let sigma = self.sigma.borrow();
        let mut z = self.scratch_z.borrow_mut();
        for i in 0..m {
            z[i] = g[i] - y[i] / sigma[i];
        }
        self.inner.eval_proj_diff_g(&mut z);
        let penalty: f64 = z.iter().zip(sigma.iter()).map(|(&zi, &si)| 0.5 * si * zi * zi).sum();
        Ok(f + penalty)
    }

    fn eval_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<()> {
        self.inner.eval_grad_f(x, grad)?;
        let m = self.inner.m();
        if m == 0 {
            return Ok(());
        }
        let mut g = self.scratch_g.borrow_mut();
        self.inner.eval_g(x, &mut g)?;
        let y = self.y.borrow();
        let sigma = self.sigma.borrow();
        let mut z = self.scratch_z.borrow_mut();
        for i in 0..m {
            z[i] = g[i] - y[i] / sigma[i];
        }
        self.inner.eval_proj_diff_g(&mut z);
        for i in 0..m {
            z[i] *= sigma[i];
        }
        let mut jt = self.scratch_jt.borrow_mut();
        self.inner.eval_grad_g_prod(x, &z, &mut jt)?;
        for i in 0..grad.len() {
            grad[i] += jt[i];
        }
        Ok(())
    }

    fn eval_g(&self, x: &[f64], g: &mut [f64]) -> SolverResult<()> {
        self.inner.eval_g(x, g)
    }

    fn eval_grad_g_prod(&self, x: &[f64], y: &[f64], out: &mut [f64]) -> SolverResult<()> {
        self.inner.eval_grad_g_prod(x, y, out)
    }

    fn eval_prox_grad_step(
        &self,
        gamma: f64,
        x: &[f64],
        grad_psi: &[f64],
        x_hat: &mut [f64],
        p: &mut [f64],
    ) -> SolverResult<f64> {
        self.inner.eval_prox_grad_step(gamma, x, grad_psi, x_hat, p)
    }

    fn eval_inactive_indices_res_lna(&self, gamma: f64, x: &[f64], grad_psi: &[f64], out: &mut [usize]) -> usize {
        self.inner.eval_inactive_indices_res_lna(gamma, x, grad_psi, out)
    }

    fn eval_hess_l_prod(&self, x: &[f64], y: &[f64], alpha: f64, v: &[f64], out: &mut [f64]) -> bool {
        self.inner.eval_hess_l_prod(x, y, alpha, v, out)
    }

    fn eval_hess_psi_prod(&self, x: &[f64], alpha: f64, v: &[f64], out: &mut [f64]) -> bool {
        self.inner.eval_hess_psi_prod(x, alpha, v, out)
    }

    fn eval_hess_l(&self, x: &[f64], y: &[f64], alpha: f64, values: &mut [f64]) -> bool {
        self.inner.eval_hess_l(x, y, alpha, values)
    }

    fn sparsity_hess_l(&self) -> Option<SparsityDescriptor> {
        self.inner.sparsity_hess_l()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Box as Bounds;

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
            g[0] = x[0] - 1.0;
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
    fn augmented_objective_adds_quadratic_penalty_for_equality_constraint() {
        let problem = EqualityConstrained {
            c: Bounds::free(1),
            d: Bounds::new(vec![0.0], vec![0.0]),
        };
        let augmented = AugmentedProblem::new(&problem, &[0.0], &[2.0]);
        // g(x)=x-1, y=0, sigma=2 => z = (x-1) - Pi_{0}(x-1) = x-1
        // f_aug(x) = 0.5x^2 + 0.5*2*(x-1)^2
        let f_aug = augmented.eval_f(&[0.0]).unwrap();
        assert!((f_aug - (0.0 + 1.0)).abs() < 1e-12);
    }
}
