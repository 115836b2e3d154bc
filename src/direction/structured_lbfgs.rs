//! Structured L-BFGS (§4.3): the cautious two-loop recursion restricted to
//! the coordinates `J` that [`Problem::eval_inactive_indices_res_lna`]
//! reports as inactive, with a Hessian cross-term correcting for the
//! coordinates `K` the prox step pinned to a bound.
//!
//! Grounded on the same `lbfgs.hpp` curvature guard as the plain variant,
//! specialized the way alpaqa's structured-lbfgs direction restricts `s`/`z`
//! to `J` before the two-loop recursion, then adds back `-gamma * H_{JK} *
//! p_K` so the fixed coordinates still influence the free ones.
//!
//! Keeping the `DirectionProvider` trait uniform meant this type can't take
//! a `Problem` or an inactive-set argument through `apply`/`update` without
//! also forcing those parameters on every other provider; instead the inner
//! solver calls [`StructuredLbfgs::set_inactive_indices`] once per iteration
//! before `apply`, and the Hessian-vector product is captured as a closure
//! at construction (§9, "Structured direction access to Hess_psi").

use std::collections::VecDeque;

use super::DirectionProvider;
use crate::config::{LbfgsParams, LbfgsStepSize};
use crate::matrix_operations::inner_product;

struct Pair {
    s: Vec<f64>,
    z: Vec<f64>,
    rho: f64,
}

/// `hess_psi_prod(x, alpha, v, out)`: `out <- alpha * Hess_psi(x) * v`,
/// mirroring [`crate::problem::Problem::eval_hess_psi_prod`]. Returns
/// `false` when the Hessian is unavailable, in which case the cross-term
/// correction is skipped for that call.
pub struct StructuredLbfgs<H> {
    params: LbfgsParams,
    history: VecDeque<Pair>,
    n: usize,
    hess_psi_prod: H,
    inactive: Vec<usize>,
    workspace: Vec<f64>,
    alpha: Vec<f64>,
    cross_v: Vec<f64>,
    cross_hv: Vec<f64>,
    rejections: usize,
}

impl<H> StructuredLbfgs<H>
where
    H: FnMut(&[f64], f64, &[f64], &mut [f64]) -> bool,
{
    pub fn new(n: usize, params: LbfgsParams, hess_psi_prod: H) -> Self {
        StructuredLbfgs {
            history: VecDeque::with_capacity(params.memory),
            workspace: vec![0.0; n],
            alpha: vec![0.0; params.memory.max(1)],
            cross_v: vec![0.0; n],
            cross_hv: vec![0.0; n],
            params,
            n,
            hess_psi_prod,
            inactive: Vec::new(),
            rejections: 0,
        }
    }

    pub fn rejections(&self) -> usize {
        self.rejections
    }

    /// Tells the provider which coordinates are currently inactive (`J`).
    /// Must be called before `apply` on every iteration; coordinates not in
    /// `inactive` are treated as fixed (`K`) for the cross-term correction.
    pub fn set_inactive_indices(&mut self, inactive: &[usize]) {
        self.inactive.clear();
        self.inactive.extend_from_slice(inactive);
    }

    fn is_inactive(&self, i: usize) -> bool {
        self.inactive.contains(&i)
    }

    fn push_pair(&mut self, s: Vec<f64>, z: Vec<f64>, sz: f64) {
        if self.history.len() == self.params.memory {
            self.history.pop_front();
        }
        self.history.push_back(Pair { s, z, rho: 1.0 / sz });
    }
}

impl<H> DirectionProvider for StructuredLbfgs<H>
where
    H: FnMut(&[f64], f64, &[f64], &mut [f64]) -> bool,
{
    fn initialize(&mut self, _x0: &[f64], _x_hat0: &[f64], _p0: &[f64], _grad_psi0: &[f64], _gamma0: f64) {
        self.history.clear();
        self.inactive.clear();
    }

    fn update(
        &mut self,
        _gamma: f64,
        _gamma_next: f64,
        x: &[f64],
        x_next: &[f64],
        p: &[f64],
        _p_next: &[f64],
        grad_psi: &[f64],
        grad_psi_next: &[f64],
    ) -> bool {
        // Restrict the pair to J: coordinates outside the inactive set never
        // moved in a way attributable to curvature of psi on J.
        let mut s = vec![0.0; self.n];
        let mut z = vec![0.0; self.n];
        for i in 0..self.n {
            if self.inactive.is_empty() || self.is_inactive(i) {
                s[i] = x_next[i] - x[i];
                z[i] = grad_psi_next[i] - grad_psi[i];
            }
        }
        let sz = inner_product(&z, &s);
        let ss = inner_product(&s, &s);
        if ss <= 0.0 {
            self.rejections += 1;
            return false;
        }
        let p_norm = crate::matrix_operations::norm2(p);
        let threshold = self.params.cbfgs_epsilon * p_norm.powf(self.params.cbfgs_alpha);
        if sz > 0.0 && sz / ss >= threshold {
            self.push_pair(s, z, sz);
            true
        } else {
            self.rejections += 1;
            false
        }
    }

    fn apply(&mut self, gamma: f64, x: &[f64], _x_hat: &[f64], p: &[f64], _grad_psi: &[f64], q: &mut [f64]) -> bool {
        if self.history.is_empty() {
            return false;
        }
        self.workspace.copy_from_slice(p);
        for (i, pair) in self.history.iter().enumerate().rev() {
            let a = pair.rho * inner_product(&pair.s, &self.workspace);
            self.alpha[i] = a;
            for k in 0..self.n {
                self.workspace[k] -= a * pair.z[k];
            }
        }
        let last = self.history.back().unwrap();
        let h0 = match self.params.step_size {
            LbfgsStepSize::BasedOnExternalStepSize => gamma,
            LbfgsStepSize::BasedOnCurvature => {
                let sz = inner_product(&last.s, &last.z);
                let zz = inner_product(&last.z, &last.z);
                if zz > 0.0 {
                    sz / zz
                } else {
                    gamma
                }
            }
        };
        for v in self.workspace.iter_mut() {
            *v *= h0;
        }
        for (i, pair) in self.history.iter().enumerate() {
            let beta = pair.rho * inner_product(&pair.z, &self.workspace);
            let a = self.alpha[i];
            for k in 0..self.n {
                self.workspace[k] += (a - beta) * pair.s[k];
            }
        }
        q.copy_from_slice(&self.workspace);

        if !self.inactive.is_empty() && self.inactive.len() < self.n {
            // Cross-term: zero out J in v, keep K's actual prox step, so
            // hess_psi_prod(x, -gamma, v) approximates -gamma * H_{.,K} * p_K.
            self.cross_v.iter_mut().for_each(|c| *c = 0.0);
            for i in 0..self.n {
                if !self.is_inactive(i) {
                    self.cross_v[i] = p[i];
                }
            }
            if (self.hess_psi_prod)(x, -gamma, &self.cross_v, &mut self.cross_hv) {
                for &j in &self.inactive {
                    q[j] += self.cross_hv[j];
                }
            }
        }
        true
    }

    fn changed_gamma(&mut self, gamma: f64, old_gamma: f64) {
        if old_gamma <= 0.0 {
            self.reset();
            return;
        }
        // §9: the structured variant defaults to a full reset rather than
        // rescaling, since a step-size change usually coincides with the
        // active set changing too, making the stored J-restricted pairs
        // stale regardless of rescaling.
        let _ = gamma;
        self.reset();
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn has_initial_direction(&self) -> bool {
        !self.history.is_empty()
    }
}
