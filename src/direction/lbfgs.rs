//! Cautious limited-memory BFGS (§4.3), adapted from alpaqa's
//! `inner/directions/lbfgs.hpp` and from this crate's own `lbfgs_mem`-sized
//! `PANOCCache` buffer.
//!
//! A pair `(s, z)` is accepted only when `z.s > 0` and `z.s / s.s >= epsilon
//! * ||p||^alpha` (the CBFGS guard): without it, a curvature pair from a
//! nonconvex region of `psi` could make `H_k` indefinite.

use std::collections::VecDeque;

use super::DirectionProvider;
use crate::config::{LbfgsParams, LbfgsStepSize};
use crate::matrix_operations::{inner_product, norm2};

struct Pair {
    s: Vec<f64>,
    z: Vec<f64>,
    rho: f64,
}

/// Cautious L-BFGS direction provider with a fixed-capacity pair history.
pub struct Lbfgs {
    params: LbfgsParams,
    history: VecDeque<Pair>,
    n: usize,
    workspace: Vec<f64>,
    alpha: Vec<f64>,
    rejections: usize,
}

impl Lbfgs {
    pub fn new(n: usize, params: LbfgsParams) -> Self {
        Lbfgs {
            history: VecDeque::with_capacity(params.memory),
            workspace: vec![0.0; n],
            alpha: vec![0.0; params.memory.max(1)],
            params,
            n,
            rejections: 0,
        }
    }

    pub fn rejections(&self) -> usize {
        self.rejections
    }

    fn push_pair(&mut self, s: Vec<f64>, z: Vec<f64>, sz: f64) {
        if self.history.len() == self.params.memory {
            self.history.pop_front();
        }
        self.history.push_back(Pair { s, z, rho: 1.0 / sz });
    }
}

impl DirectionProvider for Lbfgs {
    fn initialize(&mut self, _x0: &[f64], _x_hat0: &[f64], _p0: &[f64], _grad_psi0: &[f64], _gamma0: f64) {
        self.history.clear();
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
        let mut s = vec![0.0; self.n];
        let mut z = vec![0.0; self.n];
        for i in 0..self.n {
            s[i] = x_next[i] - x[i];
            z[i] = grad_psi_next[i] - grad_psi[i];
        }
        let sz = inner_product(&z, &s);
        let ss = inner_product(&s, &s);
        if ss <= 0.0 {
            self.rejections += 1;
            return false;
        }
        let p_norm = norm2(p);
        let threshold = self.params.cbfgs_epsilon * p_norm.powf(self.params.cbfgs_alpha);
        if sz > 0.0 && sz / ss >= threshold {
            self.push_pair(s, z, sz);
            true
        } else {
            self.rejections += 1;
            false
        }
    }

    fn apply(&mut self, gamma: f64, _x: &[f64], _x_hat: &[f64], p: &[f64], _grad_psi: &[f64], q: &mut [f64]) -> bool {
        if self.history.is_empty() {
            return false;
        }
        self.workspace.copy_from_slice(p);
        let m = self.history.len();
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
        let _ = m;
        q.copy_from_slice(&self.workspace);
        true
    }

    fn changed_gamma(&mut self, gamma: f64, old_gamma: f64) {
        if old_gamma <= 0.0 {
            return;
        }
        if self.params.rescale_on_gamma_change {
            let scale = gamma / old_gamma;
            for pair in self.history.iter_mut() {
                for zi in pair.z.iter_mut() {
                    *zi *= scale;
                }
                let sz = inner_product(&pair.z, &pair.s);
                if sz > 0.0 {
                    pair.rho = 1.0 / sz;
                }
            }
        } else {
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn has_initial_direction(&self) -> bool {
        !self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_pair_with_nonpositive_curvature() {
        let mut lbfgs = Lbfgs::new(2, LbfgsParams::default());
        let x = [0.0, 0.0];
        let x_next = [1.0, 0.0];
        let p = [1.0, 0.0];
        let grad = [0.0, 0.0];
        // z.s = -1 < 0: curvature condition fails
        let grad_next = [-1.0, 0.0];
        let accepted = lbfgs.update(1.0, 1.0, &x, &x_next, &p, &p, &grad, &grad_next);
        assert!(!accepted);
        assert_eq!(lbfgs.rejections(), 1);
        assert!(!lbfgs.has_initial_direction());
    }

    #[test]
    fn accepts_pair_and_applies_two_loop_recursion() {
        let mut lbfgs = Lbfgs::new(2, LbfgsParams::default());
        let x = [0.0, 0.0];
        let x_next = [1.0, 0.5];
        let p = [1.0, 0.5];
        let grad = [0.0, 0.0];
        let grad_next = [2.0, 1.0];
        assert!(lbfgs.update(1.0, 1.0, &x, &x_next, &p, &p, &grad, &grad_next));
        assert!(lbfgs.has_initial_direction());

        let mut q = [0.0, 0.0];
        let applied = lbfgs.apply(1.0, &x_next, &x_next, &p, &grad_next, &mut q);
        assert!(applied);
        assert!(q.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn memory_overflow_discards_oldest_pair() {
        let params = LbfgsParams {
            memory: 2,
            ..LbfgsParams::default()
        };
        let mut lbfgs = Lbfgs::new(1, params);
        let mut x = [0.0];
        let mut grad = [0.0];
        for k in 1..=3 {
            let x_next = [x[0] + 1.0];
            let grad_next = [grad[0] + 1.0];
            assert!(lbfgs.update(1.0, 1.0, &x, &x_next, &x_next, &x_next, &grad, &grad_next));
            x = x_next;
            grad = grad_next;
            let _ = k;
        }
        assert_eq!(lbfgs.history.len(), 2);
    }
}
