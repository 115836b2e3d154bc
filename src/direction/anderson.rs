//! Anderson acceleration (§4.3), verified against alpaqa's
//! `test-anderson-acceleration.cpp`.
//!
//! The fixed-point map mixed here is the forward-backward operator itself:
//! `g_k = x_k + p_k` (the prox-gradient image), `r_k = g_k - x_k = p_k`. The
//! mixing weights solve `min_gamma || DeltaR * gamma - r_current ||` by the
//! normal equations against a small (`memory x memory`) Gram matrix — a
//! direct substitute for incrementally updating a QR factorization of
//! `DeltaR` column-by-column that solves the identical least-squares
//! problem without needing external linear-algebra crate plumbing for a
//! handful of columns.

use std::collections::VecDeque;

use ndarray::{Array1, Array2};

use super::DirectionProvider;
use crate::config::AndersonParams;
use crate::matrix_operations::inner_product;

/// Solves the SPD system `a * x = b` by Gaussian elimination with partial
/// pivoting. `a` is consumed (rows scaled/eliminated in place on a copy).
fn solve_dense(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    if n == 0 {
        return Some(Array1::zeros(0));
    }
    let mut m = a.clone();
    let mut rhs = b.clone();
    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = m[[col, col]].abs();
        for row in (col + 1)..n {
            if m[[row, col]].abs() > pivot_val {
                pivot_val = m[[row, col]].abs();
                pivot_row = row;
            }
        }
        if pivot_val < 1e-14 {
            return None;
        }
        for k in 0..n {
            m.swap([col, k], [pivot_row, k]);
        }
        rhs.swap(col, pivot_row);
        for row in (col + 1)..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut sum = rhs[row];
        for k in (row + 1)..n {
            sum -= m[[row, k]] * x[k];
        }
        x[row] = sum / m[[row, row]];
    }
    Some(x)
}

pub struct Anderson {
    n: usize,
    memory: usize,
    regularization: f64,
    g_history: VecDeque<Vec<f64>>,
    r_history: VecDeque<Vec<f64>>,
}

impl Anderson {
    pub fn new(n: usize, params: AndersonParams) -> Self {
        Anderson {
            n,
            memory: params.memory,
            regularization: params.regularization,
            g_history: VecDeque::with_capacity(params.memory + 1),
            r_history: VecDeque::with_capacity(params.memory + 1),
        }
    }

    fn push(&mut self, g: Vec<f64>, r: Vec<f64>) {
        if self.g_history.len() == self.memory + 1 {
            self.g_history.pop_front();
            self.r_history.pop_front();
        }
        self.g_history.push_back(g);
        self.r_history.push_back(r);
    }
}

impl DirectionProvider for Anderson {
    fn initialize(&mut self, x0: &[f64], x_hat0: &[f64], p0: &[f64], _grad_psi0: &[f64], _gamma0: f64) {
        self.g_history.clear();
        self.r_history.clear();
        let _ = x0;
        self.push(x_hat0.to_vec(), p0.to_vec());
    }

    fn update(
        &mut self,
        _gamma: f64,
        _gamma_next: f64,
        _x: &[f64],
        x_next: &[f64],
        _p: &[f64],
        p_next: &[f64],
        _grad_psi: &[f64],
        _grad_psi_next: &[f64],
    ) -> bool {
        let g_next: Vec<f64> = x_next
            .iter()
            .zip(p_next.iter())
            .map(|(&xi, &pi)| xi + pi)
            .collect();
        self.push(g_next, p_next.to_vec());
        true
    }

    fn apply(&mut self, _gamma: f64, _x: &[f64], _x_hat: &[f64], _p: &[f64], _grad_psi: &[f64], q: &mut [f64]) -> bool {
        let k = self.r_history.len();
        if k < 2 {
            return false;
        }
        let m = k - 1;
        let rs: Vec<&Vec<f64>> = self.r_history.iter().collect();
        let gs: Vec<&Vec<f64>> = self.g_history.iter().collect();
        let r_current = rs[k - 1];

        let mut delta_r: Vec<Vec<f64>> = Vec::with_capacity(m);
        for i in 1..k {
            let col: Vec<f64> = (0..self.n).map(|j| rs[i][j] - rs[i - 1][j]).collect();
            delta_r.push(col);
        }

        let mut ata = Array2::<f64>::zeros((m, m));
        let mut atb = Array1::<f64>::zeros(m);
        for i in 0..m {
            for j in 0..m {
                ata[[i, j]] = inner_product(&delta_r[i], &delta_r[j]);
            }
            ata[[i, i]] += self.regularization;
            atb[i] = inner_product(&delta_r[i], r_current);
        }
        let gamma_coef = match solve_dense(&ata, &atb) {
            Some(g) => g,
            None => return false,
        };

        let mut alpha = vec![0.0; m + 1];
        alpha[0] = gamma_coef[0];
        for i in 1..m {
            alpha[i] = gamma_coef[i] - gamma_coef[i - 1];
        }
        alpha[m] = 1.0 - gamma_coef[m - 1];

        q.iter_mut().for_each(|v| *v = 0.0);
        for (i, alpha_i) in alpha.iter().enumerate() {
            for j in 0..self.n {
                q[j] += alpha_i * gs[i][j];
            }
        }
        true
    }

    fn changed_gamma(&mut self, _gamma: f64, _old_gamma: f64) {
        self.reset();
    }

    fn reset(&mut self) {
        self.g_history.clear();
        self.r_history.clear();
    }

    fn has_initial_direction(&self) -> bool {
        self.r_history.len() >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solve_matches_known_minimizer() {
        // DeltaR = [[1, 0], [0, 1]] (identity), r = [3, 4] => gamma = [3, 4]
        let ata = Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let atb = Array1::from_vec(vec![3.0, 4.0]);
        let x = solve_dense(&ata, &atb).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-12);
        assert!((x[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn apply_needs_at_least_two_residuals() {
        let mut aa = Anderson::new(2, AndersonParams::default());
        aa.initialize(&[0.0, 0.0], &[1.0, 0.0], &[1.0, 0.0], &[0.0, 0.0], 1.0);
        let mut q = [0.0, 0.0];
        assert!(!aa.apply(1.0, &[0.0, 0.0], &[1.0, 0.0], &[1.0, 0.0], &[0.0, 0.0], &mut q));
    }

    #[test]
    fn apply_mixes_history_after_one_update() {
        let mut aa = Anderson::new(1, AndersonParams::default());
        aa.initialize(&[0.0], &[1.0], &[1.0], &[0.0], 1.0);
        aa.update(1.0, 1.0, &[0.0], &[1.0], &[1.0], &[0.5], &[0.0], &[0.0]);
        assert!(aa.has_initial_direction());
        let mut q = [0.0];
        let ok = aa.apply(1.0, &[1.0], &[1.5], &[0.5], &[0.0], &mut q);
        assert!(ok);
        assert!(q[0].is_finite());
    }
}
