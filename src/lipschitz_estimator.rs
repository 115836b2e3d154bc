//! Estimates a local Lipschitz constant of `grad_psi` at a point (§4.2).
//!
//! Computes the norm of the directional derivative of `F` along `h = max(
//! epsilon * u, delta)` (deterministic, not a random unit perturbation):
//! `||F(u + h) - F(u)|| / ||h||`. `F` is almost always `grad_psi`, so the
//! returned value seeds the quadratic-upper-bound backtracking loop shared
//! by every inner solver.

use crate::error::SolverResult;
use crate::matrix_operations;

pub struct LipschitzEstimator<'a, F>
where
    F: Fn(&[f64], &mut [f64]) -> SolverResult<()>,
{
    u_decision_var: &'a mut [f64],
    workspace: Vec<f64>,
    function_value_at_u: &'a mut [f64],
    function: &'a F,
    epsilon_lip: f64,
    delta_lip: f64,
}

impl<'a, F> LipschitzEstimator<'a, F>
where
    F: Fn(&[f64], &mut [f64]) -> SolverResult<()>,
{
    /// `u_`: point where the constant is estimated; perturbed in place by
    /// `estimate_local_lipschitz` (copy it first if the original is needed).
    /// `function_value_`: caller-owned buffer receiving `f_(u_)`.
    pub fn new(u_: &'a mut [f64], f_: &'a F, function_value_: &'a mut [f64]) -> LipschitzEstimator<'a, F> {
        let n: usize = u_.len();
        LipschitzEstimator {
            u_decision_var: u_,
            workspace: vec![0.0_f64; n],
            function_value_at_u: function_value_,
            function: f_,
            epsilon_lip: 1e-6,
            delta_lip: 1e-6,
        }
    }

    /// # Panics
    /// If `delta` is not positive.
    pub fn with_delta(mut self, delta: f64) -> Self {
        assert!(delta > 0.0);
        self.delta_lip = delta;
        self
    }

    /// # Panics
    /// If `epsilon` is not positive.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        assert!(epsilon > 0.0);
        self.epsilon_lip = epsilon;
        self
    }

    /// The value of `F` at the (pre-perturbation) point, populated once
    /// `estimate_local_lipschitz` has run; all zeros beforehand.
    pub fn get_function_value(&self) -> &[f64] {
        self.function_value_at_u
    }

    pub fn estimate_local_lipschitz(&mut self) -> SolverResult<f64> {
        (self.function)(self.u_decision_var, self.function_value_at_u)?;
        let epsilon_lip = self.epsilon_lip;
        let delta_lip = self.delta_lip;

        self.workspace
            .iter_mut()
            .zip(self.u_decision_var.iter())
            .for_each(|(out, &s)| *out = if epsilon_lip * s > delta_lip { epsilon_lip * s } else { delta_lip });
        let norm_h = matrix_operations::norm2(&self.workspace);

        self.u_decision_var
            .iter_mut()
            .zip(self.workspace.iter())
            .for_each(|(out, a)| *out += *a);

        (self.function)(self.u_decision_var, &mut self.workspace)?;

        self.workspace
            .iter_mut()
            .zip(self.function_value_at_u.iter())
            .for_each(|(out, a)| *out -= *a);

        let norm_workspace = matrix_operations::norm2(&self.workspace);
        Ok(norm_workspace / norm_h)
    }
}
