//! The problem contract (§4.1).
//!
//! Rather than the C++ source's tagged-pointer type erasure (§9, "Polymorphism
//! without inheritance"), a single object-safe trait plays both roles: the
//! *required* methods have no default body, and the *optional* ones default
//! to reporting "not supported" (`false`/`None`). A concrete problem is
//! boxed as `dyn Problem` wherever the solver needs to hold one without a
//! type parameter; generic call sites take `&impl Problem` to stay
//! monomorphized on the hot path.

pub mod box_constr;

use crate::constraints::Box as Bounds;
use crate::error::SolverResult;
use crate::sparsity::SparsityDescriptor;

/// The full problem contract supplying `f`, `g` and their derivatives, the
/// box constraints `C`/`D`, and the proximal mapping of `h` (§3, §4.1).
///
/// All evaluation methods write into caller-owned buffers sized `n()`/`m()`
/// by the caller; this is what lets the inner solvers allocate every
/// workspace vector once at construction (the "workspace ownership" design
/// note) instead of inside the iteration loop.
pub trait Problem {
    /// Dimension of the decision variable `x`.
    fn n(&self) -> usize;

    /// Dimension of the constraint mapping `g(x)`. `0` for unconstrained
    /// problems, in which case `eval_g`/`eval_grad_g_prod` are never called.
    fn m(&self) -> usize;

    /// The decision-variable box `C`.
    fn c(&self) -> &Bounds;

    /// The constraint box `D`. Callers must not dereference this when
    /// `m() == 0`.
    fn d(&self) -> &Bounds;

    /// Index separating quadratic-penalty constraints (`< k_split`, dual
    /// kept at zero) from full-ALM constraints (§3, "Penalty split").
    fn k_split(&self) -> usize {
        0
    }

    /// Optional ell-1 weights `lambda`; `&[]` means `h` has no ell-1 term.
    fn l1_weights(&self) -> &[f64] {
        &[]
    }

    fn eval_f(&self, x: &[f64]) -> SolverResult<f64>;

    fn eval_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<()>;

    fn eval_g(&self, x: &[f64], g: &mut [f64]) -> SolverResult<()>;

    /// `out <- Jg(x)^T y`.
    fn eval_grad_g_prod(&self, x: &[f64], y: &[f64], out: &mut [f64]) -> SolverResult<()>;

    /// `z <- z - Pi_D(z)`, the bound-projection residual feeding the
    /// augmented Lagrangian (§3).
    fn eval_proj_diff_g(&self, z: &mut [f64]) {
        let d = self.d();
        for (zi, (&lo, &hi)) in z.iter_mut().zip(d.lower().iter().zip(d.upper().iter())) {
            let projected = zi.max(lo).min(hi);
            *zi -= projected;
        }
    }

    /// Projects `y` onto the per-component admissible dual set described in
    /// §4.1: clamped to `[-m, 0]` with only an upper bound, `[0, m]` with
    /// only a lower bound, `[-m, m]` otherwise; components below `k_split`
    /// are forced to zero.
    fn eval_proj_multipliers(&self, y: &mut [f64], m_bound: f64) {
        let d = self.d();
        let k_split = self.k_split();
        for (i, yi) in y.iter_mut().enumerate() {
            if i < k_split {
                *yi = 0.0;
                continue;
            }
            let has_lower = d.lower()[i] != f64::NEG_INFINITY;
            let has_upper = d.upper()[i] != f64::INFINITY;
            let (lo, hi) = match (has_lower, has_upper) {
                (true, false) => (0.0, m_bound),
                (false, true) => (-m_bound, 0.0),
                _ => (-m_bound, m_bound),
            };
            *yi = yi.max(lo).min(hi);
        }
    }

    /// Forward-backward proximal step: `x_hat <- prox_{gamma h}(x - gamma
    /// grad_psi)`, `p <- x_hat - x`. Returns `h(x_hat)`.
    fn eval_prox_grad_step(
        &self,
        gamma: f64,
        x: &[f64],
        grad_psi: &[f64],
        x_hat: &mut [f64],
        p: &mut [f64],
    ) -> SolverResult<f64>;

    /// Indices of coordinates strictly interior to the prox image (used by
    /// the structured L-BFGS / structured Newton direction providers).
    /// Returns `|J|` and fills `out` with the first `|J|` entries valid.
    fn eval_inactive_indices_res_lna(
        &self,
        gamma: f64,
        x: &[f64],
        grad_psi: &[f64],
        out: &mut [usize],
    ) -> usize {
        box_constr::default_inactive_indices(self.c(), self.l1_weights(), gamma, x, grad_psi, out)
    }

    // ---- optional capabilities, probed at initialization ----

    /// `out <- alpha * Hess_L(x, y) * v`.
    fn eval_hess_l_prod(
        &self,
        _x: &[f64],
        _y: &[f64],
        _alpha: f64,
        _v: &[f64],
        _out: &mut [f64],
    ) -> bool {
        false
    }

    /// `out <- alpha * Hess_psi(x) * v`.
    fn eval_hess_psi_prod(&self, _x: &[f64], _alpha: f64, _v: &[f64], _out: &mut [f64]) -> bool {
        false
    }

    /// Fills `values` with `alpha * Hess_L(x, y)` laid out per
    /// `sparsity_hess_l()`. Returns `false` if unsupported.
    fn eval_hess_l(&self, _x: &[f64], _y: &[f64], _alpha: f64, _values: &mut [f64]) -> bool {
        false
    }

    fn sparsity_hess_l(&self) -> Option<SparsityDescriptor> {
        None
    }

    fn eval_jac_g(&self, _x: &[f64], _values: &mut [f64]) -> bool {
        false
    }

    fn sparsity_jac_g(&self) -> Option<SparsityDescriptor> {
        None
    }

    // ---- fused composite ops; override for efficiency ----

    fn eval_f_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<f64> {
        self.eval_grad_f(x, grad)?;
        self.eval_f(x)
    }
}

/// A window into the admissible dual multiplier set derived from `D` and
/// `k_split`; kept separate from [`Problem`] so the ALM outer loop can
/// reason about it without re-deriving it from bounds each call.
pub fn has_constraints(problem: &dyn Problem) -> bool {
    problem.m() > 0
}
