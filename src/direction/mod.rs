//! Direction providers (§4.3): pluggable accelerators feeding a search
//! direction `q` into the inner solvers. Every variant shares the same
//! capability set so PANOC/ZeroFPR/FISTA can be generic over the choice.

pub mod anderson;
pub mod lbfgs;
pub mod newton;
pub mod steihaug_cg;
pub mod structured_lbfgs;

/// A pluggable accelerated-direction source (§4.3).
///
/// `apply` failing (returning `false`) is not an error: the caller falls
/// back to `q = p`, and the failure is only ever recorded in statistics
/// (§7, "Direction-provider failure"). Likewise `update` returning `false`
/// just means the new pair was rejected and history is unchanged.
pub trait DirectionProvider {
    /// Seeds the provider with the very first (x, x_hat, p, grad_psi, gamma)
    /// tuple, before any `update` call.
    fn initialize(&mut self, x0: &[f64], x_hat0: &[f64], p0: &[f64], grad_psi0: &[f64], gamma0: f64);

    /// Feeds a new iterate pair. `accepted = false` means the pair failed a
    /// guard (e.g. the cautious-BFGS curvature condition) and history is
    /// unchanged.
    #[allow(clippy::too_many_arguments)]
    fn update(
        &mut self,
        gamma: f64,
        gamma_next: f64,
        x: &[f64],
        x_next: &[f64],
        p: &[f64],
        p_next: &[f64],
        grad_psi: &[f64],
        grad_psi_next: &[f64],
    ) -> bool;

    /// Fills `q` with the accelerated direction. `false` means the caller
    /// must fall back to `q = p`.
    fn apply(&mut self, gamma: f64, x: &[f64], x_hat: &[f64], p: &[f64], grad_psi: &[f64], q: &mut [f64]) -> bool;

    /// Notifies the provider that the step size changed, so it can rescale
    /// or reset its history (§4.3, §9: default is to reset).
    fn changed_gamma(&mut self, gamma: f64, old_gamma: f64);

    fn reset(&mut self);

    /// `true` once at least one pair/column has been accepted into history.
    fn has_initial_direction(&self) -> bool {
        false
    }
}
