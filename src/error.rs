//! Error kinds shared by every layer of the solver.
//!
//! The core distinguishes two very different failure registers (§7 of the
//! design notes): contract violations, which are always fatal and abort the
//! solve with a named offending parameter, and everything else (numerical
//! failure, stagnation, budget exhaustion, cancellation), which is reported
//! through [`crate::stats::SolverStatus`] instead of an `Err`. Only the
//! former is modeled as a [`SolverError`] — the inner loops, direction
//! providers and Lipschitz estimator recover locally from the latter and
//! never propagate an exception-shaped error for them.

use thiserror::Error;

/// Fatal error raised by a problem evaluation or by a malformed contract.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A required capability was probed but the problem did not implement it.
    #[error("missing required problem capability: {0}")]
    MissingCapability(&'static str),

    /// A caller-owned buffer did not have the expected length.
    #[error("buffer size mismatch for `{name}`: expected {expected}, got {got}")]
    SizeMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    /// A sparsity descriptor was inconsistent with the buffer it describes.
    #[error("invalid sparsity descriptor: {0}")]
    InvalidSparsity(String),

    /// A problem evaluation produced NaN/Inf output, even after one retry
    /// with a shorter step.
    #[error("non-finite value produced by `{0}`")]
    NotFinite(&'static str),

    /// The user-supplied evaluation function itself reported failure.
    #[error("problem evaluation `{0}` failed")]
    EvaluationFailed(&'static str),

    /// A linear solve (Cholesky/LDL^T, Steihaug-CG) could not produce a
    /// direction; callers treat this as a direction-provider failure and
    /// fall back to the plain prox step rather than surfacing it further.
    #[error("linear solve failed: {0}")]
    LinearSolve(String),
}

/// Result alias used pervasively across problem evaluations.
pub type SolverResult<T> = Result<T, SolverError>;
