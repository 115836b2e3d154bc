//! A proximal-gradient optimization toolbox: four inner solvers (PANOC,
//! ZeroFPR, FISTA, PANTR) for the nonconvex-nonsmooth composite problem
//! `min_x f(x) + h(x)` subject to box constraints, driven by an augmented
//! Lagrangian outer loop ([`alm::AlmOptimizer`]) for the general-constrained
//! problem `min_x f(x) + h(x)` s.t. `g(x) in D`.
//!
//! Start at [`problem::Problem`] for the contract a caller implements, and
//! [`alm::AlmOptimizer`] or one of the `core` solvers directly for the
//! unconstrained/box-only case.

pub mod abi;
pub mod alm;
pub mod cancel;
pub mod config;
pub mod constraints;
pub mod core;
pub mod diagnostics;
pub mod direction;
pub mod error;
pub mod lipschitz_estimator;
pub mod matrix_operations;
pub mod problem;
pub mod sparsity;
pub mod stats;

pub use error::{SolverError, SolverResult};
pub use problem::Problem;
pub use stats::{AlmStats, InnerStats, SolverStatus};
