//! ZeroFPR (§4.5): shares PANOC's Lipschitz and Armijo-on-the-FBE machinery
//! ([`crate::core::fbe`]), but selects [`Variant::ZeroFpr`], which anchors
//! the line search at the prox image `x_hat_k` instead of `x_k` and feeds
//! the direction provider the pair `(x_hat_k, x_hat_{k+1})`.

use crate::cancel::CancellationToken;
use crate::config::PanocParams;
use crate::core::fbe::{self, Variant, Workspace};
use crate::direction::DirectionProvider;
use crate::error::SolverResult;
use crate::problem::Problem;
use crate::stats::{InnerStats, ProgressCallback};

pub struct ZeroFpr<'a> {
    problem: &'a dyn Problem,
    params: PanocParams,
    tolerance: f64,
    direction: &'a mut dyn DirectionProvider,
    token: CancellationToken,
    ws: Workspace,
}

impl<'a> ZeroFpr<'a> {
    pub fn new(problem: &'a dyn Problem, direction: &'a mut dyn DirectionProvider) -> Self {
        let n = problem.n();
        ZeroFpr {
            problem,
            params: PanocParams::default(),
            tolerance: 1e-6,
            direction,
            token: CancellationToken::new(),
            ws: Workspace::new(n),
        }
    }

    pub fn with_params(mut self, params: PanocParams) -> Self {
        self.params = params;
        self
    }

    /// # Panics
    /// If `tolerance` is not positive.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        assert!(tolerance > 0.0);
        self.tolerance = tolerance;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn solve(&mut self, x: &mut [f64]) -> SolverResult<InnerStats> {
        self.solve_with_progress(x, None)
    }

    pub fn solve_with_progress(&mut self, x: &mut [f64], progress: Option<&mut dyn ProgressCallback>) -> SolverResult<InnerStats> {
        let outcome = fbe::solve(
            Variant::ZeroFpr,
            self.problem,
            &self.params,
            self.tolerance,
            self.direction,
            &self.token,
            progress,
            x,
            &mut self.ws,
        )?;
        Ok(outcome.stats)
    }
}
