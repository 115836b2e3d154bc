//! PANOC (§4.4): proximal-averaged Newton-type method, an FBE-merit Armijo
//! line search mixing the prox step with an accelerated direction. Shares
//! its Lipschitz/line-search kernel with ZeroFPR ([`crate::core::fbe`]);
//! selects [`Variant::Panoc`], which anchors the line search at `x_k`.

use crate::cancel::CancellationToken;
use crate::config::PanocParams;
use crate::core::fbe::{self, Variant, Workspace};
use crate::direction::DirectionProvider;
use crate::error::SolverResult;
use crate::problem::Problem;
use crate::stats::{InnerStats, ProgressCallback};

pub struct Panoc<'a> {
    problem: &'a dyn Problem,
    params: PanocParams,
    tolerance: f64,
    direction: &'a mut dyn DirectionProvider,
    token: CancellationToken,
    ws: Workspace,
}

impl<'a> Panoc<'a> {
    pub fn new(problem: &'a dyn Problem, direction: &'a mut dyn DirectionProvider) -> Self {
        let n = problem.n();
        Panoc {
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
            Variant::Panoc,
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
