//! PANOC driven by Anderson acceleration instead of L-BFGS (§4.3, §4.4):
//! any [`DirectionProvider`] plugs into the same FBE kernel, so this checks
//! the provider-swap seam rather than Anderson's own internals (covered by
//! `src/direction/anderson.rs`'s unit tests).

use panoc_alm::config::{AndersonParams, PanocParams};
use panoc_alm::constraints::Box as Bounds;
use panoc_alm::core::panoc::Panoc;
use panoc_alm::direction::anderson::Anderson;
use panoc_alm::direction::DirectionProvider;
use panoc_alm::error::SolverResult;
use panoc_alm::problem::box_constr::default_prox_grad_step;
use panoc_alm::stats::SolverStatus;
use panoc_alm::Problem;

/// `min 0.5*||x||^2` on a box `[-5, 5]^2`, minimizer at the origin (strictly
/// interior, so the box is never active at the solution).
struct BoxedQuadratic {
    c: Bounds,
    d: Bounds,
}

impl Problem for BoxedQuadratic {
    fn n(&self) -> usize {
        2
    }
    fn m(&self) -> usize {
        0
    }
    fn c(&self) -> &Bounds {
        &self.c
    }
    fn d(&self) -> &Bounds {
        &self.d
    }
    fn eval_f(&self, x: &[f64]) -> SolverResult<f64> {
        Ok(0.5 * (x[0] * x[0] + x[1] * x[1]))
    }
    fn eval_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<()> {
        grad[0] = x[0];
        grad[1] = x[1];
        Ok(())
    }
    fn eval_g(&self, _x: &[f64], _g: &mut [f64]) -> SolverResult<()> {
        Ok(())
    }
    fn eval_grad_g_prod(&self, _x: &[f64], _y: &[f64], _out: &mut [f64]) -> SolverResult<()> {
        Ok(())
    }
    fn eval_prox_grad_step(
        &self,
        gamma: f64,
        x: &[f64],
        grad_psi: &[f64],
        x_hat: &mut [f64],
        p: &mut [f64],
    ) -> SolverResult<f64> {
        Ok(default_prox_grad_step(&self.c, &[], gamma, x, grad_psi, x_hat, p))
    }
}

#[test]
fn panoc_with_anderson_converges_on_an_unconstrained_quadratic() {
    let problem = BoxedQuadratic {
        c: Bounds::new(vec![-5.0, -5.0], vec![5.0, 5.0]),
        d: Bounds::free(0),
    };
    let mut direction = Anderson::new(2, AndersonParams::default());
    let mut x = [4.0, -4.0];
    let stats = Panoc::new(&problem, &mut direction)
        .with_params(PanocParams::default())
        .with_tolerance(1e-8)
        .solve(&mut x)
        .unwrap();
    assert_eq!(stats.status, SolverStatus::Converged);
    assert!(x[0].abs() < 1e-3, "x = {x:?}");
    assert!(x[1].abs() < 1e-3, "x = {x:?}");
}

#[test]
fn anderson_history_is_populated_after_a_solve() {
    let problem = BoxedQuadratic {
        c: Bounds::new(vec![-5.0, -5.0], vec![5.0, 5.0]),
        d: Bounds::free(0),
    };
    let mut direction = Anderson::new(2, AndersonParams::default());
    let mut x = [1.0, 2.0];
    Panoc::new(&problem, &mut direction).with_tolerance(1e-6).solve(&mut x).unwrap();
    assert!(direction.has_initial_direction());
}
