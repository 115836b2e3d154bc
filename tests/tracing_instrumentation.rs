//! Confirms the `tracing` events documented for the inner solvers and the
//! ALM outer loop are actually emitted, not just declared in prose: installs
//! a counting `Layer` as the default subscriber for the duration of a solve
//! and checks it observed at least one event.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use panoc_alm::alm::{AlmOptimizer, InnerSolverChoice};
use panoc_alm::config::PanocParams;
use panoc_alm::constraints::Box as Bounds;
use panoc_alm::core::panoc::Panoc;
use panoc_alm::direction::lbfgs::Lbfgs;
use panoc_alm::error::SolverResult;
use panoc_alm::problem::box_constr::default_prox_grad_step;
use panoc_alm::stats::SolverStatus;
use panoc_alm::Problem;

struct CountingLayer(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for CountingLayer {
    fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Quadratic {
    c: Bounds,
    d: Bounds,
}

impl Problem for Quadratic {
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
        Ok(0.5 * (x[0] * x[0] + 3.0 * x[1] * x[1]))
    }
    fn eval_grad_f(&self, x: &[f64], grad: &mut [f64]) -> SolverResult<()> {
        grad[0] = x[0];
        grad[1] = 3.0 * x[1];
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
fn panoc_solve_emits_tracing_events() {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(CountingLayer(count.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let problem = Quadratic {
        c: Bounds::free(2),
        d: Bounds::free(0),
    };
    let mut direction = Lbfgs::new(2, Default::default());
    let mut x = [3.0, -4.0];
    let stats = Panoc::new(&problem, &mut direction)
        .with_params(PanocParams::default())
        .with_tolerance(1e-6)
        .solve(&mut x)
        .unwrap();

    assert_eq!(stats.status, SolverStatus::Converged);
    assert!(count.load(Ordering::SeqCst) > 0, "fbe::solve emitted no tracing events");
}

#[test]
fn alm_solve_emits_tracing_events() {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(CountingLayer(count.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let problem = Quadratic {
        c: Bounds::free(2),
        d: Bounds::free(0),
    };
    let mut x = [3.0, -4.0];
    let mut alm = AlmOptimizer::new(&problem).with_inner_solver(InnerSolverChoice::Panoc);
    let stats = alm.solve(&mut x).unwrap();

    assert_eq!(stats.status, SolverStatus::Converged);
    assert!(count.load(Ordering::SeqCst) > 0, "the ALM loop emitted no tracing events");
}
