//! Simple convex sets with a cheap Euclidean projection.
//!
//! The inner solvers and the ALM outer loop are generic over the sets `C`
//! (decision-variable box), `D` (constraint box) and the dual admissible set
//! used by `eval_proj_multipliers`, via the [`Constraint`] trait. Concrete
//! sets are component-wise boxes (the common case, §3) and Euclidean balls
//! (used for penalty-method-style dual constraint sets by `AlmOptimizer`).

/// A closed convex set `S ⊆ R^n` admitting a cheap projection.
pub trait Constraint {
    /// Project `x` onto the set in place.
    fn project(&self, x: &mut [f64]);

    /// `true` for the unbounded set `R^n`; lets callers skip projection work.
    fn is_unbounded(&self) -> bool {
        false
    }
}

/// The whole space; `project` is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConstraints;

impl Constraint for NoConstraints {
    fn project(&self, _x: &mut [f64]) {}

    fn is_unbounded(&self) -> bool {
        true
    }
}

/// A point constraint, `S = {0}`; every component of `x` is zeroed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zero;

impl Constraint for Zero {
    fn project(&self, x: &mut [f64]) {
        x.iter_mut().for_each(|xi| *xi = 0.0);
    }
}

/// The Euclidean ball `{ x : ||x - center|| <= radius }`.
///
/// `center = None` means the ball is centered at the origin, avoiding an
/// allocation for the (very common) unshifted case.
#[derive(Debug, Clone)]
pub struct Ball2 {
    center: Option<Vec<f64>>,
    radius: f64,
}

impl Ball2 {
    /// Creates a new ball. Panics if `radius` is not positive.
    pub fn new(center: Option<Vec<f64>>, radius: f64) -> Self {
        assert!(radius > 0.0, "Ball2 radius must be positive");
        Ball2 { center, radius }
    }
}

impl Constraint for Ball2 {
    fn project(&self, x: &mut [f64]) {
        let norm = match &self.center {
            Some(c) => x
                .iter()
                .zip(c.iter())
                .map(|(xi, ci)| (xi - ci).powi(2))
                .sum::<f64>()
                .sqrt(),
            None => x.iter().map(|xi| xi * xi).sum::<f64>().sqrt(),
        };
        if norm <= self.radius {
            return;
        }
        let scale = self.radius / norm;
        match &self.center {
            Some(c) => x
                .iter_mut()
                .zip(c.iter())
                .for_each(|(xi, ci)| *xi = ci + (*xi - ci) * scale),
            None => x.iter_mut().for_each(|xi| *xi *= scale),
        }
    }
}

/// A component-wise box `[lower_i, upper_i]`, with `+-inf` bounds admissible
/// to denote one-sided or absent constraints (§3).
#[derive(Debug, Clone)]
pub struct Box {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Box {
    /// Builds a box from explicit bound vectors. Panics if the lengths
    /// differ or if any `lower_i > upper_i`.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        assert_eq!(lower.len(), upper.len(), "Box bound length mismatch");
        assert!(
            lower.iter().zip(upper.iter()).all(|(&l, &u)| l <= u),
            "Box lower bound exceeds upper bound"
        );
        Box { lower, upper }
    }

    /// The unconstrained box `(-inf, inf)^n`.
    pub fn free(n: usize) -> Self {
        Box {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// `true` when coordinate `i` has neither a finite lower nor upper bound.
    pub fn is_free(&self, i: usize) -> bool {
        self.lower[i] == f64::NEG_INFINITY && self.upper[i] == f64::INFINITY
    }
}

impl Constraint for Box {
    fn project(&self, x: &mut [f64]) {
        x.iter_mut()
            .zip(self.lower.iter())
            .zip(self.upper.iter())
            .for_each(|((xi, &l), &u)| *xi = xi.max(l).min(u));
    }

    fn is_unbounded(&self) -> bool {
        self.lower.iter().all(|&l| l == f64::NEG_INFINITY)
            && self.upper.iter().all(|&u| u == f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_projection_clamps_both_sides() {
        let b = Box::new(vec![-1.0, -1.0], vec![1.0, 1.0]);
        let mut x = [-9.0, 19.0];
        b.project(&mut x);
        assert_eq!(x, [-1.0, 1.0]);
    }

    #[test]
    fn box_projection_respects_infinite_bounds() {
        let b = Box::new(vec![f64::NEG_INFINITY, 0.0], vec![f64::INFINITY, 10.0]);
        let mut x = [-1e9, 15.0];
        b.project(&mut x);
        assert_eq!(x, [-1e9, 10.0]);
    }

    #[test]
    fn ball2_projection_idempotent() {
        let ball = Ball2::new(None, 1.5);
        let mut x = [3.0, 4.0];
        ball.project(&mut x);
        let norm = (x[0] * x[0] + x[1] * x[1]).sqrt();
        assert!((norm - 1.5).abs() < 1e-12);
        let x_once = x;
        ball.project(&mut x);
        assert_eq!(x, x_once);
    }
}
