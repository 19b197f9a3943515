//! Closest-point L1 loss.
//!
//! The predicted curve is sampled on a `t` grid; every observation is matched
//! to its nearest curve sample in Manhattan distance and the loss is the mean
//! of those minimum distances:
//!
//! ```text
//! loss = (1/N) Σ_i min_j ( |x_curve_j − x_i| + |y_curve_j − y_i| )
//! ```
//!
//! This does not pair observation `i` with grid index `i`, so the metric is
//! insensitive to the order of both the observations and the grid.
//!
//! Caller contract: `x_obs` and `y_obs` have the same length, and the grid is
//! dense enough to represent the curve. Neither is checked here.

use crate::domain::Params;
use crate::models::ParametricModel;

#[derive(Debug, Clone, Copy)]
pub struct ClosestPointL1Loss {
    model: ParametricModel,
}

impl ClosestPointL1Loss {
    pub fn new(model: ParametricModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ParametricModel {
        &self.model
    }

    /// Mean minimum L1 distance from each observation to the sampled curve.
    ///
    /// Returns `NaN` when there are no observations and `inf` for an empty grid.
    pub fn compute(&self, params: &Params, t_grid: &[f64], x_obs: &[f64], y_obs: &[f64]) -> f64 {
        let (x_curve, y_curve) = self.model.predict_params(t_grid, params);

        let total: f64 = x_obs
            .iter()
            .zip(y_obs.iter())
            .map(|(&xi, &yi)| nearest_l1(&x_curve, &y_curve, xi, yi))
            .sum();

        total / x_obs.len() as f64
    }
}

fn nearest_l1(x_curve: &[f64], y_curve: &[f64], xi: f64, yi: f64) -> f64 {
    let mut best = f64::INFINITY;
    for (&xc, &yc) in x_curve.iter().zip(y_curve.iter()) {
        let d = (xc - xi).abs() + (yc - yi).abs();
        // A NaN sample must poison the loss, `f64::min` would skip it.
        if d.is_nan() {
            return f64::NAN;
        }
        if d < best {
            best = d;
        }
    }
    best
}
