//! Parametric spiral-like curve.
//!
//! For a curve parameter `t` and parameters `(θ, M, X)`:
//!
//! ```text
//! x(t) = t·cos θ − e^{M|t|}·sin(ωt)·sin θ + X
//! y(t) = y0 + t·sin θ + e^{M|t|}·sin(ωt)·cos θ
//! ```
//!
//! with `ω = frequency` (0.3) and `y0 = y_offset` (42).
//!
//! Numerical notes:
//! - Nothing is clamped here. Large `M·|t|` overflows `exp` to `inf`, and the
//!   predicted coordinates become `inf`/`NaN`. The optimizer is responsible for
//!   rejecting non-finite losses.

use crate::domain::{Interval, ParameterBounds, Params};

pub const DEFAULT_Y_OFFSET: f64 = 42.0;
pub const DEFAULT_FREQUENCY: f64 = 0.3;

/// Fixed search box: θ ∈ [0, 50]°, M ∈ [-0.05, 0.05], X ∈ [0, 100].
pub const PARAMETER_BOUNDS: ParameterBounds = ParameterBounds {
    theta_deg: Interval::new(0.0, 50.0),
    m: Interval::new(-0.05, 0.05),
    x: Interval::new(0.0, 100.0),
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParametricModel {
    pub y_offset: f64,
    pub frequency: f64,
}

impl Default for ParametricModel {
    fn default() -> Self {
        Self {
            y_offset: DEFAULT_Y_OFFSET,
            frequency: DEFAULT_FREQUENCY,
        }
    }
}

impl ParametricModel {
    pub fn new(y_offset: f64, frequency: f64) -> Self {
        Self { y_offset, frequency }
    }

    /// Evaluate the curve at every `t` in `t_samples`.
    pub fn predict(
        &self,
        t_samples: &[f64],
        theta_deg: f64,
        m: f64,
        x: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        let (sin_theta, cos_theta) = theta_deg.to_radians().sin_cos();

        let mut x_pred = Vec::with_capacity(t_samples.len());
        let mut y_pred = Vec::with_capacity(t_samples.len());
        for &t in t_samples {
            let (xp, yp) = self.point(t, sin_theta, cos_theta, m, x);
            x_pred.push(xp);
            y_pred.push(yp);
        }
        (x_pred, y_pred)
    }

    pub fn predict_params(&self, t_samples: &[f64], params: &Params) -> (Vec<f64>, Vec<f64>) {
        self.predict(t_samples, params.theta_deg, params.m, params.x)
    }

    #[inline]
    fn point(&self, t: f64, sin_theta: f64, cos_theta: f64, m: f64, x: f64) -> (f64, f64) {
        let exp_term = (m * t.abs()).exp();
        let wobble = (self.frequency * t).sin();
        let xp = t * cos_theta - exp_term * wobble * sin_theta + x;
        let yp = self.y_offset + t * sin_theta + exp_term * wobble * cos_theta;
        (xp, yp)
    }

    pub fn parameter_bounds(&self) -> ParameterBounds {
        PARAMETER_BOUNDS
    }

    /// `true` iff all three values lie inside their closed bound intervals.
    pub fn validate_parameters(&self, theta_deg: f64, m: f64, x: f64) -> bool {
        self.parameter_bounds()
            .contains(&Params::new(theta_deg, m, x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn predict_is_deterministic() {
        let model = ParametricModel::default();
        let t: Vec<f64> = (0..40).map(|i| 6.0 + i as f64 * 1.3).collect();
        let a = model.predict(&t, 27.5, 0.013, 55.0);
        let b = model.predict(&t, 27.5, 0.013, 55.0);
        for (u, v) in a.0.iter().zip(b.0.iter()).chain(a.1.iter().zip(b.1.iter())) {
            assert_eq!(u.to_bits(), v.to_bits());
        }
    }

    #[test]
    fn zero_growth_matches_closed_form() {
        let model = ParametricModel::default();
        let theta = 20.0_f64;
        let t = [6.0, 13.5, 31.0, 60.0, -4.0];
        let (xp, yp) = model.predict(&t, theta, 0.0, 30.0);

        let th = theta.to_radians();
        for (i, &ti) in t.iter().enumerate() {
            let w = (0.3 * ti).sin();
            assert_abs_diff_eq!(xp[i], ti * th.cos() - w * th.sin() + 30.0, epsilon = 1e-12);
            assert_abs_diff_eq!(yp[i], 42.0 + ti * th.sin() + w * th.cos(), epsilon = 1e-12);
        }
    }

    #[test]
    fn output_lengths_follow_input() {
        let model = ParametricModel::default();
        let (xp, yp) = model.predict(&[10.0], 0.0, 0.0, 0.0);
        assert_eq!(xp.len(), 1);
        assert_eq!(yp.len(), 1);
    }

    #[test]
    fn growth_uses_absolute_t() {
        let model = ParametricModel::default();
        // At θ = 0 the wobble only moves y, scaled by exp(M|t|).
        let (_, pos) = model.predict(&[5.0], 0.0, 0.04, 0.0);
        let (_, neg) = model.predict(&[-5.0], 0.0, 0.04, 0.0);
        let envelope = (0.04_f64 * 5.0).exp();
        assert_abs_diff_eq!(pos[0] - 42.0, envelope * 1.5_f64.sin(), epsilon = 1e-12);
        assert_abs_diff_eq!(neg[0] - 42.0, -envelope * 1.5_f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn extreme_growth_overflows_without_panicking() {
        let model = ParametricModel::default();
        let (xp, yp) = model.predict(&[60.0], 10.0, 1e3, 0.0);
        assert!(!xp[0].is_finite());
        assert!(!yp[0].is_finite());
    }

    #[test]
    fn bounds_are_fixed_constants() {
        let b = ParametricModel::default().parameter_bounds();
        assert_eq!((b.theta_deg.lo, b.theta_deg.hi), (0.0, 50.0));
        assert_eq!((b.m.lo, b.m.hi), (-0.05, 0.05));
        assert_eq!((b.x.lo, b.x.hi), (0.0, 100.0));
    }

    #[test]
    fn validation_is_inclusive() {
        let model = ParametricModel::default();
        assert!(model.validate_parameters(0.0, -0.05, 0.0));
        assert!(model.validate_parameters(50.0, 0.05, 100.0));
        assert!(model.validate_parameters(30.0, 0.01, 50.0));
        assert!(!model.validate_parameters(50.1, 0.0, 50.0));
        assert!(!model.validate_parameters(10.0, 0.051, 50.0));
        assert!(!model.validate_parameters(10.0, 0.0, -1e-9));
    }
}
