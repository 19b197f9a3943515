//! Curve-parameter grids.
//!
//! The predicted curve is sampled on a linear `t` grid over `[t_min, t_max]`.
//! Its density is independent of the observation count: the pipeline uses
//! `G = N * grid_factor` samples, where `grid_factor = 1` reproduces the
//! one-sample-per-observation setup.

use crate::error::AppError;

/// Generate `steps` linearly spaced points between `min` and `max` (inclusive).
///
/// A single step yields `[min]`.
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max >= min) {
        return Err(AppError::config(format!(
            "Invalid t range: min={min}, max={max} (must be finite and max>=min)."
        )));
    }
    if steps == 0 {
        return Err(AppError::config("Grid steps must be >= 1."));
    }
    if steps == 1 {
        return Ok(vec![min]);
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out = Vec::with_capacity(steps);
    for i in 0..steps - 1 {
        out.push(min + step * i as f64);
    }
    // Pin the last point so the grid ends exactly at `max`.
    out.push(max);
    Ok(out)
}

/// Curve-sampling grid for `n_obs` observations.
pub fn curve_grid(
    t_min: f64,
    t_max: f64,
    n_obs: usize,
    grid_factor: usize,
) -> Result<Vec<f64>, AppError> {
    let steps = n_obs
        .checked_mul(grid_factor)
        .ok_or_else(|| AppError::config("Grid size overflows usize."))?;
    lin_space(t_min, t_max, steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_space_includes_endpoints() {
        let v = lin_space(6.0, 60.0, 5).unwrap();
        assert_eq!(v.len(), 5);
        assert_eq!(v[0], 6.0);
        assert_eq!(v[4], 60.0);
        assert!((v[1] - 19.5).abs() < 1e-12);
    }

    #[test]
    fn single_step_is_the_lower_end() {
        assert_eq!(lin_space(6.0, 60.0, 1).unwrap(), vec![6.0]);
    }

    #[test]
    fn curve_grid_scales_with_factor() {
        assert_eq!(curve_grid(6.0, 60.0, 10, 1).unwrap().len(), 10);
        assert_eq!(curve_grid(6.0, 60.0, 10, 4).unwrap().len(), 40);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(lin_space(60.0, 6.0, 10).is_err());
        assert!(lin_space(f64::NAN, 6.0, 10).is_err());
        assert!(lin_space(6.0, 60.0, 0).is_err());
    }
}
