//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during optimization
//! - exported to JSON
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Curve parameters `(θ, M, X)`.
///
/// `theta_deg` is in degrees. The optimizers work on `Vector3<f64>` in the
/// same order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub theta_deg: f64,
    pub m: f64,
    pub x: f64,
}

impl Params {
    pub fn new(theta_deg: f64, m: f64, x: f64) -> Self {
        Self { theta_deg, m, x }
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.theta_deg, self.m, self.x)
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Closed interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, v: f64) -> bool {
        self.lo <= v && v <= self.hi
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }
}

/// Search box for `(θ, M, X)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    pub theta_deg: Interval,
    pub m: Interval,
    pub x: Interval,
}

impl ParameterBounds {
    /// Bounds in optimizer order `[θ, M, X]`.
    pub fn as_array(&self) -> [Interval; 3] {
        [self.theta_deg, self.m, self.x]
    }

    pub fn contains(&self, p: &Params) -> bool {
        self.theta_deg.contains(p.theta_deg) && self.m.contains(p.m) && self.x.contains(p.x)
    }
}

/// Which optimization phase produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMethod {
    GlobalSearch,
    LocalRefinement,
}

impl FitMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            FitMethod::GlobalSearch => "global-search",
            FitMethod::LocalRefinement => "local-refinement",
        }
    }
}

impl std::fmt::Display for FitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed optimization phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStep {
    pub method: FitMethod,
    pub params: Params,
    pub loss: f64,
}

/// Terminal output of the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: Params,
    pub loss: f64,
}

/// Observed points, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Observations {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

/// Summary stats about the loaded observations.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_points: usize,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub x_mean: f64,
    pub y_mean: f64,
    pub t_range: (f64, f64),
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub t_min: f64,
    pub t_max: f64,
    /// Curve samples per observation (`G = N * grid_factor`).
    pub grid_factor: usize,
    pub y_offset: f64,
    pub frequency: f64,
    pub seed: u64,

    pub use_refinement: bool,
    pub de_maxiter: usize,
    pub de_popsize: usize,
    pub de_tol: f64,
    /// Threads used to evaluate each DE generation (1 = in-line).
    pub workers: usize,
    /// Relative function tolerance of the refinement phase.
    pub refine_ftol: f64,

    pub results_path: PathBuf,
    pub fit_plot_path: PathBuf,
    pub history_plot_path: PathBuf,
    pub export_fit: Option<PathBuf>,
    pub precision: usize,

    pub ascii_plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("xy_data.csv"),
            t_min: 6.0,
            t_max: 60.0,
            grid_factor: 1,
            y_offset: 42.0,
            frequency: 0.3,
            seed: 42,
            use_refinement: true,
            de_maxiter: 2000,
            de_popsize: 17,
            de_tol: 1e-6,
            workers: 1,
            refine_ftol: 1e-6,
            results_path: PathBuf::from("results.txt"),
            fit_plot_path: PathBuf::from("fit_plot.svg"),
            history_plot_path: PathBuf::from("optimization_history.svg"),
            export_fit: None,
            precision: 6,
            ascii_plot: false,
            plot_width: 100,
            plot_height: 25,
        }
    }
}

impl FitConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if !(self.t_min.is_finite() && self.t_max.is_finite() && self.t_max > self.t_min) {
            return Err(AppError::config(format!(
                "Invalid t range: t_min={}, t_max={} (must be finite and t_max > t_min).",
                self.t_min, self.t_max
            )));
        }
        if self.grid_factor == 0 {
            return Err(AppError::config("Grid factor must be >= 1."));
        }
        if !(self.y_offset.is_finite() && self.frequency.is_finite()) {
            return Err(AppError::config("Model constants must be finite."));
        }
        if self.de_popsize == 0 {
            return Err(AppError::config("Population size factor must be >= 1."));
        }
        if !(self.de_tol.is_finite() && self.de_tol >= 0.0) {
            return Err(AppError::config("Global search tolerance must be finite and >= 0."));
        }
        if !(self.refine_ftol.is_finite() && self.refine_ftol >= 0.0) {
            return Err(AppError::config("Refinement tolerance must be finite and >= 0."));
        }
        if self.workers == 0 {
            return Err(AppError::config("Workers must be >= 1."));
        }
        Ok(())
    }
}

/// A saved fit file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub y_offset: f64,
    pub frequency: f64,
    pub t_min: f64,
    pub t_max: f64,
    pub result: FitResult,
    pub history: Vec<OptimizationStep>,
    pub grid: CurveGrid,
}

/// A sampled fitted curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_vector_order_is_theta_m_x() {
        let p = Params::new(20.0, 0.02, 30.0);
        let v = p.to_vector();
        assert_eq!(v[0], 20.0);
        assert_eq!(v[1], 0.02);
        assert_eq!(v[2], 30.0);
        assert_eq!(Params::from_vector(&v), p);
    }

    #[test]
    fn method_tags_serialize_kebab_case() {
        let json = serde_json::to_string(&FitMethod::GlobalSearch).unwrap();
        assert_eq!(json, "\"global-search\"");
        assert_eq!(FitMethod::LocalRefinement.to_string(), "local-refinement");
    }

    #[test]
    fn default_config_is_valid() {
        FitConfig::default().validate().unwrap();
    }

    #[test]
    fn inverted_t_range_is_rejected() {
        let config = FitConfig {
            t_min: 60.0,
            t_max: 6.0,
            ..FitConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
