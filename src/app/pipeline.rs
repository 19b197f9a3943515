//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> t grid -> model/loss/optimizer -> result + history
//!
//! Front-ends (the CLI, tests) then only decide what to print or write.

use log::info;

use crate::domain::{DatasetStats, FitConfig, FitResult, Observations, OptimizationStep, Params};
use crate::error::AppError;
use crate::fit::grid::{curve_grid, lin_space};
use crate::fit::{ClosestPointL1Loss, OptimizeOptions, Optimizer};
use crate::io::ingest::{compute_stats, load_observations};
use crate::models::ParametricModel;
use crate::report::{format_report, format_summary, latex_string};

/// All computed outputs of a single fit run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub observations: Observations,
    pub stats: DatasetStats,
    pub t_grid: Vec<f64>,
    pub result: FitResult,
    pub history: Vec<OptimizationStep>,
}

/// Final parameters in reporting form.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub params: Params,
    pub loss: f64,
    pub latex: String,
}

/// Orchestrates one configured fit and keeps its outputs for reporting.
#[derive(Debug)]
pub struct CurveFitter {
    config: FitConfig,
    model: ParametricModel,
    optimizer: Optimizer,
    output: Option<RunOutput>,
}

impl CurveFitter {
    pub fn new(config: FitConfig) -> Result<Self, AppError> {
        config.validate()?;
        let model = ParametricModel::new(config.y_offset, config.frequency);
        let optimizer = Optimizer::new(ClosestPointL1Loss::new(model), config.seed)
            .with_workers(config.workers)
            .with_refine_ftol(config.refine_ftol);
        Ok(Self {
            config,
            model,
            optimizer,
            output: None,
        })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn model(&self) -> &ParametricModel {
        &self.model
    }

    /// Load the configured CSV and fit it.
    pub fn run(&mut self) -> Result<FitResult, AppError> {
        let observations = load_observations(&self.config.csv_path)?;
        self.run_with(observations)
    }

    /// Fit already loaded observations.
    pub fn run_with(&mut self, observations: Observations) -> Result<FitResult, AppError> {
        let cfg = &self.config;
        let stats = compute_stats(&observations, cfg.t_min, cfg.t_max)
            .ok_or_else(|| AppError::data("No observations to fit."))?;
        info!(
            "Data: {} points | x=[{:.2}, {:.2}] | y=[{:.2}, {:.2}]",
            stats.n_points, stats.x_range.0, stats.x_range.1, stats.y_range.0, stats.y_range.1
        );

        let t_grid = curve_grid(cfg.t_min, cfg.t_max, observations.len(), cfg.grid_factor)?;
        info!("Curve grid: {} samples over t=[{}, {}]", t_grid.len(), cfg.t_min, cfg.t_max);

        let options = OptimizeOptions {
            use_refinement: cfg.use_refinement,
            de_maxiter: cfg.de_maxiter,
            de_popsize: cfg.de_popsize,
            de_tol: cfg.de_tol,
        };
        let result = self
            .optimizer
            .optimize(&t_grid, &observations.x, &observations.y, &options)?;

        self.output = Some(RunOutput {
            observations,
            stats,
            t_grid,
            result,
            history: self.optimizer.history(),
        });
        Ok(result)
    }

    /// Outputs of the most recent run.
    pub fn output(&self) -> Result<&RunOutput, AppError> {
        self.output
            .as_ref()
            .ok_or_else(|| AppError::usage("Optimization not yet run. Call run() first."))
    }

    /// Final parameters, loss and the LaTeX string.
    pub fn results(&self) -> Result<FitSummary, AppError> {
        let out = self.output()?;
        Ok(FitSummary {
            params: out.result.params,
            loss: out.result.loss,
            latex: latex_string(&out.result.params, self.config.precision, &self.model),
        })
    }

    /// The results-file text.
    pub fn report(&self) -> Result<String, AppError> {
        let out = self.output()?;
        Ok(format_report(&out.result, self.config.precision, &self.model))
    }

    /// Multi-section summary of data, history and final result.
    pub fn summary(&self) -> Result<String, AppError> {
        let out = self.output()?;
        Ok(format_summary(&out.stats, &out.history, &out.result, self.config.precision))
    }

    /// The fitted curve sampled at `samples` evenly spaced `t` values.
    pub fn fitted_curve(&self, samples: usize) -> Result<Vec<(f64, f64)>, AppError> {
        let out = self.output()?;
        let t = lin_space(self.config.t_min, self.config.t_max, samples)?;
        let (x, y) = self.model.predict_params(&t, &out.result.params);
        Ok(x.into_iter().zip(y).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_sample;
    use crate::error::ErrorKind;
    use crate::io::export::write_observations_csv;

    fn quick_config() -> FitConfig {
        FitConfig {
            de_maxiter: 200,
            de_popsize: 10,
            de_tol: 1e-6,
            ..FitConfig::default()
        }
    }

    #[test]
    fn end_to_end_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("xy.csv");
        let model = ParametricModel::default();
        let params = Params::new(20.0, 0.02, 30.0);
        let obs = generate_sample(&params, 50, 6.0, 60.0, 0.0, 1, &model).unwrap();
        write_observations_csv(&csv, &obs).unwrap();

        let mut fitter = CurveFitter::new(FitConfig {
            csv_path: csv,
            ..quick_config()
        })
        .unwrap();
        let result = fitter.run().unwrap();

        let out = fitter.output().unwrap();
        assert_eq!(out.stats.n_points, 50);
        assert_eq!(out.t_grid.len(), 50);
        assert_eq!(out.history.len(), 2);
        assert!(result.loss < 0.5, "loss={}", result.loss);

        let summary = fitter.results().unwrap();
        assert_eq!(summary.params, result.params);
        assert!(summary.latex.starts_with("(t*cos("));

        assert!(fitter.summary().unwrap().contains("OPTIMIZATION SUMMARY"));
        assert!(fitter.report().unwrap().starts_with("— Optimization Complete —"));
        assert_eq!(fitter.fitted_curve(11).unwrap().len(), 11);
    }

    #[test]
    fn grid_factor_scales_curve_grid() {
        let model = ParametricModel::default();
        let params = Params::new(10.0, 0.0, 50.0);
        let obs = generate_sample(&params, 12, 6.0, 60.0, 0.0, 1, &model).unwrap();
        let mut fitter = CurveFitter::new(FitConfig {
            grid_factor: 4,
            use_refinement: false,
            de_maxiter: 5,
            ..quick_config()
        })
        .unwrap();
        fitter.run_with(obs).unwrap();
        assert_eq!(fitter.output().unwrap().t_grid.len(), 48);
        assert_eq!(fitter.output().unwrap().history.len(), 1);
    }

    #[test]
    fn results_before_run_are_a_usage_error() {
        let fitter = CurveFitter::new(quick_config()).unwrap();
        assert_eq!(fitter.results().unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(fitter.summary().unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn missing_csv_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut fitter = CurveFitter::new(FitConfig {
            csv_path: dir.path().join("nope.csv"),
            ..quick_config()
        })
        .unwrap();
        assert_eq!(fitter.run().unwrap_err().kind(), ErrorKind::Data);
        assert!(fitter.output().is_err());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let err = CurveFitter::new(FitConfig {
            t_min: 60.0,
            t_max: 6.0,
            ..FitConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
