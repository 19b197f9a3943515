//! Two-phase parameter search.
//!
//! 1. global search: differential evolution over the model's bound box
//! 2. optional local refinement: bounded quasi-Newton started from the global
//!    candidate
//!
//! Each completed phase appends one `OptimizationStep` to the optimizer's
//! history. The history is append-only and survives across `optimize` calls.
//!
//! The refined result is always reported as final, even when its loss is
//! higher than the global candidate's.

use log::info;
use nalgebra::Vector3;

use crate::domain::{FitMethod, FitResult, OptimizationStep, Params};
use crate::error::AppError;
use crate::fit::de::{DeSettings, differential_evolution};
use crate::fit::lbfgsb::{LbfgsbSettings, minimize_bounded};
use crate::fit::loss::ClosestPointL1Loss;

/// Per-call options of [`Optimizer::optimize`].
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub use_refinement: bool,
    pub de_maxiter: usize,
    pub de_popsize: usize,
    /// Used as both the absolute and the relative convergence tolerance.
    pub de_tol: f64,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            use_refinement: true,
            de_maxiter: 2000,
            de_popsize: 17,
            de_tol: 1e-6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Optimizer {
    loss: ClosestPointL1Loss,
    seed: u64,
    workers: usize,
    refine_ftol: f64,
    history: Vec<OptimizationStep>,
}

impl Optimizer {
    pub fn new(loss: ClosestPointL1Loss, seed: u64) -> Self {
        Self {
            loss,
            seed,
            workers: 1,
            refine_ftol: LbfgsbSettings::default().ftol,
            history: Vec::new(),
        }
    }

    /// Evaluate each global-search generation on `workers` threads.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_refine_ftol(mut self, ftol: f64) -> Self {
        self.refine_ftol = ftol;
        self
    }

    /// Run the global phase and, if enabled, the refinement phase.
    pub fn optimize(
        &mut self,
        t_grid: &[f64],
        x_obs: &[f64],
        y_obs: &[f64],
        options: &OptimizeOptions,
    ) -> Result<FitResult, AppError> {
        let bounds = self.loss.model().parameter_bounds();
        let boxes = bounds.as_array();
        let loss = self.loss;
        let objective =
            move |v: &Vector3<f64>| loss.compute(&Params::from_vector(v), t_grid, x_obs, y_obs);

        info!(
            "Starting global search: θ ∈ [{}, {}]°, M ∈ [{}, {}], X ∈ [{}, {}]",
            bounds.theta_deg.lo,
            bounds.theta_deg.hi,
            bounds.m.lo,
            bounds.m.hi,
            bounds.x.lo,
            bounds.x.hi
        );

        let de_settings = DeSettings {
            seed: self.seed,
            maxiter: options.de_maxiter,
            popsize: options.de_popsize,
            tol: options.de_tol,
            atol: options.de_tol,
            workers: self.workers,
            ..DeSettings::default()
        };
        let global = differential_evolution(objective, &boxes, &de_settings)?;
        let mut result = self.record(FitMethod::GlobalSearch, &global.x, global.fun);
        info!(
            "Global search done after {} generations ({} evaluations, converged={})",
            global.generations, global.evaluations, global.converged
        );
        log_result("Global", &result);

        if options.use_refinement {
            info!("Refining with bounded quasi-Newton (ftol={:e})", self.refine_ftol);
            let settings = LbfgsbSettings {
                ftol: self.refine_ftol,
                ..LbfgsbSettings::default()
            };
            let local = minimize_bounded(objective, global.x, &boxes, &settings)?;
            result = self.record(FitMethod::LocalRefinement, &local.x, local.fun);
            info!(
                "Refinement stopped ({:?}) after {} iterations ({} evaluations)",
                local.stop, local.iterations, local.evaluations
            );
            log_result("Refined", &result);
        }

        Ok(result)
    }

    /// Snapshot of the history; later runs do not affect it and vice versa.
    pub fn history(&self) -> Vec<OptimizationStep> {
        self.history.clone()
    }

    /// Result of the most recent phase.
    pub fn last_result(&self) -> Result<FitResult, AppError> {
        self.history
            .last()
            .map(|step| FitResult {
                params: step.params,
                loss: step.loss,
            })
            .ok_or_else(|| AppError::usage("Optimization not yet run. Call optimize() first."))
    }

    fn record(&mut self, method: FitMethod, x: &Vector3<f64>, loss: f64) -> FitResult {
        let params = Params::from_vector(x);
        self.history.push(OptimizationStep { method, params, loss });
        FitResult { params, loss }
    }
}

fn log_result(label: &str, result: &FitResult) {
    let p = &result.params;
    info!(
        "{label} parameters: θ = {:.6}°, M = {:.6}, X = {:.6}; L1 loss = {:.6}",
        p.theta_deg, p.m, p.x, result.loss
    );
}
