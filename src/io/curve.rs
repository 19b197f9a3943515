//! Read/write fit JSON files.
//!
//! A fit JSON is the "portable" representation of a finished run:
//! - model constants and final parameters
//! - the full optimization history
//! - a precomputed fitted grid for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveGrid, FitFile, FitResult, OptimizationStep};
use crate::error::AppError;
use crate::fit::grid::lin_space;
use crate::models::ParametricModel;

/// Samples in the exported curve grid.
const GRID_POINTS: usize = 201;

/// Assemble the JSON document for a finished fit.
pub fn build_fit_file(
    model: &ParametricModel,
    result: &FitResult,
    history: &[OptimizationStep],
    t_min: f64,
    t_max: f64,
) -> Result<FitFile, AppError> {
    let grid = build_grid(model, result, t_min, t_max)?;
    Ok(FitFile {
        tool: "spiral-fit".to_string(),
        generated_at: Utc::now(),
        y_offset: model.y_offset,
        frequency: model.frequency,
        t_min,
        t_max,
        result: *result,
        history: history.to_vec(),
        grid,
    })
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, fit)
        .map_err(|e| AppError::io(format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::data(format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile = serde_json::from_reader(file)
        .map_err(|e| AppError::data(format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}

fn build_grid(
    model: &ParametricModel,
    result: &FitResult,
    t_min: f64,
    t_max: f64,
) -> Result<CurveGrid, AppError> {
    let t = lin_space(t_min, t_max, GRID_POINTS)?;
    let (x, y) = model.predict_params(&t, &result.params);
    Ok(CurveGrid { t, x, y })
}
