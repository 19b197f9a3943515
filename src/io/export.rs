//! Flat-file writers for pre-formatted text and observation CSVs.
//!
//! Formatting lives in `report`; these functions only perform the write.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;

use crate::domain::Observations;
use crate::error::AppError;

/// Write an already formatted report to `path`.
pub fn write_report(path: &Path, report: &str) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create results file '{}': {e}", path.display()))
    })?;
    file.write_all(report.as_bytes()).map_err(|e| {
        AppError::io(format!("Failed to write results file '{}': {e}", path.display()))
    })?;
    info!("Results saved to {}", path.display());
    Ok(())
}

/// Write observations as an `x,y` CSV readable by `load_observations`.
pub fn write_observations_csv(path: &Path, obs: &Observations) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["x", "y"])
        .map_err(|e| AppError::io(format!("Failed to write CSV header: {e}")))?;
    for (x, y) in obs.points() {
        writer
            .write_record([format!("{x:.10}"), format!("{y:.10}")])
            .map_err(|e| AppError::io(format!("Failed to write CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush CSV '{}': {e}", path.display())))?;

    info!("Wrote {} points to {}", obs.len(), path.display());
    Ok(())
}
