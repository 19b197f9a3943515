//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - curve parameters and their bounds (`Params`, `ParameterBounds`)
//! - observations and their summary (`Observations`, `DatasetStats`)
//! - optimizer outputs (`FitResult`, `OptimizationStep`, `FitFile`)
//! - the run configuration (`FitConfig`)

pub mod types;

pub use types::*;
