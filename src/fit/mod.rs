//! Curve fitting.
//!
//! Responsibilities:
//!
//! - sample the curve-parameter grid (`grid`)
//! - score candidate parameters with the closest-point L1 loss (`loss`)
//! - global search by differential evolution (`de`)
//! - bounded quasi-Newton refinement (`lbfgsb`)
//! - two-phase orchestration with an append-only history (`optimizer`)

pub mod de;
pub mod grid;
pub mod lbfgsb;
pub mod loss;
pub mod optimizer;

pub use grid::*;
pub use loss::*;
pub use optimizer::*;
