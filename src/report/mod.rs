//! Reporting: results text, LaTeX string and run summary.

pub mod format;

pub use format::*;
