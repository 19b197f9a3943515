//! `spiral-fit` library crate.
//!
//! The binary (`spiral-fit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the model, loss and optimizer are reusable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod models;
pub mod plot;
pub mod report;
