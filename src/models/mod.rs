//! The parametric curve model.
//!
//! The model is a small, pure value type so that the loss and search code can
//! evaluate it freely (including from several threads).

pub mod model;

pub use model::*;
