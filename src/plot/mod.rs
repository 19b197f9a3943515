//! Plot output: SVG files and terminal ASCII.

pub mod ascii;
pub mod svg;

pub use ascii::{render_ascii_plot, render_ascii_plot_from_fit_file};
pub use svg::{plot_fit, plot_history};
