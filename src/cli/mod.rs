//! Command-line parsing for the spiral curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "spiral-fit",
    version,
    about = "Fit θ, M and X of a rotated, modulated spiral to observed (x, y) points"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub log: LogArgs,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the curve to a CSV of observations and write results and plots.
    Fit(FitArgs),
    /// Write a synthetic observation CSV from known parameters.
    Synth(SynthArgs),
    /// Plot a previously exported fit JSON in the terminal.
    Plot(PlotArgs),
}

/// Logging verbosity, accepted before or after the subcommand.
#[derive(Debug, Args, Clone, Copy)]
pub struct LogArgs {
    /// Log progress (data load, phase results) to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log per-iteration optimizer detail to stderr.
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Options for fitting.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Observation CSV with `x` and `y` columns.
    #[arg(short, long, default_value = "xy_data.csv")]
    pub input: PathBuf,

    /// Lower end of the curve parameter range.
    #[arg(long, default_value_t = 6.0, allow_negative_numbers = true)]
    pub t_min: f64,

    /// Upper end of the curve parameter range.
    #[arg(long, default_value_t = 60.0, allow_negative_numbers = true)]
    pub t_max: f64,

    /// Curve samples per observation.
    #[arg(long, default_value_t = 1)]
    pub grid_factor: usize,

    /// Constant vertical offset of the curve.
    #[arg(long, default_value_t = 42.0, allow_negative_numbers = true)]
    pub y_offset: f64,

    /// Angular frequency of the modulation term.
    #[arg(long, default_value_t = 0.3, allow_negative_numbers = true)]
    pub frequency: f64,

    /// Random seed for the global search.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Skip the bounded quasi-Newton refinement.
    #[arg(long)]
    pub no_refine: bool,

    /// Maximum global-search generations.
    #[arg(long, default_value_t = 2000)]
    pub maxiter: usize,

    /// Population size multiplier (population = max(5, popsize * 3)).
    #[arg(long, default_value_t = 17)]
    pub popsize: usize,

    /// Global-search convergence tolerance.
    #[arg(long, default_value_t = 1e-6)]
    pub tol: f64,

    /// Relative function tolerance of the refinement.
    #[arg(long, default_value_t = 1e-6)]
    pub refine_ftol: f64,

    /// Threads evaluating each global-search generation.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Results text file.
    #[arg(long, default_value = "results.txt")]
    pub results: PathBuf,

    /// Fit plot (SVG).
    #[arg(long, default_value = "fit_plot.svg")]
    pub plot_fit: PathBuf,

    /// Optimization history plot (SVG).
    #[arg(long, default_value = "optimization_history.svg")]
    pub plot_history: PathBuf,

    /// Decimal places in the report.
    #[arg(long, default_value_t = 6)]
    pub precision: usize,

    /// Export the fit (params, history, fitted grid) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,

    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub ascii: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output CSV.
    #[arg(short, long, default_value = "xy_data.csv")]
    pub output: PathBuf,

    /// Rotation angle in degrees.
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    pub theta: f64,

    /// Exponential growth rate.
    #[arg(long, default_value_t = 0.02, allow_negative_numbers = true)]
    pub m: f64,

    /// Horizontal offset.
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    pub x: f64,

    /// Number of points.
    #[arg(short = 'n', long, default_value_t = 1500)]
    pub count: usize,

    #[arg(long, default_value_t = 6.0, allow_negative_numbers = true)]
    pub t_min: f64,

    #[arg(long, default_value_t = 60.0, allow_negative_numbers = true)]
    pub t_max: f64,

    /// Standard deviation of the Gaussian noise added to x and y.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 42.0, allow_negative_numbers = true)]
    pub y_offset: f64,

    #[arg(long, default_value_t = 0.3, allow_negative_numbers = true)]
    pub frequency: f64,
}

/// Options for plotting a saved fit.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Fit JSON file produced by `spiral-fit fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Overlay observations from this CSV.
    #[arg(long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults_match_reference_configuration() {
        let cli = Cli::parse_from(["spiral-fit", "fit"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.input, PathBuf::from("xy_data.csv"));
        assert_eq!(args.t_min, 6.0);
        assert_eq!(args.t_max, 60.0);
        assert_eq!(args.maxiter, 2000);
        assert_eq!(args.popsize, 17);
        assert_eq!(args.tol, 1e-6);
        assert!(!args.no_refine);
        assert!(!cli.log.verbose);
    }

    #[test]
    fn log_flags_are_global() {
        let cli = Cli::parse_from(["spiral-fit", "fit", "--verbose", "--no-refine"]);
        assert!(cli.log.verbose);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert!(args.no_refine);
    }

    #[test]
    fn synth_accepts_negative_growth_rate() {
        let cli = Cli::parse_from(["spiral-fit", "synth", "--m", "-0.03", "-n", "10"]);
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.m, -0.03);
        assert_eq!(args.count, 10);
    }
}
