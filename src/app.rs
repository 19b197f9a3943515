//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initializes logging
//! - runs the fit pipeline
//! - prints the report and summary
//! - writes the results file, plots and optional exports

use clap::Parser;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use crate::cli::{Cli, Command, FitArgs, LogArgs, PlotArgs, SynthArgs};
use crate::domain::{FitConfig, Params};
use crate::error::AppError;
use crate::models::ParametricModel;

pub mod pipeline;

/// Curve samples used for the fit plot.
const PLOT_SAMPLES: usize = 1000;

/// Entry point for the `spiral-fit` binary.
pub fn run() -> Result<(), AppError> {
    // We want `spiral-fit` and `spiral-fit --input data.csv` to behave like
    // `spiral-fit fit ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_logging(cli.log);

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Synth(args) => handle_synth(&args),
        Command::Plot(args) => handle_plot(&args),
    }
}

fn init_logging(args: LogArgs) {
    let level = if args.debug {
        LevelFilter::Debug
    } else if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    // A logger may already be installed (e.g. when embedded); keep that one.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args);
    let mut fitter = pipeline::CurveFitter::new(config)?;
    fitter.run()?;

    let config = fitter.config();
    let out = fitter.output()?;

    let report = fitter.report()?;
    println!("{}", crate::report::framed(&report));
    crate::io::export::write_report(&config.results_path, &report)?;
    println!("\n✓ Results saved to {}", config.results_path.display());

    let curve = fitter.fitted_curve(PLOT_SAMPLES)?;
    crate::plot::plot_fit(&config.fit_plot_path, &out.observations, &curve, &out.result)?;
    info!("Fit plot saved to {}", config.fit_plot_path.display());
    crate::plot::plot_history(&config.history_plot_path, &out.history)?;
    info!("History plot saved to {}", config.history_plot_path.display());

    if let Some(path) = &config.export_fit {
        let fit = crate::io::curve::build_fit_file(
            fitter.model(),
            &out.result,
            &out.history,
            config.t_min,
            config.t_max,
        )?;
        crate::io::curve::write_fit_json(path, &fit)?;
        info!("Fit JSON saved to {}", path.display());
    }

    if config.ascii_plot {
        let plot = crate::plot::render_ascii_plot(
            &out.observations,
            &curve,
            config.plot_width,
            config.plot_height,
        );
        println!("\n{plot}");
    }

    println!("\n{}", fitter.summary()?);
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let model = ParametricModel::new(args.y_offset, args.frequency);
    let params = Params::new(args.theta, args.m, args.x);
    if !model.validate_parameters(params.theta_deg, params.m, params.x) {
        log::warn!(
            "Parameters θ={}, M={}, X={} lie outside the search bounds; \
             a fit cannot recover them.",
            params.theta_deg,
            params.m,
            params.x
        );
    }

    let obs = crate::data::generate_sample(
        &params,
        args.count,
        args.t_min,
        args.t_max,
        args.noise,
        args.seed,
        &model,
    )?;
    crate::io::export::write_observations_csv(&args.output, &obs)?;
    println!("Wrote {} points to {}", obs.len(), args.output.display());
    Ok(())
}

fn handle_plot(args: &PlotArgs) -> Result<(), AppError> {
    let fit = crate::io::curve::read_fit_json(&args.fit)?;
    let obs = args
        .input
        .as_deref()
        .map(crate::io::ingest::load_observations)
        .transpose()?;

    let plot = crate::plot::render_ascii_plot_from_fit_file(
        &fit,
        obs.as_ref(),
        args.width,
        args.height,
    );
    println!("{plot}");

    let p = &fit.result.params;
    println!(
        "θ = {:.6}°, M = {:.6}, X = {:.6}, L1 loss = {:.6} (generated {})",
        p.theta_deg,
        p.m,
        p.x,
        fit.result.loss,
        fit.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        csv_path: args.input.clone(),
        t_min: args.t_min,
        t_max: args.t_max,
        grid_factor: args.grid_factor,
        y_offset: args.y_offset,
        frequency: args.frequency,
        seed: args.seed,
        use_refinement: !args.no_refine,
        de_maxiter: args.maxiter,
        de_popsize: args.popsize,
        de_tol: args.tol,
        workers: args.workers,
        refine_ftol: args.refine_ftol,
        results_path: args.results.clone(),
        fit_plot_path: args.plot_fit.clone(),
        history_plot_path: args.plot_history.clone(),
        export_fit: args.export_fit.clone(),
        precision: args.precision,
        ascii_plot: args.ascii,
        plot_width: args.width,
        plot_height: args.height,
    }
}

/// Rewrite argv so `spiral-fit` defaults to `spiral-fit fit`.
///
/// Rules:
/// - `spiral-fit`                      -> `spiral-fit fit`
/// - `spiral-fit --input a.csv ...`    -> `spiral-fit fit --input a.csv ...`
/// - `spiral-fit --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "synth" | "plot");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_fit() {
        assert_eq!(rewrite_args(argv(&["spiral-fit"])), argv(&["spiral-fit", "fit"]));
    }

    #[test]
    fn leading_flags_are_fit_flags() {
        assert_eq!(
            rewrite_args(argv(&["spiral-fit", "--input", "a.csv"])),
            argv(&["spiral-fit", "fit", "--input", "a.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for args in [
            &["spiral-fit", "synth", "-n", "5"][..],
            &["spiral-fit", "plot", "--fit", "f.json"][..],
            &["spiral-fit", "--help"][..],
            &["spiral-fit", "-V"][..],
        ] {
            assert_eq!(rewrite_args(argv(args)), argv(args));
        }
    }

    #[test]
    fn cli_defaults_map_to_default_config() {
        let cli = Cli::parse_from(rewrite_args(argv(&["spiral-fit"])));
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args);
        let default = FitConfig::default();
        assert_eq!(config.csv_path, default.csv_path);
        assert_eq!(config.t_min, default.t_min);
        assert_eq!(config.t_max, default.t_max);
        assert_eq!(config.grid_factor, default.grid_factor);
        assert_eq!(config.seed, default.seed);
        assert_eq!(config.use_refinement, default.use_refinement);
        assert_eq!(config.de_maxiter, default.de_maxiter);
        assert_eq!(config.de_popsize, default.de_popsize);
        assert_eq!(config.de_tol, default.de_tol);
        assert_eq!(config.results_path, default.results_path);
        assert_eq!(config.fit_plot_path, default.fit_plot_path);
        assert_eq!(config.history_plot_path, default.history_plot_path);
        assert_eq!(config.precision, default.precision);
        assert_eq!(config.export_fit, None);
    }

    #[test]
    fn no_refine_disables_refinement() {
        let cli = Cli::parse_from(argv(&["spiral-fit", "fit", "--no-refine", "--workers", "4"]));
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args);
        assert!(!config.use_refinement);
        assert_eq!(config.workers, 4);
    }
}
