//! SVG charts rendered with Plotters.
//!
//! - fit plot: observed points plus the fitted curve in the `x`/`y` plane
//! - history plot: loss per optimization step
//!
//! All series and bounds are computed before drawing so the draw functions
//! stay focused on layout.

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::domain::{FitResult, Observations, OptimizationStep};
use crate::error::AppError;

const FIT_SIZE: (u32, u32) = (1000, 800);
const HISTORY_SIZE: (u32, u32) = (800, 500);

/// Observed points vs fitted curve, titled with the final parameters.
pub fn plot_fit(
    path: &Path,
    obs: &Observations,
    curve: &[(f64, f64)],
    result: &FitResult,
) -> Result<(), AppError> {
    draw_fit(path, obs, curve, result).map_err(|e| {
        AppError::io(format!("Failed to render fit plot '{}': {e}", path.display()))
    })
}

/// Loss after each optimization step, labelled by method.
pub fn plot_history(path: &Path, history: &[OptimizationStep]) -> Result<(), AppError> {
    draw_history(path, history).map_err(|e| {
        AppError::io(format!("Failed to render history plot '{}': {e}", path.display()))
    })
}

fn draw_fit(
    path: &Path,
    obs: &Observations,
    curve: &[(f64, f64)],
    result: &FitResult,
) -> Result<(), Box<dyn Error>> {
    let curve: Vec<(f64, f64)> = curve
        .iter()
        .copied()
        .filter(|&(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let all: Vec<(f64, f64)> = obs.points().chain(curve.iter().copied()).collect();
    let (x0, x1) = padded_bounds(all.iter().map(|p| p.0));
    let (y0, y1) = padded_bounds(all.iter().map(|p| p.1));

    let root = SVGBackend::new(path, FIT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let p = &result.params;
    let caption = format!(
        "θ={:.3}°, M={:.5}, X={:.3} (L1 loss {:.4})",
        p.theta_deg, p.m, p.x, result.loss
    );
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart.configure_mesh().x_desc("x").y_desc("y").draw()?;

    let points_color = RGBColor(31, 119, 180);
    let curve_color = RGBColor(214, 39, 40);

    chart
        .draw_series(obs.points().map(|pt| Circle::new(pt, 2, points_color.mix(0.5).filled())))?
        .label("Observed data")
        .legend(move |(x, y)| Circle::new((x, y), 3, points_color.filled()));

    chart
        .draw_series(LineSeries::new(curve, curve_color.stroke_width(2)))?
        .label("Fitted curve")
        .legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], curve_color.stroke_width(2))
        });

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_history(path: &Path, history: &[OptimizationStep]) -> Result<(), Box<dyn Error>> {
    let losses: Vec<(f64, f64)> = history
        .iter()
        .enumerate()
        .filter(|(_, s)| s.loss.is_finite())
        .map(|(i, s)| ((i + 1) as f64, s.loss))
        .collect();
    let n = history.len().max(1) as f64;
    let (y0, y1) = padded_bounds(losses.iter().map(|p| p.1));

    let root = SVGBackend::new(path, HISTORY_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Optimization history", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.5..n + 0.5, y0..y1)?;

    let methods: Vec<&'static str> = history.iter().map(|s| s.method.as_str()).collect();
    chart
        .configure_mesh()
        .x_desc("Step")
        .y_desc("L1 loss")
        .x_labels(history.len().max(1))
        .x_label_formatter(&|v| step_label(*v, &methods))
        .draw()?;

    let line_color = RGBColor(44, 160, 44);
    chart.draw_series(LineSeries::new(losses.iter().copied(), line_color.stroke_width(2)))?;
    chart.draw_series(losses.iter().map(|&pt| Circle::new(pt, 5, line_color.filled())))?;

    root.present()?;
    Ok(())
}

/// Tick label for step positions; blank between integer steps.
fn step_label(v: f64, methods: &[&str]) -> String {
    let rounded = v.round();
    if (v - rounded).abs() > 1e-6 || rounded < 1.0 {
        return String::new();
    }
    let idx = rounded as usize;
    methods
        .get(idx - 1)
        .map(|m| format!("{idx}: {m}"))
        .unwrap_or_default()
}

/// Axis bounds over the finite values with 5% padding on each side.
fn padded_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { lo.abs().max(1.0) * 0.05 };
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitMethod, Params};
    use approx::assert_relative_eq;

    #[test]
    fn padded_bounds_handles_degenerate_input() {
        assert_eq!(padded_bounds(std::iter::empty()), (0.0, 1.0));
        let (lo, hi) = padded_bounds([2.0, 2.0].into_iter());
        assert!(lo < 2.0 && hi > 2.0);
        let (lo, hi) = padded_bounds([0.0, f64::NAN, 10.0].into_iter());
        assert_relative_eq!(lo, -0.5);
        assert_relative_eq!(hi, 10.5);
    }

    #[test]
    fn step_labels_only_on_integer_positions() {
        let methods = ["global-search", "local-refinement"];
        assert_eq!(step_label(1.0, &methods), "1: global-search");
        assert_eq!(step_label(2.0, &methods), "2: local-refinement");
        assert_eq!(step_label(1.5, &methods), "");
        assert_eq!(step_label(3.0, &methods), "");
        assert_eq!(step_label(0.5, &methods), "");
    }

    #[test]
    fn writes_svg_files() {
        let dir = tempfile::tempdir().unwrap();
        let obs = Observations {
            x: vec![1.0, 2.0, 3.0],
            y: vec![42.0, 43.0, 41.5],
        };
        let curve = vec![(1.0, 42.0), (2.0, 42.5), (3.0, 42.0)];
        let result = FitResult {
            params: Params::new(10.0, 0.0, 1.0),
            loss: 0.25,
        };
        let history = vec![
            OptimizationStep {
                method: FitMethod::GlobalSearch,
                params: result.params,
                loss: 0.3,
            },
            OptimizationStep {
                method: FitMethod::LocalRefinement,
                params: result.params,
                loss: 0.25,
            },
        ];

        let fit_path = dir.path().join("fit.svg");
        let hist_path = dir.path().join("history.svg");
        plot_fit(&fit_path, &obs, &curve, &result).unwrap();
        plot_history(&hist_path, &history).unwrap();

        let svg = std::fs::read_to_string(&fit_path).unwrap();
        assert!(svg.contains("<svg"));
        let svg = std::fs::read_to_string(&hist_path).unwrap();
        assert!(svg.contains("</svg>"));
    }
}
