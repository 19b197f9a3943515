//! Formatted terminal and file output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (pinned by the golden tests below)
//!
//! Every function here is pure and returns a `String`; writing is done by
//! `io::export`.

use crate::domain::{DatasetStats, FitResult, OptimizationStep, Params};
use crate::models::ParametricModel;

const RULE_WIDTH: usize = 60;

/// The results report: fitted parameters, final loss and the LaTeX string.
pub fn format_report(result: &FitResult, precision: usize, model: &ParametricModel) -> String {
    let p = &result.params;
    let latex = latex_string(p, precision, model);
    format!(
        "— Optimization Complete —\n\
         \n\
         θ = {theta:.precision$} degrees\n\
         \n\
         M = {m:.precision$}\n\
         \n\
         X = {x:.precision$}\n\
         \n\
         Final L1 Loss = {loss:.precision$}\n\
         \n\
         LaTeX submission:\n\
         \n\
         {latex}\n",
        theta = p.theta_deg,
        m = p.m,
        x = p.x,
        loss = result.loss,
    )
}

/// The fitted curve as a `(x(t), y(t))` pair in submission notation.
///
/// θ is written in degrees, exactly as reported.
pub fn latex_string(params: &Params, precision: usize, model: &ParametricModel) -> String {
    let theta = format!("{:.precision$}", params.theta_deg);
    let m = format!("{:.precision$}", params.m);
    let x = format!("{:.precision$}", params.x);
    let freq = model.frequency;
    let y0 = model.y_offset;
    format!(
        "(t*cos({theta}) - e^{{{m}*|t|}}*sin({freq}t)*sin({theta}) + {x}, \
         {y0} + t*sin({theta}) + e^{{{m}*|t|}}*sin({freq}t)*cos({theta}))"
    )
}

/// Multi-section run summary: data, per-step history and final results.
pub fn format_summary(
    stats: &DatasetStats,
    history: &[OptimizationStep],
    result: &FitResult,
    precision: usize,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "OPTIMIZATION SUMMARY".to_string(),
        rule.clone(),
        String::new(),
        "Data Summary:".to_string(),
        format!("  Number of points: {}", stats.n_points),
        format!("  X range: [{:.2}, {:.2}]", stats.x_range.0, stats.x_range.1),
        format!("  Y range: [{:.2}, {:.2}]", stats.y_range.0, stats.y_range.1),
        format!("  t range: [{}, {}]", stats.t_range.0, stats.t_range.1),
        String::new(),
        "Optimization Steps:".to_string(),
    ];

    for (i, step) in history.iter().enumerate() {
        let p = &step.params;
        lines.push(format!(
            "  Step {} ({}): θ={:.precision$}°, M={:.precision$}, X={:.precision$}, \
             Loss={:.precision$}",
            i + 1,
            step.method,
            p.theta_deg,
            p.m,
            p.x,
            step.loss,
        ));
    }

    let p = &result.params;
    lines.extend([
        String::new(),
        "Final Results:".to_string(),
        format!("  θ = {:.precision$} degrees", p.theta_deg),
        format!("  M = {:.precision$}", p.m),
        format!("  X = {:.precision$}", p.x),
        format!("  Final L1 Loss = {:.precision$}", result.loss),
        String::new(),
        rule,
    ]);

    lines.join("\n")
}

/// Console framing around the report.
pub fn framed(report: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("\n{rule}\n{report}\n{rule}")
}
