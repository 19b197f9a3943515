//! Bounded quasi-Newton minimization (projected L-BFGS).
//!
//! Each iteration:
//!
//! 1. forward finite-difference gradient (stepping backwards at an upper bound)
//! 2. L-BFGS two-loop direction from the last `memory` curvature pairs
//! 3. components pushing against an active bound are dropped; if what is
//!    left is not a descent direction we fall back to the projected
//!    steepest descent
//! 4. backtracking Armijo search along the projected path `P(x + α·d)`
//!
//! Stopping rules:
//! - relative decrease `(f_k − f_{k+1}) / max(|f_k|, |f_{k+1}|, 1) <= ftol`
//! - max-norm of the projected gradient `<= gtol`
//! - `max_iter` iterations, or a line search that finds no decrease
//!
//! The objective is only required to be finite at the points visited. A
//! non-finite value anywhere aborts with a computation error.

use std::collections::VecDeque;

use log::debug;
use nalgebra::Vector3;

use crate::domain::Interval;
use crate::error::AppError;

const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;

#[derive(Debug, Clone)]
pub struct LbfgsbSettings {
    pub ftol: f64,
    pub gtol: f64,
    pub max_iter: usize,
    /// Number of stored curvature pairs.
    pub memory: usize,
    /// Finite-difference step.
    pub fd_step: f64,
}

impl Default for LbfgsbSettings {
    fn default() -> Self {
        Self {
            ftol: 1e-6,
            gtol: 1e-5,
            max_iter: 15_000,
            memory: 10,
            fd_step: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FunctionTolerance,
    GradientTolerance,
    MaxIterations,
    LineSearchFailed,
}

#[derive(Debug, Clone)]
pub struct LbfgsbOutcome {
    pub x: Vector3<f64>,
    pub fun: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub stop: StopReason,
}

/// Minimize `objective` inside `bounds`, starting from `x0` (projected first).
pub fn minimize_bounded<F>(
    objective: F,
    x0: Vector3<f64>,
    bounds: &[Interval; 3],
    settings: &LbfgsbSettings,
) -> Result<LbfgsbOutcome, AppError>
where
    F: Fn(&Vector3<f64>) -> f64,
{
    let mut evaluations = 0usize;
    let mut eval = |x: &Vector3<f64>| -> Result<f64, AppError> {
        evaluations += 1;
        let f = objective(x);
        if f.is_finite() {
            Ok(f)
        } else {
            Err(AppError::computation(format!(
                "Refinement hit a non-finite objective value ({f}) at θ={}, M={}, X={}.",
                x[0], x[1], x[2]
            )))
        }
    };

    let mut x = project(&x0, bounds);
    let mut fx = eval(&x)?;
    let mut g = gradient(&mut eval, &x, fx, bounds, settings.fd_step)?;

    let mut pairs: VecDeque<(Vector3<f64>, Vector3<f64>)> =
        VecDeque::with_capacity(settings.memory);
    let mut iterations = 0;
    let mut stop = StopReason::MaxIterations;

    while iterations < settings.max_iter {
        let pg = projected_gradient(&x, &g, bounds);
        if pg.amax() <= settings.gtol {
            stop = StopReason::GradientTolerance;
            break;
        }

        let mut d = mask_active(&two_loop(&g, &pairs), &x, bounds);
        if d.dot(&g) >= 0.0 {
            pairs.clear();
            d = -pg;
        }

        // Without curvature information the raw gradient scale is arbitrary.
        let mut alpha = if pairs.is_empty() { 1.0 / d.norm().max(1.0) } else { 1.0 };

        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let x_new = project(&(x + d * alpha), bounds);
            let step = x_new - x;
            if step.amax() == 0.0 {
                break;
            }
            let f_new = eval(&x_new)?;
            if f_new <= fx && f_new <= fx + ARMIJO_C1 * g.dot(&step) {
                accepted = Some((x_new, f_new));
                break;
            }
            alpha *= 0.5;
        }

        iterations += 1;
        let Some((x_new, f_new)) = accepted else {
            stop = StopReason::LineSearchFailed;
            break;
        };

        let g_new = gradient(&mut eval, &x_new, f_new, bounds, settings.fd_step)?;
        let s = x_new - x;
        let y = g_new - g;
        if s.dot(&y) > 1e-10 * y.norm_squared().max(f64::MIN_POSITIVE) {
            if pairs.len() == settings.memory {
                pairs.pop_front();
            }
            if settings.memory > 0 {
                pairs.push_back((s, y));
            }
        }

        let rel_decrease = (fx - f_new) / fx.abs().max(f_new.abs()).max(1.0);
        debug!("lbfgsb iter={iterations} f={f_new:.6e} decrease={rel_decrease:.3e}");

        x = x_new;
        fx = f_new;
        g = g_new;

        if rel_decrease <= settings.ftol {
            stop = StopReason::FunctionTolerance;
            break;
        }
    }

    Ok(LbfgsbOutcome {
        x,
        fun: fx,
        iterations,
        evaluations,
        stop,
    })
}

fn project(x: &Vector3<f64>, bounds: &[Interval; 3]) -> Vector3<f64> {
    Vector3::from_fn(|j, _| x[j].clamp(bounds[j].lo, bounds[j].hi))
}

fn gradient<E>(
    eval: &mut E,
    x: &Vector3<f64>,
    fx: f64,
    bounds: &[Interval; 3],
    h: f64,
) -> Result<Vector3<f64>, AppError>
where
    E: FnMut(&Vector3<f64>) -> Result<f64, AppError>,
{
    let mut g = Vector3::zeros();
    for j in 0..3 {
        let step = if x[j] + h > bounds[j].hi { -h } else { h };
        let mut xh = *x;
        xh[j] += step;
        g[j] = (eval(&xh)? - fx) / step;
    }
    Ok(g)
}

/// Gradient with components zeroed where a bound blocks descent.
fn projected_gradient(x: &Vector3<f64>, g: &Vector3<f64>, bounds: &[Interval; 3]) -> Vector3<f64> {
    Vector3::from_fn(|j, _| {
        let at_lo = x[j] <= bounds[j].lo && g[j] > 0.0;
        let at_hi = x[j] >= bounds[j].hi && g[j] < 0.0;
        if at_lo || at_hi { 0.0 } else { g[j] }
    })
}

/// Direction with components pointing out of the box at an active bound zeroed.
fn mask_active(d: &Vector3<f64>, x: &Vector3<f64>, bounds: &[Interval; 3]) -> Vector3<f64> {
    Vector3::from_fn(|j, _| {
        let out_lo = x[j] <= bounds[j].lo && d[j] < 0.0;
        let out_hi = x[j] >= bounds[j].hi && d[j] > 0.0;
        if out_lo || out_hi { 0.0 } else { d[j] }
    })
}

/// L-BFGS two-loop recursion: returns `-H·g`.
fn two_loop(g: &Vector3<f64>, pairs: &VecDeque<(Vector3<f64>, Vector3<f64>)>) -> Vector3<f64> {
    let mut q = *g;
    let mut alphas = Vec::with_capacity(pairs.len());
    for (s, y) in pairs.iter().rev() {
        let rho = 1.0 / y.dot(s);
        let a = rho * s.dot(&q);
        q -= y * a;
        alphas.push((rho, a));
    }

    let gamma = pairs
        .back()
        .map(|(s, y)| s.dot(y) / y.norm_squared())
        .unwrap_or(1.0);
    let mut r = q * gamma;

    for ((s, y), (rho, a)) in pairs.iter().zip(alphas.into_iter().rev()) {
        let b = rho * y.dot(&r);
        r += s * (a - b);
    }
    -r
}
