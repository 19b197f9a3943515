//! Synthetic observation generation from known curve parameters.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Observations, Params};
use crate::error::AppError;
use crate::fit::grid::lin_space;
use crate::models::ParametricModel;

/// Evaluate `model` at `n` evenly spaced `t` values in `[t_min, t_max]` and
/// perturb both coordinates with independent `Normal(0, noise_sigma)` noise.
///
/// `noise_sigma == 0` returns exact curve points. The same `seed` always
/// produces the same sample.
pub fn generate_sample(
    params: &Params,
    n: usize,
    t_min: f64,
    t_max: f64,
    noise_sigma: f64,
    seed: u64,
    model: &ParametricModel,
) -> Result<Observations, AppError> {
    if n == 0 {
        return Err(AppError::config("Sample count must be > 0."));
    }
    if !(noise_sigma.is_finite() && noise_sigma >= 0.0) {
        return Err(AppError::config("Noise sigma must be finite and >= 0."));
    }

    let t = lin_space(t_min, t_max, n)?;
    let (mut x, mut y) = model.predict_params(&t, params);

    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::computation(
            "Model produced non-finite points for the requested parameters.",
        ));
    }

    if noise_sigma > 0.0 {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, noise_sigma)
            .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;
        for (xi, yi) in x.iter_mut().zip(y.iter_mut()) {
            *xi += normal.sample(&mut rng);
            *yi += normal.sample(&mut rng);
        }
    }

    Ok(Observations { x, y })
}
