//! Differential evolution over a bounded box.
//!
//! Strategy `best1bin`:
//!
//! - the population lives in the unit cube and is scaled to the bounds only
//!   when the objective is evaluated
//! - Latin-hypercube initialization
//! - mutant `b' = best + F·(p_r0 − p_r1)` with `F` re-drawn once per generation
//!   from the mutation range (dithering)
//! - binomial crossover with probability `CR`, one coordinate always taken
//!   from the mutant
//! - trial coordinates leaving the unit cube are replaced by uniform draws
//!
//! Updating is deferred: the whole generation of trials is built from the
//! RNG first, evaluated (in parallel when `workers > 1`), then selected.
//! Because the RNG stream never depends on evaluation order, the result is the
//! same for any worker count.
//!
//! Convergence: `std(energies) <= atol + tol * |mean(energies)|`.

use log::debug;
use nalgebra::Vector3;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::domain::Interval;
use crate::error::AppError;

const DIM: usize = 3;

/// Smallest population regardless of `popsize`.
const MIN_POPULATION: usize = 5;

#[derive(Debug, Clone)]
pub struct DeSettings {
    pub seed: u64,
    /// Maximum number of generations.
    pub maxiter: usize,
    /// Population size multiplier (population = `popsize * 3`, at least 5).
    pub popsize: usize,
    /// Relative convergence tolerance.
    pub tol: f64,
    /// Absolute convergence tolerance.
    pub atol: f64,
    /// Mutation factor range; equal ends disable dithering.
    pub mutation: (f64, f64),
    /// Crossover probability.
    pub recombination: f64,
    pub workers: usize,
}

impl Default for DeSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            maxiter: 2000,
            popsize: 17,
            tol: 1e-6,
            atol: 1e-6,
            mutation: (0.5, 1.0),
            recombination: 0.9,
            workers: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeOutcome {
    /// Best member, in parameter space.
    pub x: Vector3<f64>,
    pub fun: f64,
    pub generations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

/// Minimize `objective` over `bounds`.
///
/// Any non-finite objective value aborts the search with a computation error.
pub fn differential_evolution<F>(
    objective: F,
    bounds: &[Interval; DIM],
    settings: &DeSettings,
) -> Result<DeOutcome, AppError>
where
    F: Fn(&Vector3<f64>) -> f64 + Sync,
{
    validate(bounds, settings)?;

    let pool = if settings.workers > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(settings.workers)
                .build()
                .map_err(|e| AppError::config(format!("Failed to start worker pool: {e}")))?,
        )
    } else {
        None
    };

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let n_pop = (settings.popsize * DIM).max(MIN_POPULATION);

    let mut population = latin_hypercube(&mut rng, n_pop);
    let mut energies = evaluate(&objective, &population, bounds, pool.as_ref())?;
    let mut evaluations = n_pop;
    promote_lowest(&mut population, &mut energies);

    let mut generations = 0;
    let mut converged = false;

    for generation in 1..=settings.maxiter {
        generations = generation;
        let scale = draw_scale(&mut rng, settings.mutation);

        let trials: Vec<Vector3<f64>> = (0..n_pop)
            .map(|i| best1bin_trial(&mut rng, &population, i, scale, settings.recombination))
            .collect();
        let trial_energies = evaluate(&objective, &trials, bounds, pool.as_ref())?;
        evaluations += n_pop;

        for (i, (trial, e)) in trials.into_iter().zip(trial_energies).enumerate() {
            if e < energies[i] {
                population[i] = trial;
                energies[i] = e;
            }
        }
        promote_lowest(&mut population, &mut energies);

        let (mean, std) = mean_std(&energies);
        debug!(
            "de generation={generation} best={:.6e} mean={mean:.6e} std={std:.3e} F={scale:.3}",
            energies[0]
        );

        if std <= settings.atol + settings.tol * mean.abs() {
            converged = true;
            break;
        }
    }

    Ok(DeOutcome {
        x: scale_to_bounds(&population[0], bounds),
        fun: energies[0],
        generations,
        evaluations,
        converged,
    })
}

fn validate(bounds: &[Interval; DIM], settings: &DeSettings) -> Result<(), AppError> {
    for b in bounds {
        if !(b.lo.is_finite() && b.hi.is_finite() && b.hi >= b.lo) {
            return Err(AppError::config(format!(
                "Invalid search bound [{}, {}].",
                b.lo, b.hi
            )));
        }
    }
    let (f_lo, f_hi) = settings.mutation;
    if !(f_lo.is_finite() && f_hi.is_finite() && 0.0 <= f_lo && f_lo <= f_hi && f_hi <= 2.0) {
        return Err(AppError::config(format!(
            "Invalid mutation range ({f_lo}, {f_hi}); expected 0 <= lo <= hi <= 2."
        )));
    }
    if !(0.0..=1.0).contains(&settings.recombination) {
        return Err(AppError::config("Recombination must lie in [0, 1]."));
    }
    if settings.popsize == 0 {
        return Err(AppError::config("Population size factor must be >= 1."));
    }
    if settings.workers == 0 {
        return Err(AppError::config("Workers must be >= 1."));
    }
    Ok(())
}

/// One stratified sample per population member in every dimension, with the
/// strata shuffled independently per dimension.
fn latin_hypercube(rng: &mut StdRng, n_pop: usize) -> Vec<Vector3<f64>> {
    let seg = 1.0 / n_pop as f64;
    let mut population = vec![Vector3::zeros(); n_pop];
    for j in 0..DIM {
        let mut strata: Vec<usize> = (0..n_pop).collect();
        strata.shuffle(rng);
        for (member, &k) in population.iter_mut().zip(strata.iter()) {
            member[j] = seg * (k as f64 + rng.r#gen::<f64>());
        }
    }
    population
}

fn draw_scale(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}

fn best1bin_trial(
    rng: &mut StdRng,
    population: &[Vector3<f64>],
    candidate: usize,
    scale: f64,
    recombination: f64,
) -> Vector3<f64> {
    let (r0, r1) = pick_two_others(rng, population.len(), candidate);
    let mutant = population[0] + (population[r0] - population[r1]) * scale;

    let mut trial = population[candidate];
    let fill_point = rng.gen_range(0..DIM);
    for j in 0..DIM {
        if j == fill_point || rng.r#gen::<f64>() < recombination {
            trial[j] = mutant[j];
        }
    }

    for j in 0..DIM {
        if !(0.0..=1.0).contains(&trial[j]) {
            trial[j] = rng.r#gen::<f64>();
        }
    }
    trial
}

/// Two distinct indices, both different from `candidate`.
fn pick_two_others(rng: &mut StdRng, n: usize, candidate: usize) -> (usize, usize) {
    let mut r0 = rng.gen_range(0..n - 1);
    if r0 >= candidate {
        r0 += 1;
    }
    loop {
        let r1 = rng.gen_range(0..n);
        if r1 != candidate && r1 != r0 {
            return (r0, r1);
        }
    }
}

fn scale_to_bounds(u: &Vector3<f64>, bounds: &[Interval; DIM]) -> Vector3<f64> {
    Vector3::from_fn(|j, _| bounds[j].lo + u[j] * bounds[j].width())
}

fn evaluate<F>(
    objective: &F,
    members: &[Vector3<f64>],
    bounds: &[Interval; DIM],
    pool: Option<&ThreadPool>,
) -> Result<Vec<f64>, AppError>
where
    F: Fn(&Vector3<f64>) -> f64 + Sync,
{
    let eval = |u: &Vector3<f64>| objective(&scale_to_bounds(u, bounds));
    let energies: Vec<f64> = match pool {
        Some(pool) => pool.install(|| members.par_iter().map(eval).collect()),
        None => members.iter().map(eval).collect(),
    };

    if let Some(i) = energies.iter().position(|e| !e.is_finite()) {
        let p = scale_to_bounds(&members[i], bounds);
        return Err(AppError::computation(format!(
            "Global search hit a non-finite objective value ({}) at θ={}, M={}, X={}.",
            energies[i], p[0], p[1], p[2]
        )));
    }
    Ok(energies)
}

/// Keep the best member at index 0 (the `best1bin` base vector).
fn promote_lowest(population: &mut [Vector3<f64>], energies: &mut [f64]) {
    let mut best = 0;
    for i in 1..energies.len() {
        if energies[i] < energies[best] {
            best = i;
        }
    }
    population.swap(0, best);
    energies.swap(0, best);
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_box(lo: f64, hi: f64) -> [Interval; 3] {
        [Interval::new(lo, hi); 3]
    }

    fn sphere(center: Vector3<f64>) -> impl Fn(&Vector3<f64>) -> f64 + Sync {
        move |p: &Vector3<f64>| (p - center).norm_squared()
    }

    #[test]
    fn finds_minimum_of_shifted_sphere() {
        let center = Vector3::new(1.5, -0.5, 3.0);
        let settings = DeSettings {
            maxiter: 300,
            popsize: 10,
            tol: 1e-10,
            atol: 1e-12,
            ..DeSettings::default()
        };
        let out = differential_evolution(sphere(center), &unit_box(-5.0, 5.0), &settings).unwrap();
        assert_abs_diff_eq!(out.x[0], 1.5, epsilon = 1e-3);
        assert_abs_diff_eq!(out.x[1], -0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(out.x[2], 3.0, epsilon = 1e-3);
        assert!(out.fun < 1e-5);
    }

    #[test]
    fn same_seed_same_result() {
        let center = Vector3::new(0.3, 0.7, -2.0);
        let settings = DeSettings {
            maxiter: 50,
            popsize: 6,
            ..DeSettings::default()
        };
        let a = differential_evolution(sphere(center), &unit_box(-4.0, 4.0), &settings).unwrap();
        let b = differential_evolution(sphere(center), &unit_box(-4.0, 4.0), &settings).unwrap();
        assert_eq!(a.x, b.x);
        assert_eq!(a.fun.to_bits(), b.fun.to_bits());
        assert_eq!(a.evaluations, b.evaluations);
    }

    #[test]
    fn parallel_evaluation_matches_serial() {
        let center = Vector3::new(-1.0, 2.0, 0.5);
        let serial = DeSettings {
            maxiter: 40,
            popsize: 8,
            ..DeSettings::default()
        };
        let parallel = DeSettings {
            workers: 4,
            ..serial.clone()
        };
        let a = differential_evolution(sphere(center), &unit_box(-3.0, 3.0), &serial).unwrap();
        let b = differential_evolution(sphere(center), &unit_box(-3.0, 3.0), &parallel).unwrap();
        assert_eq!(a.x, b.x);
        assert_eq!(a.fun.to_bits(), b.fun.to_bits());
    }

    #[test]
    fn result_stays_inside_bounds() {
        // Unconstrained minimum lies outside the box; the search must stop at the edge.
        let center = Vector3::new(10.0, -10.0, 0.0);
        let settings = DeSettings {
            maxiter: 200,
            popsize: 8,
            ..DeSettings::default()
        };
        let bounds = unit_box(-1.0, 1.0);
        let out = differential_evolution(sphere(center), &bounds, &settings).unwrap();
        for j in 0..3 {
            assert!(bounds[j].contains(out.x[j]));
        }
        assert!(out.x[0] > 0.99);
        assert!(out.x[1] < -0.99);
    }

    #[test]
    fn non_finite_objective_is_a_computation_error() {
        let settings = DeSettings {
            maxiter: 5,
            popsize: 2,
            ..DeSettings::default()
        };
        let objective = |p: &Vector3<f64>| if p[0] > 0.0 { f64::NAN } else { 1.0 };
        let err = differential_evolution(objective, &unit_box(-1.0, 1.0), &settings).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Computation);
    }

    #[test]
    fn latin_hypercube_hits_every_stratum() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 12;
        let pop = latin_hypercube(&mut rng, n);
        for j in 0..3 {
            let mut strata: Vec<usize> = pop
                .iter()
                .map(|p| (p[j] * n as f64).floor() as usize)
                .collect();
            strata.sort_unstable();
            assert_eq!(strata, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn zero_maxiter_returns_best_initial_member() {
        let settings = DeSettings {
            maxiter: 0,
            popsize: 5,
            ..DeSettings::default()
        };
        let out =
            differential_evolution(sphere(Vector3::zeros()), &unit_box(-1.0, 1.0), &settings)
                .unwrap();
        assert_eq!(out.generations, 0);
        assert_eq!(out.evaluations, 15);
        assert!(!out.converged);
    }
}
