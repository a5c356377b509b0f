//! Calibration diagnostics: parameter sweeps and rank stability under α perturbation.
//!
//! Both run against derived snapshots handed straight to [`SeatScoreEngine::score_with`]; the
//! live calibration is read once and never swapped.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use crate::calibration::CalibrationParams;
use crate::domain::trip::{Direction, TripRequest};
use crate::domain::{car_numbers, TOTAL_CARS};
use crate::errors::EngineError;
use crate::recommend::SeatScoreEngine;
use crate::scoring::engine::round_to;

pub const STABILITY_SEED: u64 = 42;
pub const DEFAULT_STABILITY_TRIALS: usize = 50;
/// Half-width of the uniform α perturbation.
pub const ALPHA_PERTURBATION: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweptParameter {
    Beta,
    Gamma,
    Delta,
}

impl SweptParameter {
    pub const ALL: [SweptParameter; 3] = [Self::Beta, Self::Gamma, Self::Delta];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beta => "beta",
            Self::Gamma => "gamma",
            Self::Delta => "delta",
        }
    }

    /// Beta 0.00..=1.00 and delta 0.00..=0.50 in steps of 0.05; gamma 0.1..=1.0 in steps of 0.1.
    pub fn sweep_values(&self) -> Vec<f64> {
        match self {
            Self::Beta => (0..=100u32).step_by(5).map(|step| f64::from(step) / 100.0).collect(),
            Self::Gamma => (1..=10u32).map(|step| f64::from(step) / 10.0).collect(),
            Self::Delta => (0..=50u32).step_by(5).map(|step| f64::from(step) / 100.0).collect(),
        }
    }

    pub fn apply(&self, params: &CalibrationParams, value: f64) -> CalibrationParams {
        match self {
            Self::Beta => params.with_beta(value),
            Self::Gamma => params.with_gamma(value),
            Self::Delta => params.with_delta(value),
        }
    }
}

impl fmt::Display for SweptParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SweptParameter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beta" => Ok(Self::Beta),
            "gamma" => Ok(Self::Gamma),
            "delta" => Ok(Self::Delta),
            _ => Err(format!("unsupported parameter `{value}` (expected beta|gamma|delta)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SensitivityPoint {
    pub value: f64,
    pub car: usize,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensitivityReport {
    pub parameter: SweptParameter,
    pub boarding: String,
    pub destination: String,
    pub hour: u32,
    pub direction: Direction,
    /// Ten points per swept value, in car order.
    pub points: Vec<SensitivityPoint>,
}

impl SensitivityReport {
    /// Best car at each swept value; the lowest car number wins ties.
    pub fn best_cars(&self) -> Vec<(f64, usize)> {
        self.points
            .chunks(TOTAL_CARS)
            .filter_map(|chunk| {
                let best = chunk.iter().fold(None::<&SensitivityPoint>, |best, point| match best {
                    Some(current) if current.score >= point.score => Some(current),
                    _ => Some(point),
                })?;
                Some((best.value, best.car))
            })
            .collect()
    }
}

pub fn sensitivity_sweep(
    engine: &SeatScoreEngine,
    request: &TripRequest,
    parameter: SweptParameter,
) -> Result<SensitivityReport, EngineError> {
    let base = engine.get_params();
    let weather_factor = engine.current_weather_factor();
    let values = parameter.sweep_values();

    let mut points = Vec::with_capacity(values.len() * TOTAL_CARS);
    for value in values {
        let board = engine.score_with(&parameter.apply(&base, value), request, weather_factor)?;
        points.extend(board.by_car().into_iter().map(|record| SensitivityPoint {
            value,
            car: record.car,
            score: round_to(record.score, 1),
        }));
    }

    info!(
        event_name = "seatscore.analysis.sensitivity_completed",
        parameter = parameter.as_str(),
        boarding = %request.boarding,
        destination = %request.destination,
        hour = request.hour,
        points = points.len(),
        "sensitivity sweep completed"
    );

    Ok(SensitivityReport {
        parameter,
        boarding: request.boarding.clone(),
        destination: request.destination.clone(),
        hour: request.hour,
        direction: request.direction,
        points,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CarStability {
    pub car: usize,
    pub base_rank: usize,
    pub base_score: f64,
    /// Distinct ranks seen across trials, minus one.
    pub rank_changes: usize,
    pub min_rank: usize,
    pub max_rank: usize,
    pub avg_score: f64,
    pub score_std: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StabilityReport {
    pub boarding: String,
    pub destination: String,
    pub hour: u32,
    pub direction: Direction,
    pub n_perturbations: usize,
    pub base_best_car: usize,
    pub best_car_stable: bool,
    pub best_car_change_pct: f64,
    /// Ordered by base rank.
    pub cars: Vec<CarStability>,
}

/// Scales every α amplitude by a common factor in `1 ± 0.2`, `trials` times, with a fixed seed.
pub fn rank_stability(
    engine: &SeatScoreEngine,
    request: &TripRequest,
    trials: usize,
) -> Result<StabilityReport, EngineError> {
    let base = engine.get_params();
    let weather_factor = engine.current_weather_factor();
    let baseline = engine.score_with(&base, request, weather_factor)?;
    let base_best_car = baseline.best().map_or(1, |record| record.car);

    let mut rng = StdRng::seed_from_u64(STABILITY_SEED);
    let mut ranks: Vec<Vec<usize>> = vec![Vec::with_capacity(trials); TOTAL_CARS];
    let mut scores: Vec<Vec<f64>> = vec![Vec::with_capacity(trials); TOTAL_CARS];
    let mut best_car_changes = 0usize;

    for _ in 0..trials {
        let factor = 1.0 + rng.gen_range(-ALPHA_PERTURBATION..ALPHA_PERTURBATION);
        let perturbed = base.with_alpha_map(base.alpha_map.scaled(factor));
        let board = engine.score_with(&perturbed, request, weather_factor)?;

        if board.best().map(|record| record.car) != Some(base_best_car) {
            best_car_changes += 1;
        }
        for record in &board.cars {
            ranks[record.car - 1].push(record.rank);
            scores[record.car - 1].push(record.score);
        }
    }

    let mut cars: Vec<CarStability> = car_numbers()
        .map(|car| {
            let (base_rank, base_score) =
                baseline.car(car).map_or((car, 0.0), |record| (record.rank, record.score));
            car_stability(car, base_rank, base_score, &ranks[car - 1], &scores[car - 1])
        })
        .collect();
    cars.sort_by_key(|entry| entry.base_rank);

    let best_car_change_pct = if trials == 0 {
        0.0
    } else {
        round_to(best_car_changes as f64 / trials as f64 * 100.0, 1)
    };

    info!(
        event_name = "seatscore.analysis.stability_completed",
        boarding = %request.boarding,
        destination = %request.destination,
        hour = request.hour,
        trials,
        best_car_changes,
        "rank stability analysis completed"
    );

    Ok(StabilityReport {
        boarding: request.boarding.clone(),
        destination: request.destination.clone(),
        hour: request.hour,
        direction: request.direction,
        n_perturbations: trials,
        base_best_car,
        best_car_stable: best_car_changes == 0,
        best_car_change_pct,
        cars,
    })
}

fn car_stability(
    car: usize,
    base_rank: usize,
    base_score: f64,
    ranks: &[usize],
    scores: &[f64],
) -> CarStability {
    let mut distinct = ranks.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let (avg_score, score_std) = if scores.is_empty() {
        (0.0, 0.0)
    } else {
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|score| (score - mean).powi(2)).sum::<f64>() / n;
        (mean, variance.sqrt())
    };

    CarStability {
        car,
        base_rank,
        base_score: round_to(base_score, 1),
        rank_changes: distinct.len().saturating_sub(1),
        min_rank: ranks.iter().copied().min().unwrap_or(base_rank),
        max_rank: ranks.iter().copied().max().unwrap_or(base_rank),
        avg_score: round_to(avg_score, 1),
        score_std: round_to(score_std, 2),
    }
}
