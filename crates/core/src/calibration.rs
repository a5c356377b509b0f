//! Calibratable coefficients of the seat model.
//!
//! A [`CalibrationParams`] value is never edited in place: every change derives a new value and
//! [`CalibrationState`] swaps the shared `Arc` in one step, so a computation that took a
//! snapshot keeps seeing the same numbers until it finishes.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::EngineError;

pub const DEFAULT_BETA: f64 = 0.3;
pub const DEFAULT_GAMMA: f64 = 0.5;
pub const DEFAULT_DELTA: f64 = 0.15;

/// Weight given to a platform facility type that is not one of the known kinds.
pub const UNKNOWN_FACILITY_WEIGHT: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Escalator,
    Elevator,
    Stairs,
}

impl FacilityKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "escalator" | "에스컬레이터" => Some(Self::Escalator),
            "elevator" | "엘리베이터" => Some(Self::Elevator),
            "stairs" | "stair" | "계단" => Some(Self::Stairs),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityWeights {
    pub escalator: f64,
    pub elevator: f64,
    pub stairs: f64,
}

impl Default for FacilityWeights {
    fn default() -> Self {
        Self { escalator: 1.2, elevator: 0.0, stairs: 1.0 }
    }
}

impl FacilityWeights {
    pub fn get(&self, kind: FacilityKind) -> f64 {
        match kind {
            FacilityKind::Escalator => self.escalator,
            FacilityKind::Elevator => self.elevator,
            FacilityKind::Stairs => self.stairs,
        }
    }

    /// Weight for a raw facility label from the platform layout data.
    pub fn weight_of(&self, facility: &str) -> f64 {
        FacilityKind::parse(facility).map(|kind| self.get(kind)).unwrap_or(UNKNOWN_FACILITY_WEIGHT)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    MorningRush,
    EveningRush,
    Midday,
    Evening,
    Night,
    Early,
}

/// Amplitudes of the time-of-day curve, one per named period.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaMap {
    pub morning_rush: f64,
    pub evening_rush: f64,
    pub midday: f64,
    pub evening: f64,
    pub night: f64,
    pub early: f64,
}

impl Default for AlphaMap {
    fn default() -> Self {
        Self {
            morning_rush: 1.4,
            evening_rush: 1.3,
            midday: 1.0,
            evening: 0.9,
            night: 0.6,
            early: 0.5,
        }
    }
}

impl AlphaMap {
    pub fn get(&self, period: DayPeriod) -> f64 {
        match period {
            DayPeriod::MorningRush => self.morning_rush,
            DayPeriod::EveningRush => self.evening_rush,
            DayPeriod::Midday => self.midday,
            DayPeriod::Evening => self.evening,
            DayPeriod::Night => self.night,
            DayPeriod::Early => self.early,
        }
    }

    /// Every amplitude multiplied by `factor`, rounded to four decimals.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |value: f64| (value * factor * 10_000.0).round() / 10_000.0;
        Self {
            morning_rush: scale(self.morning_rush),
            evening_rush: scale(self.evening_rush),
            midday: scale(self.midday),
            evening: scale(self.evening),
            night: scale(self.night),
            early: scale(self.early),
        }
    }

    fn values(&self) -> [(&'static str, f64); 6] {
        [
            ("morning_rush", self.morning_rush),
            ("evening_rush", self.evening_rush),
            ("midday", self.midday),
            ("evening", self.evening),
            ("night", self.night),
            ("early", self.early),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Boarding-penalty strength.
    pub beta: f64,
    /// Competition-compression exponent applied to load factors.
    pub gamma: f64,
    /// Initial-seat bonus strength for lightly loaded cars.
    pub delta: f64,
    pub facility_weights: FacilityWeights,
    pub alpha_map: AlphaMap,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
            delta: DEFAULT_DELTA,
            facility_weights: FacilityWeights::default(),
            alpha_map: AlphaMap::default(),
        }
    }
}

impl CalibrationParams {
    pub fn with_beta(&self, beta: f64) -> Self {
        Self { beta, ..self.clone() }
    }

    pub fn with_gamma(&self, gamma: f64) -> Self {
        Self { gamma, ..self.clone() }
    }

    pub fn with_delta(&self, delta: f64) -> Self {
        Self { delta, ..self.clone() }
    }

    pub fn with_alpha_map(&self, alpha_map: AlphaMap) -> Self {
        Self { alpha_map, ..self.clone() }
    }

    /// Derives a new snapshot with every field the patch sets replaced.
    pub fn patched(&self, patch: &CalibrationPatch) -> Self {
        let mut facility_weights = self.facility_weights;
        if let Some(value) = patch.escalator_weight {
            facility_weights.escalator = value;
        }
        if let Some(value) = patch.elevator_weight {
            facility_weights.elevator = value;
        }
        if let Some(value) = patch.stairs_weight {
            facility_weights.stairs = value;
        }

        let mut alpha_map = self.alpha_map;
        if let Some(value) = patch.alpha_morning_rush {
            alpha_map.morning_rush = value;
        }
        if let Some(value) = patch.alpha_evening_rush {
            alpha_map.evening_rush = value;
        }
        if let Some(value) = patch.alpha_midday {
            alpha_map.midday = value;
        }
        if let Some(value) = patch.alpha_evening {
            alpha_map.evening = value;
        }
        if let Some(value) = patch.alpha_night {
            alpha_map.night = value;
        }
        if let Some(value) = patch.alpha_early {
            alpha_map.early = value;
        }

        Self {
            beta: patch.beta.unwrap_or(self.beta),
            gamma: patch.gamma.unwrap_or(self.gamma),
            delta: patch.delta.unwrap_or(self.delta),
            facility_weights,
            alpha_map,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(EngineError::InvalidCalibration(
                "beta must be a finite value >= 0".to_string(),
            ));
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 || self.gamma > 3.0 {
            return Err(EngineError::InvalidCalibration(
                "gamma must be in range (0, 3]".to_string(),
            ));
        }
        if !self.delta.is_finite() || self.delta < 0.0 {
            return Err(EngineError::InvalidCalibration(
                "delta must be a finite value >= 0".to_string(),
            ));
        }

        let weights = [
            ("escalator", self.facility_weights.escalator),
            ("elevator", self.facility_weights.elevator),
            ("stairs", self.facility_weights.stairs),
        ];
        for (name, value) in weights.into_iter().chain(self.alpha_map.values()) {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidCalibration(format!(
                    "{name} must be a finite value >= 0"
                )));
            }
        }

        Ok(())
    }
}

/// Partial update; unset fields keep the current snapshot's values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPatch {
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub delta: Option<f64>,
    pub escalator_weight: Option<f64>,
    pub elevator_weight: Option<f64>,
    pub stairs_weight: Option<f64>,
    pub alpha_morning_rush: Option<f64>,
    pub alpha_evening_rush: Option<f64>,
    pub alpha_midday: Option<f64>,
    pub alpha_evening: Option<f64>,
    pub alpha_night: Option<f64>,
    pub alpha_early: Option<f64>,
}

/// Holder of the live snapshot.
#[derive(Debug, Default)]
pub struct CalibrationState {
    current: RwLock<Arc<CalibrationParams>>,
}

impl CalibrationState {
    pub fn new(params: CalibrationParams) -> Self {
        Self { current: RwLock::new(Arc::new(params)) }
    }

    pub fn snapshot(&self) -> Arc<CalibrationParams> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Installs `params` and returns the snapshot it replaced.
    pub fn replace(
        &self,
        params: CalibrationParams,
    ) -> Result<Arc<CalibrationParams>, EngineError> {
        params.validate()?;
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::mem::replace(&mut *guard, Arc::new(params));
        info!(
            event_name = "seatscore.calibration.replaced",
            beta = guard.beta,
            gamma = guard.gamma,
            delta = guard.delta,
            "calibration snapshot replaced"
        );
        Ok(previous)
    }

    /// Read-modify-write under the write lock so concurrent patches cannot interleave.
    pub fn update(&self, patch: &CalibrationPatch) -> Result<Arc<CalibrationParams>, EngineError> {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = guard.patched(patch);
        next.validate()?;
        *guard = Arc::new(next);
        info!(
            event_name = "seatscore.calibration.updated",
            beta = guard.beta,
            gamma = guard.gamma,
            delta = guard.delta,
            "calibration snapshot updated"
        );
        Ok(Arc::clone(&guard))
    }
}
