//! Engine façade: owns the loaded data, the calibration snapshot and the optional weather
//! provider, and turns one trip request into a full recommendation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{info, warn};

use crate::calibration::{CalibrationParams, CalibrationPatch, CalibrationState};
use crate::data::caches::DataCaches;
use crate::data::loader::{load_data_dir, LoadedData};
use crate::data::resolver::{DataResolver, DataTier, LookupKey, TravelKey};
use crate::domain::station::StationNetwork;
use crate::domain::trip::{DayCode, Direction, TripRequest};
use crate::errors::{EngineError, LoadError};
use crate::scoring::alpha::time_of_day_multiplier;
use crate::scoring::engine::{round_to, score_trip, CarScore, ScoreBoard, TripPlan};
use crate::weather::{checked_factor, WeatherService};

/// Which resolution tier answered each data category for one query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub getoff_rate: DataTier,
    pub car_congestion: DataTier,
    pub train_congestion: DataTier,
    pub congestion_30min: DataTier,
    pub travel_times: DataTier,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub boarding: String,
    pub destination: String,
    pub hour: u32,
    pub direction: Direction,
    pub day: Option<DayCode>,
    pub alpha: f64,
    pub weather_factor: f64,
    pub n_intermediate: usize,
    pub intermediates: Vec<String>,
    pub total_trip_minutes: f64,
    pub best_car: usize,
    pub best_score: f64,
    pub worst_car: usize,
    pub worst_score: f64,
    pub score_spread: f64,
    pub scores: Vec<CarScore>,
    /// 30-minute congestion % at the boarding station, when known.
    pub boarding_congestion: Option<f64>,
    pub load_factors: BTreeMap<usize, f64>,
    pub p_seated: BTreeMap<usize, f64>,
    /// Expected minutes until seated, per car.
    pub seat_times: BTreeMap<usize, f64>,
    pub data_sources: Vec<&'static str>,
    pub data_quality: DataQuality,
}

pub struct SeatScoreEngine {
    data_dir: Option<PathBuf>,
    data: RwLock<Arc<LoadedData>>,
    calibration: CalibrationState,
    weather: RwLock<Option<Arc<dyn WeatherService>>>,
}

impl std::fmt::Debug for SeatScoreEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatScoreEngine")
            .field("data_dir", &self.data_dir)
            .field("stations", &self.data().network.len())
            .field("calibration", &self.calibration.snapshot())
            .finish_non_exhaustive()
    }
}

impl SeatScoreEngine {
    /// Loads `data_dir` and starts with `params` as the live calibration.
    pub fn load(
        data_dir: impl Into<PathBuf>,
        params: CalibrationParams,
    ) -> Result<Self, EngineError> {
        params.validate()?;
        let data_dir = data_dir.into();
        let data = load_data_dir(&data_dir)?;
        Ok(Self::with_data(Some(data_dir), data, params))
    }

    /// Builds an engine over data already in memory. `load_all` is a no-op for such engines.
    pub fn from_parts(
        network: StationNetwork,
        caches: DataCaches,
        params: CalibrationParams,
    ) -> Result<Self, EngineError> {
        params.validate()?;
        Ok(Self::with_data(None, LoadedData { network, caches }, params))
    }

    fn with_data(data_dir: Option<PathBuf>, data: LoadedData, params: CalibrationParams) -> Self {
        Self {
            data_dir,
            data: RwLock::new(Arc::new(data)),
            calibration: CalibrationState::new(params),
            weather: RwLock::new(None),
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Re-reads the data directory and swaps the whole data set in one step. Computations
    /// already running keep the set they started with.
    pub fn load_all(&self) -> Result<(), LoadError> {
        let Some(dir) = self.data_dir.as_deref() else {
            return Ok(());
        };
        let loaded = Arc::new(load_data_dir(dir)?);
        let mut guard = self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = loaded;
        Ok(())
    }

    pub fn data(&self) -> Arc<LoadedData> {
        let guard = self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn get_params(&self) -> Arc<CalibrationParams> {
        self.calibration.snapshot()
    }

    /// Installs a new calibration snapshot and returns the previous one.
    pub fn replace_params(
        &self,
        params: CalibrationParams,
    ) -> Result<Arc<CalibrationParams>, EngineError> {
        self.calibration.replace(params)
    }

    pub fn update_params(
        &self,
        patch: &CalibrationPatch,
    ) -> Result<Arc<CalibrationParams>, EngineError> {
        self.calibration.update(patch)
    }

    pub fn set_weather_service(&self, service: impl WeatherService + 'static) {
        let mut guard = self.weather.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Arc::new(service));
    }

    pub fn clear_weather_service(&self) {
        let mut guard = self.weather.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }

    /// Asks the weather provider once. No provider, an error, or an unusable factor all mean 1.0.
    pub fn current_weather_factor(&self) -> f64 {
        let service = {
            let guard = self.weather.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.clone()
        };
        let Some(service) = service else {
            return 1.0;
        };

        match checked_factor(service.as_ref()) {
            Ok(factor) => factor,
            Err(error) => {
                warn!(
                    event_name = "seatscore.weather.unavailable",
                    error = %error,
                    "weather factor unavailable; using 1.0"
                );
                1.0
            }
        }
    }

    /// Direction with fewer stops between the two stations; ties go inner.
    pub fn suggest_direction(
        &self,
        boarding: &str,
        destination: &str,
    ) -> Result<Direction, EngineError> {
        let data = self.data();
        let from = data.network.locate(boarding)?;
        let to = data.network.locate(destination)?;
        Ok(data.network.shorter_direction(from, to))
    }

    /// Scores the trip against the live calibration snapshot and current weather.
    pub fn compute_seatscore(&self, request: &TripRequest) -> Result<ScoreBoard, EngineError> {
        let params = self.get_params();
        self.score_with(&params, request, self.current_weather_factor())
    }

    /// Scores the trip against an explicit snapshot. The live snapshot is not consulted, so
    /// callers can evaluate derived parameters without swapping anything.
    pub fn score_with(
        &self,
        params: &CalibrationParams,
        request: &TripRequest,
        weather_factor: f64,
    ) -> Result<ScoreBoard, EngineError> {
        let data = self.data();
        let plan = plan_trip(&data.network, request)?;
        let resolver = DataResolver::new(&data.network, &data.caches, params);
        let alpha = time_of_day_multiplier(request.hour, &params.alpha_map) * weather_factor;
        Ok(score_trip(&resolver, &plan, alpha))
    }

    pub fn recommend(&self, request: &TripRequest) -> Result<Recommendation, EngineError> {
        let params = self.get_params();
        let data = self.data();
        let weather_factor = self.current_weather_factor();

        let plan = plan_trip(&data.network, request)?;
        let resolver = DataResolver::new(&data.network, &data.caches, &params);
        let alpha = time_of_day_multiplier(request.hour, &params.alpha_map) * weather_factor;
        let board = score_trip(&resolver, &plan, alpha);

        let recommendation = assemble(&resolver, &plan, board, weather_factor);
        info!(
            event_name = "seatscore.recommend.completed",
            boarding = %recommendation.boarding,
            destination = %recommendation.destination,
            hour = recommendation.hour,
            direction = %recommendation.direction,
            n_intermediate = recommendation.n_intermediate,
            best_car = recommendation.best_car,
            "recommendation computed"
        );
        Ok(recommendation)
    }
}

/// Resolves both stations and the stops between them.
pub fn plan_trip(network: &StationNetwork, request: &TripRequest) -> Result<TripPlan, EngineError> {
    let from = network.locate(&request.boarding)?;
    let to = network.locate(&request.destination)?;
    let intermediates: Vec<String> = network
        .intermediates(from, to, request.direction)
        .into_iter()
        .map(|station| station.name.clone())
        .collect();

    let station_name = |index: usize| {
        network.station(index).map(|station| station.name.clone()).ok_or_else(|| {
            EngineError::UnknownStation { name: request.boarding.clone() }
        })
    };
    let boarding = station_name(from)?;
    let destination = station_name(to)?;

    if intermediates.is_empty() && network.hops(from, to, request.direction) > 1 {
        return Err(EngineError::EmptyRoute { boarding, destination });
    }

    Ok(TripPlan {
        boarding,
        destination,
        intermediates,
        hour: request.hour,
        direction: request.direction,
        day: request.day,
    })
}

fn assemble(
    resolver: &DataResolver<'_>,
    plan: &TripPlan,
    board: ScoreBoard,
    weather_factor: f64,
) -> Recommendation {
    let boarding_key = LookupKey::new(&plan.boarding, plan.hour, plan.direction, plan.day);
    let boarding_congestion = resolver.congestion_same_direction(&boarding_key);

    let mut load_factors = BTreeMap::new();
    let mut p_seated = BTreeMap::new();
    let mut seat_times = BTreeMap::new();
    for record in &board.cars {
        load_factors.insert(record.car, round_to(record.load_factor, 4));
        p_seated.insert(record.car, record.p_seated);
        let minutes = expected_seat_time(resolver, plan, record, board.total_trip_minutes);
        seat_times.insert(record.car, minutes);
    }

    let (best_car, best_score) = board.best().map_or((0, 0.0), |car| (car.car, car.score));
    let (worst_car, worst_score) = board.worst().map_or((0, 0.0), |car| (car.car, car.score));

    Recommendation {
        boarding: plan.boarding.clone(),
        destination: plan.destination.clone(),
        hour: plan.hour,
        direction: plan.direction,
        day: plan.day,
        alpha: board.alpha,
        weather_factor,
        n_intermediate: plan.intermediates.len(),
        intermediates: plan.intermediates.clone(),
        total_trip_minutes: board.total_trip_minutes,
        best_car,
        best_score,
        worst_car,
        worst_score,
        score_spread: best_score - worst_score,
        scores: board.cars,
        boarding_congestion,
        load_factors,
        p_seated,
        seat_times,
        data_sources: resolver.caches().data_sources(),
        data_quality: data_quality(resolver, plan, boarding_congestion.is_some()),
    }
}

/// `Σ p_first · T(boarding → station) + (1 − Σ p_first) · total`, rounded to 0.1 minute.
/// A trip with no intermediate stations reports 0.0 rather than the full trip time.
fn expected_seat_time(
    resolver: &DataResolver<'_>,
    plan: &TripPlan,
    record: &CarScore,
    total_trip: f64,
) -> f64 {
    if record.contributions.is_empty() {
        let minutes = if plan.intermediates.is_empty() { 0.0 } else { total_trip };
        return round_to(minutes, 1);
    }

    let mut expected = 0.0;
    let mut p_first_sum = 0.0;
    for entry in &record.contributions {
        expected +=
            entry.p_first * resolver.travel_minutes(&plan.boarding, &entry.station, plan.direction);
        p_first_sum += entry.p_first;
    }
    expected += (1.0 - p_first_sum).max(0.0) * total_trip;
    round_to(expected, 1)
}

fn best_tier(tiers: impl IntoIterator<Item = DataTier>) -> DataTier {
    tiers.into_iter().min().unwrap_or(DataTier::Fallback)
}

fn data_quality(
    resolver: &DataResolver<'_>,
    plan: &TripPlan,
    has_boarding_congestion: bool,
) -> DataQuality {
    let keys: Vec<LookupKey<'_>> = plan
        .intermediates
        .iter()
        .map(|station| LookupKey::new(station, plan.hour, plan.direction, plan.day))
        .collect();
    let boarding = LookupKey::new(&plan.boarding, plan.hour, plan.direction, plan.day);
    let total_trip = TravelKey {
        from: &plan.boarding,
        to: &plan.destination,
        direction: Some(plan.direction),
    };

    DataQuality {
        getoff_rate: best_tier(keys.iter().map(|key| resolver.car_weights(key).tier)),
        car_congestion: best_tier(
            keys.iter()
                .map(|key| resolver.competitors(key).tier)
                .chain([resolver.boarding_shares(&boarding).tier]),
        ),
        train_congestion: resolver.train_congestion_scale(&boarding).tier,
        congestion_30min: if has_boarding_congestion {
            DataTier::Exact
        } else {
            DataTier::Fallback
        },
        travel_times: resolver.travel_time(&total_trip).tier,
    }
}
