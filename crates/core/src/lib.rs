pub mod analysis;
pub mod calibration;
pub mod config;
pub mod data;
pub mod domain;
pub mod errors;
pub mod recommend;
pub mod scoring;
pub mod weather;

pub use analysis::{
    rank_stability, sensitivity_sweep, CarStability, SensitivityPoint, SensitivityReport,
    StabilityReport, SweptParameter,
};
pub use calibration::{
    AlphaMap, CalibrationParams, CalibrationPatch, CalibrationState, DayPeriod, FacilityKind,
    FacilityWeights,
};
pub use config::{ConfigError, ConfigOverrides, LoadOptions, LogFormat, SeatScoreConfig};
pub use data::{load_data_dir, CacheKind, DataCaches, DataResolver, DataTier, LoadedData};
pub use domain::station::{normalize_station_name, Station, StationNetwork};
pub use domain::trip::{DayCode, Direction, TripRequest};
pub use domain::{SEATS_PER_CAR, TOTAL_CARS};
pub use errors::{EngineError, LoadError, WeatherError};
pub use recommend::{plan_trip, DataQuality, Recommendation, SeatScoreEngine};
pub use scoring::{score_trip, CarScore, ScoreBoard, StationContribution, TripPlan};
pub use weather::{FixedWeather, WeatherObservation, WeatherService};
