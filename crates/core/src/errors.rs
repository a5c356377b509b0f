use std::path::PathBuf;

use thiserror::Error;

/// Failures while building the station table. Optional caches never produce these.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("station table is required but was not found at `{0}`")]
    MissingStationTable(PathBuf),
    #[error("could not read `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("malformed csv in `{path}`: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("malformed json in `{path}`: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("station table `{0}` has no stations")]
    EmptyStationTable(PathBuf),
    #[error("station `{name}` appears more than once in the station table")]
    DuplicateStation { name: String },
}

impl LoadError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::MissingStationTable(_) | Self::EmptyStationTable(_) => "data_missing",
            Self::ReadFile { .. } => "data_io",
            Self::Csv { .. } | Self::Json { .. } | Self::DuplicateStation { .. } => "data_format",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("station `{name}` is not on the line")]
    UnknownStation { name: String },
    #[error("no intermediate stations resolved between `{boarding}` and `{destination}`")]
    EmptyRoute { boarding: String, destination: String },
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl EngineError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::UnknownStation { .. } => "unknown_station",
            Self::EmptyRoute { .. } => "empty_route",
            Self::InvalidCalibration(_) => "invalid_calibration",
            Self::Load(inner) => inner.error_class(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WeatherError {
    #[error("weather service unavailable: {0}")]
    Unavailable(String),
    #[error("weather response could not be interpreted: {0}")]
    Malformed(String),
}
