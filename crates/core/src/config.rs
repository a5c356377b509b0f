use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calibration::CalibrationParams;

pub const DEFAULT_CONFIG_FILE: &str = "seatscore.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct SeatScoreConfig {
    pub data: DataConfig,
    pub calibration: CalibrationParams,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataConfig {
    pub dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub delta: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } | Self::MissingConfigFile(_) => "config_io",
            Self::ParseFile { .. } => "config_parse",
            Self::MissingEnvInterpolation { .. }
            | Self::UnterminatedInterpolation
            | Self::InvalidEnvOverride { .. } => "config_env",
            Self::Validation(_) => "config_validation",
        }
    }
}

impl Default for SeatScoreConfig {
    fn default() -> Self {
        Self {
            data: DataConfig { dir: PathBuf::from("data") },
            calibration: CalibrationParams::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SeatScoreConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Initial calibration snapshot for the engine.
    pub fn calibration_params(&self) -> CalibrationParams {
        self.calibration.clone()
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(dir) = data.dir {
                self.data.dir = dir;
            }
        }

        if let Some(calibration) = patch.calibration {
            if let Some(beta) = calibration.beta {
                self.calibration.beta = beta;
            }
            if let Some(gamma) = calibration.gamma {
                self.calibration.gamma = gamma;
            }
            if let Some(delta) = calibration.delta {
                self.calibration.delta = delta;
            }
            if let Some(weights) = calibration.facility_weights {
                let current = &mut self.calibration.facility_weights;
                current.escalator = weights.escalator.unwrap_or(current.escalator);
                current.elevator = weights.elevator.unwrap_or(current.elevator);
                current.stairs = weights.stairs.unwrap_or(current.stairs);
            }
            if let Some(alpha) = calibration.alpha_map {
                let current = &mut self.calibration.alpha_map;
                current.morning_rush = alpha.morning_rush.unwrap_or(current.morning_rush);
                current.evening_rush = alpha.evening_rush.unwrap_or(current.evening_rush);
                current.midday = alpha.midday.unwrap_or(current.midday);
                current.evening = alpha.evening.unwrap_or(current.evening);
                current.night = alpha.night.unwrap_or(current.night);
                current.early = alpha.early.unwrap_or(current.early);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SEATSCORE_DATA_DIR") {
            self.data.dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("SEATSCORE_BETA") {
            self.calibration.beta = parse_f64("SEATSCORE_BETA", &value)?;
        }
        if let Some(value) = read_env("SEATSCORE_GAMMA") {
            self.calibration.gamma = parse_f64("SEATSCORE_GAMMA", &value)?;
        }
        if let Some(value) = read_env("SEATSCORE_DELTA") {
            self.calibration.delta = parse_f64("SEATSCORE_DELTA", &value)?;
        }

        let log_level =
            read_env("SEATSCORE_LOGGING_LEVEL").or_else(|| read_env("SEATSCORE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SEATSCORE_LOGGING_FORMAT").or_else(|| read_env("SEATSCORE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.data.dir = data_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(beta) = overrides.beta {
            self.calibration.beta = beta;
        }
        if let Some(gamma) = overrides.gamma {
            self.calibration.gamma = gamma;
        }
        if let Some(delta) = overrides.delta {
            self.calibration.delta = delta;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        self.calibration.validate().map_err(|error| ConfigError::Validation(error.to_string()))?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    if data.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.dir must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    calibration: Option<CalibrationConfigPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct CalibrationConfigPatch {
    beta: Option<f64>,
    gamma: Option<f64>,
    delta: Option<f64>,
    facility_weights: Option<FacilityWeightsPatch>,
    alpha_map: Option<AlphaMapPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct FacilityWeightsPatch {
    escalator: Option<f64>,
    elevator: Option<f64>,
    stairs: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct AlphaMapPatch {
    morning_rush: Option<f64>,
    evening_rush: Option<f64>,
    midday: Option<f64>,
    evening: Option<f64>,
    night: Option<f64>,
    early: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
