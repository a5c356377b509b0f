pub mod config;
pub mod doctor;
pub mod recommend;
pub mod sensitivity;
pub mod stability;

use clap::Args;
use seatscore_core::config::{LoadOptions, SeatScoreConfig};
use seatscore_core::{DayCode, Direction, EngineError, SeatScoreEngine, TripRequest};
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_DATA: u8 = 3;
pub const EXIT_QUERY: u8 = 4;
pub const EXIT_OUTPUT: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Successful run whose output is the report itself.
    pub fn report(output: String) -> Self {
        Self { exit_code: 0, output }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Trip selection shared by the scoring commands.
#[derive(Debug, Clone, Args)]
pub struct TripArgs {
    #[arg(long = "from", help = "Boarding station (e.g. 강남 or 강남역)")]
    pub boarding: String,
    #[arg(long = "to", help = "Destination station")]
    pub destination: String,
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24), help = "Hour of day, 0-23")]
    pub hour: u32,
    #[arg(long, help = "inner|outer; defaults to the shorter way round")]
    pub direction: Option<Direction>,
}

/// Loads configuration and data for a scoring command, mapping failures onto command results.
pub(crate) fn load_engine(
    command: &str,
    options: &LoadOptions,
) -> Result<SeatScoreEngine, CommandResult> {
    let config = SeatScoreConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            error.error_class(),
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })?;

    SeatScoreEngine::load(&config.data.dir, config.calibration_params()).map_err(|error| {
        CommandResult::failure(
            command,
            error.error_class(),
            format!("could not load data from `{}`: {error}", config.data.dir.display()),
            EXIT_DATA,
        )
    })
}

/// Builds the request for a trip. The day defaults to today; `recommend --day` replaces it.
pub(crate) fn trip_request(
    command: &str,
    engine: &SeatScoreEngine,
    trip: &TripArgs,
) -> Result<TripRequest, CommandResult> {
    let direction = match trip.direction {
        Some(direction) => direction,
        None => engine
            .suggest_direction(&trip.boarding, &trip.destination)
            .map_err(|error| query_failure(command, &error))?,
    };
    Ok(TripRequest::new(&trip.boarding, &trip.destination, trip.hour, direction)
        .on_day(DayCode::today()))
}

pub(crate) fn query_failure(command: &str, error: &EngineError) -> CommandResult {
    CommandResult::failure(command, error.error_class(), error.to_string(), EXIT_QUERY)
}

pub(crate) fn to_json<T: Serialize>(command: &str, value: &T) -> CommandResult {
    match serde_json::to_string_pretty(value) {
        Ok(output) => CommandResult::report(output),
        Err(error) => {
            CommandResult::failure(command, "serialization", error.to_string(), EXIT_OUTPUT)
        }
    }
}
