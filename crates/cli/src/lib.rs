pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use seatscore_core::analysis::DEFAULT_STABILITY_TRIALS;
use seatscore_core::config::{ConfigOverrides, LoadOptions};
use seatscore_core::{DayCode, SweptParameter};
use tracing::debug;

use crate::commands::{CommandResult, TripArgs};

#[derive(Debug, Parser)]
#[command(
    name = "seatscore",
    about = "Rank Line 2 cars by expected seating utility",
    long_about = "Score the ten cars of a Seoul Line 2 train for a trip, inspect how calibration \
                  moves the ranking, and check data readiness.",
    after_help = "Examples:\n  seatscore recommend --from 강남 --to 시청 --hour 8\n  \
                  seatscore sensitivity --param beta --from 홍대입구 --to 잠실 --hour 18 --json\n  \
                  seatscore doctor"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a seatscore.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the data directory")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override the calibration beta")]
    beta: Option<f64>,
    #[arg(long, global = true, help = "Override the calibration gamma")]
    gamma: Option<f64>,
    #[arg(long, global = true, help = "Override the calibration delta")]
    delta: Option<f64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Score all ten cars for one trip and recommend the best")]
    Recommend {
        #[command(flatten)]
        trip: TripArgs,
        #[arg(long, help = "Day code (MON..SUN) for day-of-week adjustment")]
        day: Option<DayCode>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Sweep one calibration parameter and report per-car scores")]
    Sensitivity {
        #[arg(long = "param", help = "Parameter to sweep: beta|gamma|delta")]
        parameter: SweptParameter,
        #[command(flatten)]
        trip: TripArgs,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Perturb the time-of-day weight and report how stable the ranking is")]
    Stability {
        #[command(flatten)]
        trip: TripArgs,
        #[arg(long, default_value_t = DEFAULT_STABILITY_TRIALS, help = "Number of perturbations")]
        trials: usize,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and report which data files are loaded")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                data_dir: self.data_dir.clone(),
                log_level: self.log_level.clone(),
                beta: self.beta,
                gamma: self.gamma,
                delta: self.delta,
            },
        }
    }
}

pub fn execute(cli: &Cli) -> CommandResult {
    let options = cli.load_options();

    match &cli.command {
        Command::Recommend { trip, day, json } => {
            commands::recommend::run(&options, trip, *day, *json)
        }
        Command::Sensitivity { parameter, trip, json } => {
            commands::sensitivity::run(&options, trip, *parameter, *json)
        }
        Command::Stability { trip, trials, json } => {
            commands::stability::run(&options, trip, *trials, *json)
        }
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, *json),
    }
}

pub fn run(cli: &Cli) -> ExitCode {
    let result = execute(cli);
    debug!(
        event_name = "seatscore.cli.command_finished",
        exit_code = result.exit_code,
        "command finished"
    );

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
