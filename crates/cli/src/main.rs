use std::process::ExitCode;

use clap::Parser;
use seatscore_cli::Cli;
use seatscore_core::config::SeatScoreConfig;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &SeatScoreConfig) {
    use seatscore_core::config::LogFormat::*;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Commands report config errors themselves; logging falls back to defaults here.
    let config = SeatScoreConfig::load(cli.load_options()).unwrap_or_default();
    init_logging(&config);

    seatscore_cli::run(&cli)
}
