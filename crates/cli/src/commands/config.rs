use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use seatscore_core::config::{LoadOptions, SeatScoreConfig, DEFAULT_CONFIG_FILE};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match SeatScoreConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                error.error_class(),
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let overrides = &options.overrides;
    let source = |key_path: &str, cli_flag: Option<&str>, env_keys: &[&str]| {
        field_source(
            key_path,
            cli_flag,
            env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        )
    };
    let flag = |is_set: bool, name: &'static str| is_set.then_some(name);

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];

    lines.push(render_line(
        "data.dir",
        &config.data.dir.display().to_string(),
        source(
            "data.dir",
            flag(overrides.data_dir.is_some(), "--data-dir"),
            &["SEATSCORE_DATA_DIR"],
        ),
    ));

    let calibration = &config.calibration;
    lines.push(render_line(
        "calibration.beta",
        &calibration.beta.to_string(),
        source(
            "calibration.beta",
            flag(overrides.beta.is_some(), "--beta"),
            &["SEATSCORE_BETA"],
        ),
    ));
    lines.push(render_line(
        "calibration.gamma",
        &calibration.gamma.to_string(),
        source(
            "calibration.gamma",
            flag(overrides.gamma.is_some(), "--gamma"),
            &["SEATSCORE_GAMMA"],
        ),
    ));
    lines.push(render_line(
        "calibration.delta",
        &calibration.delta.to_string(),
        source(
            "calibration.delta",
            flag(overrides.delta.is_some(), "--delta"),
            &["SEATSCORE_DELTA"],
        ),
    ));

    let weights = &calibration.facility_weights;
    for (name, value) in [
        ("escalator", weights.escalator),
        ("elevator", weights.elevator),
        ("stairs", weights.stairs),
    ] {
        let key = format!("calibration.facility_weights.{name}");
        lines.push(render_line(&key, &value.to_string(), source(&key, None, &[])));
    }

    let alpha = &calibration.alpha_map;
    for (name, value) in [
        ("morning_rush", alpha.morning_rush),
        ("evening_rush", alpha.evening_rush),
        ("midday", alpha.midday),
        ("evening", alpha.evening),
        ("night", alpha.night),
        ("early", alpha.early),
    ] {
        let key = format!("calibration.alpha_map.{name}");
        lines.push(render_line(&key, &value.to_string(), source(&key, None, &[])));
    }

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source(
            "logging.level",
            flag(overrides.log_level.is_some(), "--log-level"),
            &["SEATSCORE_LOGGING_LEVEL", "SEATSCORE_LOG_LEVEL"],
        ),
    ));
    lines.push(render_line(
        "logging.format",
        config.logging.format.as_str(),
        source(
            "logging.format",
            None,
            &["SEATSCORE_LOGGING_FORMAT", "SEATSCORE_LOG_FORMAT"],
        ),
    ));

    CommandResult::report(lines.join("\n"))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    cli_flag: Option<&str>,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = cli_flag {
        return format!("cli ({flag})");
    }

    // Blank variables are ignored by the loader.
    let env_key =
        env_keys.iter().find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
