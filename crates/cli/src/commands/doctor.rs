use std::path::Path;

use seatscore_core::config::{LoadOptions, SeatScoreConfig};
use seatscore_core::data::loader::expected_files;
use seatscore_core::{load_data_dir, CacheKind, LoadedData};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_DATA};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: impl Into<String>, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name: name.into(), status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Checks configuration and data readiness. Missing optional caches are reported as skipped
/// and do not fail the run.
pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let (report, exit_code) = build_report(options);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> (DoctorReport, u8) {
    let mut checks = Vec::new();
    let mut exit_code = 0;

    match SeatScoreConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            let data_checks = check_data_dir(&config.data.dir);
            if data_checks.iter().any(|check| check.status == CheckStatus::Fail) {
                exit_code = EXIT_DATA;
            }
            checks.extend(data_checks);
        }
        Err(error) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Fail,
                error.to_string(),
            ));
            checks.push(DoctorCheck::new(
                "station_table",
                CheckStatus::Skipped,
                "skipped because configuration did not load",
            ));
            exit_code = EXIT_CONFIG;
        }
    }

    let healthy = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if healthy { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if healthy {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    (DoctorReport { overall_status, summary, checks }, exit_code)
}

fn check_data_dir(dir: &Path) -> Vec<DoctorCheck> {
    if !dir.is_dir() {
        return vec![DoctorCheck::new(
            "data_dir",
            CheckStatus::Fail,
            format!("`{}` is not a directory", dir.display()),
        )];
    }

    let mut checks =
        vec![DoctorCheck::new("data_dir", CheckStatus::Pass, format!("using `{}`", dir.display()))];

    let loaded = match load_data_dir(dir) {
        Ok(loaded) => {
            checks.push(DoctorCheck::new(
                "station_table",
                CheckStatus::Pass,
                format!("{} stations", loaded.network.len()),
            ));
            loaded
        }
        Err(error) => {
            checks.push(DoctorCheck::new("station_table", CheckStatus::Fail, error.to_string()));
            return checks;
        }
    };

    for (name, path, required) in expected_files(dir) {
        if required {
            continue;
        }
        checks.push(check_cache(&loaded, name, &path));
    }

    checks
}

fn check_cache(loaded: &LoadedData, name: &str, path: &Path) -> DoctorCheck {
    let entries = CacheKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == name)
        .and_then(|kind| loaded.caches.entry_count(kind));

    match (path.exists(), entries) {
        (false, _) => DoctorCheck::new(
            name,
            CheckStatus::Skipped,
            format!("`{}` not present, fallbacks apply", path.display()),
        ),
        (true, Some(entries)) => {
            DoctorCheck::new(name, CheckStatus::Pass, format!("{entries} entries"))
        }
        (true, None) => DoctorCheck::new(
            name,
            CheckStatus::Fail,
            format!("`{}` exists but could not be parsed", path.display()),
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
