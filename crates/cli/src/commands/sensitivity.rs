use seatscore_core::config::LoadOptions;
use seatscore_core::{sensitivity_sweep, SensitivityReport, SweptParameter};

use crate::commands::{load_engine, query_failure, to_json, trip_request, CommandResult, TripArgs};

pub fn run(
    options: &LoadOptions,
    trip: &TripArgs,
    parameter: SweptParameter,
    json: bool,
) -> CommandResult {
    let engine = match load_engine("sensitivity", options) {
        Ok(engine) => engine,
        Err(failure) => return failure,
    };
    let request = match trip_request("sensitivity", &engine, trip) {
        Ok(request) => request,
        Err(failure) => return failure,
    };

    match sensitivity_sweep(&engine, &request, parameter) {
        Ok(report) if json => to_json("sensitivity", &report),
        Ok(report) => CommandResult::report(render_human(&report)),
        Err(error) => query_failure("sensitivity", &error),
    }
}

fn render_human(report: &SensitivityReport) -> String {
    let mut lines = vec![format!(
        "{} sweep for {} -> {} ({}, {:02}:00)",
        report.parameter, report.boarding, report.destination, report.direction, report.hour
    )];

    let header: Vec<String> = (1..=10).map(|car| format!("{car:>5}")).collect();
    lines.push(format!("{:>6}  best  {}", report.parameter.as_str(), header.join(" ")));

    let best = report.best_cars();
    for (chunk, (value, best_car)) in report.points.chunks(10).zip(best) {
        let scores: Vec<String> =
            chunk.iter().map(|point| format!("{:>5.1}", point.score)).collect();
        lines.push(format!("{value:>6.2}  {best_car:>4}  {}", scores.join(" ")));
    }

    lines.join("\n")
}
