use seatscore_core::config::LoadOptions;
use seatscore_core::{rank_stability, StabilityReport};

use crate::commands::{load_engine, query_failure, to_json, trip_request, CommandResult, TripArgs};

pub fn run(options: &LoadOptions, trip: &TripArgs, trials: usize, json: bool) -> CommandResult {
    let engine = match load_engine("stability", options) {
        Ok(engine) => engine,
        Err(failure) => return failure,
    };
    let request = match trip_request("stability", &engine, trip) {
        Ok(request) => request,
        Err(failure) => return failure,
    };

    match rank_stability(&engine, &request, trials) {
        Ok(report) if json => to_json("stability", &report),
        Ok(report) => CommandResult::report(render_human(&report)),
        Err(error) => query_failure("stability", &error),
    }
}

fn render_human(report: &StabilityReport) -> String {
    let verdict = if report.best_car_stable { "stable" } else { "unstable" };
    let mut lines = vec![
        format!(
            "rank stability for {} -> {} ({}, {:02}:00), {} alpha perturbations",
            report.boarding,
            report.destination,
            report.direction,
            report.hour,
            report.n_perturbations
        ),
        format!(
            "best car {} is {verdict} (changed in {:.1}% of trials)",
            report.base_best_car, report.best_car_change_pct
        ),
        "base_rank  car  base_score  rank_range  changes  avg_score  score_std".to_string(),
    ];

    for car in &report.cars {
        lines.push(format!(
            "{:>9}  {:>3}  {:>10.1}  {:>5}..{:<4}  {:>7}  {:>9.1}  {:>9.2}",
            car.base_rank,
            car.car,
            car.base_score,
            car.min_rank,
            car.max_rank,
            car.rank_changes,
            car.avg_score,
            car.score_std
        ));
    }

    lines.join("\n")
}
