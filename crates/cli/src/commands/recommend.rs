use seatscore_core::config::LoadOptions;
use seatscore_core::{DayCode, Recommendation};

use crate::commands::{load_engine, query_failure, to_json, trip_request, CommandResult, TripArgs};

pub fn run(
    options: &LoadOptions,
    trip: &TripArgs,
    day: Option<DayCode>,
    json: bool,
) -> CommandResult {
    let engine = match load_engine("recommend", options) {
        Ok(engine) => engine,
        Err(failure) => return failure,
    };
    let mut request = match trip_request("recommend", &engine, trip) {
        Ok(request) => request,
        Err(failure) => return failure,
    };
    if let Some(day) = day {
        request = request.on_day(day);
    }

    match engine.recommend(&request) {
        Ok(recommendation) if json => to_json("recommend", &recommendation),
        Ok(recommendation) => CommandResult::report(render_human(&recommendation)),
        Err(error) => query_failure("recommend", &error),
    }
}

fn render_human(result: &Recommendation) -> String {
    let day = result.day.map(|day| format!(", {day}")).unwrap_or_default();
    let mut lines = vec![
        format!(
            "{} -> {} ({}, {:02}:00{day}, {} intermediate stations)",
            result.boarding,
            result.destination,
            result.direction,
            result.hour,
            result.n_intermediate
        ),
        format!(
            "best car {} ({:.1}), worst car {} ({:.1}), spread {:.1}",
            result.best_car,
            result.best_score,
            result.worst_car,
            result.worst_score,
            result.score_spread
        ),
        format!(
            "alpha {:.3} (weather {:.2}), trip {:.1} min",
            result.alpha, result.weather_factor, result.total_trip_minutes
        ),
        "rank  car  score  p_seated  load  seat_min".to_string(),
    ];

    for record in &result.scores {
        let seat_minutes = result.seat_times.get(&record.car).copied().unwrap_or_default();
        lines.push(format!(
            "{:>4}  {:>3}  {:>5.1}  {:>8.3}  {:>4.2}  {:>8.1}",
            record.rank, record.car, record.score, record.p_seated, record.load_factor, seat_minutes
        ));
    }

    let quality = &result.data_quality;
    lines.push(format!(
        "data quality: getoff_rate={} car_congestion={} train_congestion={} \
         congestion_30min={} travel_times={}",
        quality.getoff_rate.as_str(),
        quality.car_congestion.as_str(),
        quality.train_congestion.as_str(),
        quality.congestion_30min.as_str(),
        quality.travel_times.as_str(),
    ));
    let sources = if result.data_sources.is_empty() {
        "none".to_string()
    } else {
        result.data_sources.join(", ")
    };
    lines.push(format!("data sources: {sources}"));

    lines.join("\n")
}
