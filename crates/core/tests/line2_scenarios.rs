use std::fs;
use std::path::Path;

use seatscore_core::{
    CalibrationParams, DataTier, Direction, EngineError, SeatScoreEngine, TripRequest,
    WeatherObservation,
};
use serde_json::{json, Value};
use tempfile::TempDir;

const LINE2: [&str; 43] = [
    "시청", "을지로입구", "을지로3가", "을지로4가", "동대문역사문화공원", "신당", "상왕십리",
    "왕십리", "한양대", "뚝섬", "성수", "건대입구", "구의", "강변", "잠실나루", "잠실", "잠실새내",
    "종합운동장", "삼성", "선릉", "역삼", "강남", "교대", "서초", "방배", "사당", "낙성대",
    "서울대입구", "봉천", "신림", "신대방", "구로디지털단지", "대림", "신도림", "문래", "영등포구청",
    "당산", "합정", "홍대입구", "신촌", "이대", "아현", "충정로",
];

const HOURS: [u32; 4] = [7, 8, 9, 18];
const DAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write fixture file");
}

fn write_json(dir: &Path, name: &str, value: &Value) {
    write(dir, name, &serde_json::to_string_pretty(value).expect("serialize fixture"));
}

fn write_station_table(dir: &Path) {
    let mut csv = String::from("station,cumulative_distance\n");
    for (index, name) in LINE2.iter().enumerate() {
        csv.push_str(&format!("{name}역,{:.1}\n", index as f64 * 1.2));
    }
    csv.push_str(&format!("시청,{:.1}\n", LINE2.len() as f64 * 1.2));
    write(dir, "stations.csv", &csv);
}

fn per_car_records(values: impl Fn(usize, usize) -> f64) -> Value {
    let mut records = Vec::new();
    for (index, name) in LINE2.iter().enumerate() {
        for hour in HOURS {
            for day in ["MON", "SAT"] {
                let cars: Vec<f64> = (0..10).map(|car| values(index, car)).collect();
                records.push(json!({ "station": name, "hour": hour, "day": day, "values": cars }));
            }
        }
    }
    Value::Array(records)
}

/// Every cache populated for every station at the fixture hours.
fn full_data_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path();
    write_station_table(path);

    let mut stations: Vec<&str> = LINE2.to_vec();
    stations.push("시청");
    let cumulative: Vec<f64> = (0..stations.len()).map(|hop| hop as f64 * 120.0).collect();
    let times = json!({ "stations": stations, "cumulative": cumulative });
    write_json(path, "cumulative_times.json", &times);

    let mut congestion = String::from("station,direction,hour,congestion\n");
    let mut alighting = String::from("station,hour,count\n");
    for (index, name) in LINE2.iter().enumerate() {
        for hour in HOURS {
            for direction in ["내선", "외선"] {
                let base = 90.0 + (index % 6) as f64 * 10.0;
                congestion.push_str(&format!("{name},{direction},{hour},{base:.1}\n"));
                congestion.push_str(&format!("{name},{direction},{hour},{:.1}\n", base + 20.0));
            }
            alighting.push_str(&format!("{name},{hour},{}\n", 300 + index * 10));
        }
    }
    write(path, "congestion_30min.csv", &congestion);
    write(path, "alighting.csv", &alighting);

    let mut exits = Vec::new();
    for (index, name) in LINE2.iter().enumerate() {
        for direction in ["inner", "outer"] {
            exits.push(json!({
                "station": name, "direction": direction,
                "car": index % 10 + 1, "facility": "에스컬레이터"
            }));
            exits.push(json!({
                "station": name, "direction": direction,
                "car": (index + 4) % 10 + 1, "facility": "계단"
            }));
        }
    }
    write_json(path, "fast_exit.json", &Value::Array(exits));

    write_json(
        path,
        "car_congestion.json",
        &per_car_records(|index, car| 40.0 + 6.0 * ((car + index) % 10) as f64),
    );
    write_json(
        path,
        "getoff_rate.json",
        &per_car_records(|index, car| 5.0 + ((car * 7 + index) % 10) as f64),
    );

    let mut train = Vec::new();
    let mut traffic = Vec::new();
    for (index, name) in LINE2.iter().enumerate() {
        for hour in HOURS {
            let value = 110.0 + (index % 7) as f64 * 5.0;
            train.push(json!({ "station": name, "hour": hour, "day": "MON", "value": value }));
        }
        for day in DAYS {
            let scale = if day == "SAT" || day == "SUN" { 0.8 } else { 1.0 };
            traffic.push(json!({
                "station": name, "day": day,
                "exits": { "1": 1000.0 * scale, "2": 500.0 * scale }
            }));
        }
    }
    write_json(path, "train_congestion.json", &Value::Array(train));
    write_json(path, "exit_traffic.json", &Value::Array(traffic));

    dir
}

/// Identical inputs for every station and every car.
fn uniform_data_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    write_station_table(dir.path());
    write_json(dir.path(), "car_congestion.json", &per_car_records(|_, _| 50.0));
    write_json(dir.path(), "getoff_rate.json", &per_car_records(|_, _| 10.0));
    dir
}

fn engine(dir: &TempDir) -> SeatScoreEngine {
    SeatScoreEngine::load(dir.path(), CalibrationParams::default()).expect("engine loads")
}

fn assert_ranked(cars: &[seatscore_core::CarScore]) {
    assert_eq!(cars.len(), 10);
    let mut ranks: Vec<usize> = cars.iter().map(|car| car.rank).collect();
    ranks.sort_unstable();
    assert_eq!(ranks, (1..=10).collect::<Vec<_>>());
    let mut numbers: Vec<usize> = cars.iter().map(|car| car.car).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
    assert!(cars.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn gangnam_to_city_hall_with_full_caches_reports_exact_quality() {
    let dir = full_data_dir();
    let engine = engine(&dir);

    let result = engine
        .recommend(&TripRequest::new("강남", "시청", 8, Direction::Inner))
        .expect("recommendation");

    assert_eq!(result.n_intermediate, 21);
    assert_eq!(result.intermediates.first().map(String::as_str), Some("교대"));
    assert_eq!(result.intermediates.last().map(String::as_str), Some("충정로"));
    assert_eq!(result.data_quality.getoff_rate, DataTier::Exact);
    assert_eq!(result.data_quality.car_congestion, DataTier::Exact);
    assert_eq!(result.data_quality.train_congestion, DataTier::Exact);
    assert_eq!(result.data_quality.congestion_30min, DataTier::Exact);
    assert_eq!(result.data_quality.travel_times, DataTier::Exact);
    assert_eq!(result.data_sources.len(), 8);
    assert_eq!(result.boarding_congestion, Some(130.0));

    assert_ranked(&result.scores);
    let best = &result.scores[0];
    assert_eq!(best.rank, 1);
    assert_eq!(best.car, result.best_car);
    assert_eq!(best.contributions.len(), 21);
    assert!((result.total_trip_minutes - 44.0).abs() < 1e-9);
    assert!(result.seat_times.values().all(|minutes| (0.0..=44.0).contains(minutes)));
}

#[test]
fn every_trip_yields_a_ranked_permutation_with_bounded_seat_probability() {
    let dir = full_data_dir();
    let engine = engine(&dir);
    let trips = [
        ("강남", "시청", 8, Direction::Inner),
        ("시청", "강남", 18, Direction::Outer),
        ("신도림", "잠실", 9, Direction::Outer),
        ("홍대입구", "건대입구", 3, Direction::Inner),
        ("사당", "교대", 14, Direction::Inner),
    ];

    for (from, to, hour, direction) in trips {
        let board = engine
            .compute_seatscore(&TripRequest::new(from, to, hour, direction))
            .expect("scored trip");

        assert_ranked(&board.cars);
        assert!(board.cars.iter().all(|car| (0.0..=0.95).contains(&car.p_seated)));
        assert!(board.cars.iter().all(|car| (5.0..=95.0).contains(&car.score)));

        let mean_eff = board.cars.iter().map(|car| car.load_factor_eff).sum::<f64>() / 10.0;
        assert!((mean_eff - 1.0).abs() < 1e-9, "{from}->{to}: mean {mean_eff}");
    }
}

#[test]
fn identical_inputs_tie_every_car_at_fifty() {
    let dir = uniform_data_dir();
    let engine = engine(&dir);

    let board = engine
        .compute_seatscore(&TripRequest::new("강남", "시청", 8, Direction::Inner))
        .expect("scored trip");

    assert!(board.cars.iter().all(|car| car.score == 50.0));
    let order: Vec<usize> = board.cars.iter().map(|car| car.car).collect();
    assert_eq!(order, (1..=10).collect::<Vec<_>>());
}

#[test]
fn alpha_is_anchored_and_wraps_daily() {
    let dir = full_data_dir();
    let engine = engine(&dir);
    let params = engine.get_params();

    let morning = engine.recommend(&TripRequest::new("강남", "시청", 8, Direction::Inner));
    let wrapped = engine.recommend(&TripRequest::new("강남", "시청", 32, Direction::Inner));

    let morning = morning.expect("hour 8");
    let wrapped = wrapped.expect("hour 32");
    assert_eq!(morning.alpha, params.alpha_map.morning_rush);
    assert_eq!(wrapped.alpha, morning.alpha);
}

#[test]
fn weather_observation_scales_alpha() {
    let dir = full_data_dir();
    let engine = engine(&dir);
    engine.set_weather_service(WeatherObservation { precipitation_type: 1, temperature_c: 18.0 });

    let result = engine
        .recommend(&TripRequest::new("강남", "시청", 8, Direction::Inner))
        .expect("recommendation");

    assert_eq!(result.weather_factor, 1.15);
    assert!((result.alpha - 1.4 * 1.15).abs() < 1e-12);
}

#[test]
fn larger_beta_never_raises_raw_scores() {
    let dir = full_data_dir();
    let engine = engine(&dir);
    let base = engine.get_params();
    let request = TripRequest::new("강남", "시청", 8, Direction::Inner);

    let mut previous = engine.score_with(&base.with_beta(0.0), &request, 1.0).expect("beta 0");
    for beta in [0.25, 0.5, 0.75, 1.0] {
        let board = engine.score_with(&base.with_beta(beta), &request, 1.0).expect("sweep");
        for car in 1..=10 {
            let before = previous.car(car).map(|record| record.raw_score).unwrap_or_default();
            let after = board.car(car).map(|record| record.raw_score).unwrap_or_default();
            assert!(after <= before, "beta {beta} raised car {car} from {before} to {after}");
        }
        previous = board;
    }
}

#[test]
fn boarding_equal_to_destination_is_degenerate_not_an_error() {
    let dir = full_data_dir();
    let engine = engine(&dir);

    let result = engine
        .recommend(&TripRequest::new("강남역", "강남", 8, Direction::Inner))
        .expect("degenerate trip");

    assert_eq!(result.n_intermediate, 0);
    assert_ranked(&result.scores);
    assert!(result.seat_times.values().all(|minutes| *minutes == 0.0));
    assert!(result.scores.iter().all(|car| car.contributions.is_empty()));
}

#[test]
fn adjacent_stations_still_rank_all_cars() {
    let dir = full_data_dir();
    let engine = engine(&dir);

    assert_eq!(engine.suggest_direction("강남", "역삼").ok(), Some(Direction::Outer));
    let result = engine
        .recommend(&TripRequest::new("강남", "역삼", 8, Direction::Outer))
        .expect("adjacent trip");

    assert_eq!(result.n_intermediate, 0);
    assert_ranked(&result.scores);
    assert_eq!(result.scores[0].rank, 1);
}

#[test]
fn unknown_station_is_reported_by_name() {
    let dir = full_data_dir();
    let engine = engine(&dir);

    let error = engine
        .recommend(&TripRequest::new("판교", "시청", 8, Direction::Inner))
        .expect_err("unknown station");

    assert!(matches!(error, EngineError::UnknownStation { ref name } if name == "판교"));
    assert_eq!(error.error_class(), "unknown_station");
}

#[test]
fn station_table_alone_degrades_to_fallbacks() {
    let dir = TempDir::new().expect("tempdir");
    write_station_table(dir.path());
    let engine = engine(&dir);

    let result = engine
        .recommend(&TripRequest::new("강남", "시청", 8, Direction::Inner))
        .expect("recommendation");

    assert!(result.data_sources.is_empty());
    assert_eq!(result.boarding_congestion, None);
    assert_eq!(result.data_quality.getoff_rate, DataTier::Fallback);
    assert_eq!(result.data_quality.car_congestion, DataTier::Fallback);
    assert_eq!(result.data_quality.train_congestion, DataTier::Fallback);
    assert_eq!(result.data_quality.travel_times, DataTier::Interpolated);
    assert_ranked(&result.scores);
}

#[test]
fn reload_picks_up_new_caches() {
    let dir = TempDir::new().expect("tempdir");
    write_station_table(dir.path());
    let engine = engine(&dir);
    let request = TripRequest::new("강남", "시청", 8, Direction::Inner);

    let before = engine.recommend(&request).expect("before reload");
    assert_eq!(before.data_quality.getoff_rate, DataTier::Fallback);

    write_json(dir.path(), "getoff_rate.json", &per_car_records(|_, car| car as f64 + 1.0));
    engine.load_all().expect("reload");

    let after = engine.recommend(&request).expect("after reload");
    assert_eq!(after.data_quality.getoff_rate, DataTier::Exact);
    assert_eq!(after.data_sources, vec!["getoff_rate"]);
}

#[test]
fn missing_station_table_fails_engine_construction() {
    let dir = TempDir::new().expect("tempdir");

    let error = SeatScoreEngine::load(dir.path(), CalibrationParams::default())
        .expect_err("station table is required");

    assert_eq!(error.error_class(), "data_missing");
}
