use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::data::caches::{
    CacheKind, DataCaches, FacilityRecord, PlatformLayout, StationTable, TravelTimeTable,
};
use crate::domain::station::{normalize_station_name, StationNetwork};
use crate::domain::trip::{DayCode, Direction};
use crate::errors::LoadError;

pub const STATION_TABLE_FILE: &str = "stations.csv";

/// Station table plus every optional cache found in one data directory.
#[derive(Clone, Debug)]
pub struct LoadedData {
    pub network: StationNetwork,
    pub caches: DataCaches,
}

/// Reads a data directory. Only the station table is mandatory; an optional cache that is
/// missing or malformed is logged and left absent.
pub fn load_data_dir(dir: &Path) -> Result<LoadedData, LoadError> {
    let network = load_station_table(&dir.join(STATION_TABLE_FILE))?;

    let caches = DataCaches {
        travel_times: load_optional(dir, CacheKind::TravelTimes, load_travel_times),
        congestion_30min: load_optional(dir, CacheKind::Congestion30Min, load_congestion_30min),
        alighting: load_optional(dir, CacheKind::Alighting, load_alighting),
        platform: load_optional(dir, CacheKind::FastExit, load_fast_exit),
        car_congestion: load_optional(dir, CacheKind::CarCongestion, load_per_car),
        getoff_rate: load_optional(dir, CacheKind::GetoffRate, load_per_car),
        train_congestion: load_optional(dir, CacheKind::TrainCongestion, load_train_congestion),
        dow_factors: load_optional(dir, CacheKind::ExitTraffic, load_exit_traffic),
    };

    for kind in CacheKind::ALL {
        if let Some(entries) = caches.entry_count(kind) {
            info!(
                event_name = "seatscore.load.cache_loaded",
                cache = kind.as_str(),
                entries,
                "cache loaded"
            );
        }
    }
    info!(
        event_name = "seatscore.load.completed",
        data_dir = %dir.display(),
        stations = network.len(),
        sources = caches.data_sources().len(),
        "data directory loaded"
    );

    Ok(LoadedData { network, caches })
}

#[derive(Debug, Deserialize)]
struct StationRow {
    station: String,
    cumulative_distance: f64,
}

pub fn load_station_table(path: &Path) -> Result<StationNetwork, LoadError> {
    if !path.exists() {
        return Err(LoadError::MissingStationTable(path.to_path_buf()));
    }

    let rows: Vec<StationRow> = read_csv(path)?;
    let rows: Vec<(String, f64)> = rows
        .into_iter()
        .filter(|row| !row.station.trim().is_empty())
        .map(|row| (row.station, row.cumulative_distance))
        .collect();

    let network = StationNetwork::new(rows)?;
    if network.is_empty() {
        return Err(LoadError::EmptyStationTable(path.to_path_buf()));
    }
    Ok(network)
}

fn load_optional<T>(
    dir: &Path,
    kind: CacheKind,
    parse: fn(&Path) -> Result<Option<T>, LoadError>,
) -> Option<T> {
    let path = dir.join(kind.file_name());
    if !path.exists() {
        info!(
            event_name = "seatscore.load.cache_missing",
            cache = kind.as_str(),
            path = %path.display(),
            "optional cache not found; falling back"
        );
        return None;
    }

    match parse(&path) {
        Ok(Some(cache)) => Some(cache),
        Ok(None) => {
            warn!(
                event_name = "seatscore.load.cache_empty",
                cache = kind.as_str(),
                path = %path.display(),
                "optional cache has no usable entries; falling back"
            );
            None
        }
        Err(error) => {
            warn!(
                event_name = "seatscore.load.cache_invalid",
                cache = kind.as_str(),
                error_class = error.error_class(),
                error = %error,
                "optional cache could not be read; falling back"
            );
            None
        }
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let csv_error = |source| LoadError::Csv { path: path.to_path_buf(), source };
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    reader.into_deserialize().collect::<Result<Vec<T>, _>>().map_err(csv_error)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| LoadError::ReadFile { path: path.to_path_buf(), source })?;
    serde_json::from_str(raw.trim_start_matches('\u{feff}'))
        .map_err(|source| LoadError::Json { path: path.to_path_buf(), source })
}

fn non_empty<T>(value: T, len: usize) -> Option<T> {
    (len > 0).then_some(value)
}

#[derive(Debug, Deserialize)]
struct CumulativeTimesFile {
    stations: Vec<String>,
    cumulative: Vec<f64>,
}

fn load_travel_times(path: &Path) -> Result<Option<TravelTimeTable>, LoadError> {
    let file: CumulativeTimesFile = read_json(path)?;
    let stations = file.stations.iter().map(|name| normalize_station_name(name)).collect();
    Ok(TravelTimeTable::new(stations, file.cumulative))
}

#[derive(Debug, Deserialize)]
struct CongestionRow {
    station: String,
    direction: String,
    hour: u32,
    congestion: f64,
}

/// Repeated `(station, direction, hour)` keys come from separate half-hour slots; each new
/// slot is averaged pairwise into the running value.
fn load_congestion_30min(
    path: &Path,
) -> Result<Option<StationTable<(Direction, u32), f64>>, LoadError> {
    let rows: Vec<CongestionRow> = read_csv(path)?;
    let mut table = StationTable::default();

    for row in rows {
        let station = normalize_station_name(&row.station);
        let Some(direction) = Direction::parse(&row.direction) else {
            continue;
        };
        if station.is_empty() || !row.congestion.is_finite() {
            continue;
        }

        let key = (direction, row.hour);
        match table.get_mut(&station, &key) {
            Some(value) => *value = (*value + row.congestion) / 2.0,
            None => {
                table.insert(station, key, row.congestion);
            }
        }
    }

    let len = table.len();
    Ok(non_empty(table, len))
}

#[derive(Debug, Deserialize)]
struct AlightingRow {
    station: String,
    hour: u32,
    count: f64,
}

fn load_alighting(path: &Path) -> Result<Option<StationTable<u32, f64>>, LoadError> {
    let rows: Vec<AlightingRow> = read_csv(path)?;
    let mut sums: BTreeMap<(String, u32), (f64, usize)> = BTreeMap::new();

    for row in rows {
        let station = normalize_station_name(&row.station);
        if station.is_empty() || !row.count.is_finite() {
            continue;
        }
        let slot = sums.entry((station, row.hour)).or_insert((0.0, 0));
        slot.0 += row.count;
        slot.1 += 1;
    }

    let mut table = StationTable::default();
    for ((station, hour), (sum, count)) in sums {
        table.insert(station, hour, sum / count as f64);
    }
    let len = table.len();
    Ok(non_empty(table, len))
}

#[derive(Debug, Deserialize)]
struct FastExitRecord {
    station: String,
    direction: String,
    car: usize,
    facility: String,
}

fn load_fast_exit(path: &Path) -> Result<Option<PlatformLayout>, LoadError> {
    let records: Vec<FastExitRecord> = read_json(path)?;
    let mut layout = PlatformLayout::default();

    for record in records {
        let Some(direction) = Direction::parse(&record.direction) else {
            continue;
        };
        let station = normalize_station_name(&record.station);
        if station.is_empty() {
            continue;
        }
        layout.push(
            station,
            direction,
            FacilityRecord { car: record.car, facility: record.facility.trim().to_string() },
        );
    }

    let len = layout.len();
    Ok(non_empty(layout, len))
}

#[derive(Debug, Deserialize)]
struct PerCarRecord {
    station: String,
    hour: u32,
    day: String,
    values: Vec<f64>,
}

/// Shared by the per-car boarding congestion and per-car alighting fraction files. Rows with
/// the wrong number of cars are kept and treated as misses at lookup.
fn load_per_car(
    path: &Path,
) -> Result<Option<StationTable<(u32, DayCode), Vec<f64>>>, LoadError> {
    let records: Vec<PerCarRecord> = read_json(path)?;
    let mut table = StationTable::default();

    for record in records {
        let Some(day) = DayCode::parse(&record.day) else {
            continue;
        };
        let station = normalize_station_name(&record.station);
        if station.is_empty() {
            continue;
        }
        table.insert(station, (record.hour, day), record.values);
    }

    let len = table.len();
    Ok(non_empty(table, len))
}

#[derive(Debug, Deserialize)]
struct TrainCongestionRecord {
    station: String,
    hour: u32,
    day: String,
    value: f64,
}

fn load_train_congestion(
    path: &Path,
) -> Result<Option<StationTable<(u32, DayCode), f64>>, LoadError> {
    let records: Vec<TrainCongestionRecord> = read_json(path)?;
    let mut table = StationTable::default();

    for record in records {
        let Some(day) = DayCode::parse(&record.day) else {
            continue;
        };
        let station = normalize_station_name(&record.station);
        if station.is_empty() || !record.value.is_finite() {
            continue;
        }
        table.insert(station, (record.hour, day), record.value);
    }

    let len = table.len();
    Ok(non_empty(table, len))
}

#[derive(Debug, Deserialize)]
struct ExitTrafficRecord {
    station: String,
    day: String,
    exits: HashMap<String, f64>,
}

fn load_exit_traffic(path: &Path) -> Result<Option<StationTable<DayCode, f64>>, LoadError> {
    let records: Vec<ExitTrafficRecord> = read_json(path)?;
    let mut totals: BTreeMap<String, BTreeMap<DayCode, f64>> = BTreeMap::new();

    for record in records {
        let Some(day) = DayCode::parse(&record.day) else {
            continue;
        };
        let station = normalize_station_name(&record.station);
        if station.is_empty() {
            continue;
        }
        let total: f64 = record.exits.values().filter(|count| count.is_finite()).sum();
        *totals.entry(station).or_default().entry(day).or_insert(0.0) += total;
    }

    let factors = build_dow_factors(totals);
    let len = factors.len();
    Ok(non_empty(factors, len))
}

/// Ratio of each day's exit traffic to the station's weekday average. Stations without
/// positive weekday traffic get no factors.
pub fn build_dow_factors(
    totals: BTreeMap<String, BTreeMap<DayCode, f64>>,
) -> StationTable<DayCode, f64> {
    let mut factors = StationTable::default();

    for (station, by_day) in totals {
        let weekday_totals: Vec<f64> =
            DayCode::WEEKDAYS.iter().filter_map(|day| by_day.get(day).copied()).collect();
        if weekday_totals.is_empty() {
            continue;
        }
        let weekday_average = weekday_totals.iter().sum::<f64>() / weekday_totals.len() as f64;
        if weekday_average <= 0.0 {
            continue;
        }

        for (day, total) in by_day {
            factors.insert(station.clone(), day, total / weekday_average);
        }
    }

    factors
}

/// Paths `load_data_dir` reads, for readiness reports.
pub fn expected_files(dir: &Path) -> Vec<(&'static str, PathBuf, bool)> {
    let mut files = vec![("stations", dir.join(STATION_TABLE_FILE), true)];
    files.extend(
        CacheKind::ALL.into_iter().map(|kind| (kind.as_str(), dir.join(kind.file_name()), false)),
    );
    files
}
