use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use crate::domain::trip::{DayCode, Direction};
use crate::domain::TOTAL_CARS;

/// Every optional input the loader knows about, in load order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    TravelTimes,
    Congestion30Min,
    Alighting,
    FastExit,
    CarCongestion,
    GetoffRate,
    TrainCongestion,
    ExitTraffic,
}

impl CacheKind {
    pub const ALL: [CacheKind; 8] = [
        Self::TravelTimes,
        Self::Congestion30Min,
        Self::Alighting,
        Self::FastExit,
        Self::CarCongestion,
        Self::GetoffRate,
        Self::TrainCongestion,
        Self::ExitTraffic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TravelTimes => "travel_times",
            Self::Congestion30Min => "congestion_30min",
            Self::Alighting => "alighting",
            Self::FastExit => "fast_exit",
            Self::CarCongestion => "car_congestion",
            Self::GetoffRate => "getoff_rate",
            Self::TrainCongestion => "train_congestion",
            Self::ExitTraffic => "exit_traffic",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::TravelTimes => "cumulative_times.json",
            Self::Congestion30Min => "congestion_30min.csv",
            Self::Alighting => "alighting.csv",
            Self::FastExit => "fast_exit.json",
            Self::CarCongestion => "car_congestion.json",
            Self::GetoffRate => "getoff_rate.json",
            Self::TrainCongestion => "train_congestion.json",
            Self::ExitTraffic => "exit_traffic.json",
        }
    }
}

/// Two-level map keyed by normalized station name, so lookups borrow `&str` instead of
/// allocating a composite key.
#[derive(Clone, Debug)]
pub struct StationTable<K, V> {
    entries: HashMap<String, HashMap<K, V>>,
    len: usize,
}

impl<K, V> Default for StationTable<K, V> {
    fn default() -> Self {
        Self { entries: HashMap::new(), len: 0 }
    }
}

impl<K: Eq + Hash, V> StationTable<K, V> {
    pub fn get(&self, station: &str, key: &K) -> Option<&V> {
        self.entries.get(station).and_then(|inner| inner.get(key))
    }

    pub fn get_mut(&mut self, station: &str, key: &K) -> Option<&mut V> {
        self.entries.get_mut(station).and_then(|inner| inner.get_mut(key))
    }

    pub fn insert(&mut self, station: String, key: K, value: V) -> Option<V> {
        let previous = self.entries.entry(station).or_default().insert(key, value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn for_station(&self, station: &str) -> Option<&HashMap<K, V>> {
        self.entries.get(station)
    }

    pub fn stations(&self) -> impl Iterator<Item = (&String, &HashMap<K, V>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Real cumulative travel time in seconds, in inner order. The last entry is the full loop.
#[derive(Clone, Debug, PartialEq)]
pub struct TravelTimeTable {
    positions: HashMap<String, usize>,
    cumulative: Vec<f64>,
}

impl TravelTimeTable {
    /// Returns `None` when the lists disagree in length or the loop time is not positive.
    pub fn new(stations: Vec<String>, cumulative: Vec<f64>) -> Option<Self> {
        if stations.is_empty() || stations.len() != cumulative.len() {
            return None;
        }
        let loop_seconds = cumulative.last().copied().unwrap_or_default();
        if !loop_seconds.is_finite() || loop_seconds <= 0.0 {
            return None;
        }

        let mut positions = HashMap::with_capacity(stations.len());
        for (index, station) in stations.into_iter().enumerate() {
            positions.entry(station).or_insert(index);
        }
        Some(Self { positions, cumulative })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn loop_seconds(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or_default()
    }

    /// Seconds from `from` to `to`, following `direction`, or the shorter way round when no
    /// direction is given.
    pub fn seconds(&self, from: &str, to: &str, direction: Option<Direction>) -> Option<f64> {
        let from = self.cumulative[*self.positions.get(from)?];
        let to = self.cumulative[*self.positions.get(to)?];
        let loop_seconds = self.loop_seconds();

        let inner = (to - from).rem_euclid(loop_seconds);
        let outer = loop_seconds - inner;
        Some(match direction {
            Some(Direction::Inner) => inner,
            Some(Direction::Outer) => outer,
            None => inner.min(outer),
        })
    }
}

/// One fast-exit record: a platform facility reachable from a car door.
#[derive(Clone, Debug, PartialEq)]
pub struct FacilityRecord {
    pub car: usize,
    pub facility: String,
}

/// Per-station, per-direction facility layout.
#[derive(Clone, Debug, Default)]
pub struct PlatformLayout {
    records: StationTable<Direction, Vec<FacilityRecord>>,
}

impl PlatformLayout {
    pub fn push(&mut self, station: String, direction: Direction, record: FacilityRecord) {
        match self.records.get_mut(&station, &direction) {
            Some(records) => records.push(record),
            None => {
                self.records.insert(station, direction, vec![record]);
            }
        }
    }

    pub fn records(&self, station: &str, direction: Direction) -> Option<&[FacilityRecord]> {
        self.records.get(station, &direction).map(Vec::as_slice)
    }

    /// Number of facility records next to each car.
    pub fn exit_counts(&self, station: &str, direction: Direction) -> Option<[usize; TOTAL_CARS]> {
        let records = self.records(station, direction)?;
        let mut counts = [0usize; TOTAL_CARS];
        for record in records {
            if (1..=TOTAL_CARS).contains(&record.car) {
                counts[record.car - 1] += 1;
            }
        }
        Some(counts)
    }

    /// Station-direction pairs with at least one record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.records.stations().flat_map(|(_, inner)| inner.values()).map(Vec::len).sum()
    }
}

/// Every optional cache the resolver reads. `None` means the source was absent or unreadable.
#[derive(Clone, Debug, Default)]
pub struct DataCaches {
    pub travel_times: Option<TravelTimeTable>,
    /// `(station) -> (direction, hour) -> congestion %`.
    pub congestion_30min: Option<StationTable<(Direction, u32), f64>>,
    /// `(station) -> hour -> mean alighting count`.
    pub alighting: Option<StationTable<u32, f64>>,
    pub platform: Option<PlatformLayout>,
    pub car_congestion: Option<StationTable<(u32, DayCode), Vec<f64>>>,
    pub getoff_rate: Option<StationTable<(u32, DayCode), Vec<f64>>>,
    pub train_congestion: Option<StationTable<(u32, DayCode), f64>>,
    /// Exit-traffic ratio of a day to the station's weekday average.
    pub dow_factors: Option<StationTable<DayCode, f64>>,
}

impl DataCaches {
    pub fn entry_count(&self, kind: CacheKind) -> Option<usize> {
        match kind {
            CacheKind::TravelTimes => self.travel_times.as_ref().map(TravelTimeTable::len),
            CacheKind::Congestion30Min => self.congestion_30min.as_ref().map(StationTable::len),
            CacheKind::Alighting => self.alighting.as_ref().map(StationTable::len),
            CacheKind::FastExit => self.platform.as_ref().map(PlatformLayout::record_count),
            CacheKind::CarCongestion => self.car_congestion.as_ref().map(StationTable::len),
            CacheKind::GetoffRate => self.getoff_rate.as_ref().map(StationTable::len),
            CacheKind::TrainCongestion => self.train_congestion.as_ref().map(StationTable::len),
            CacheKind::ExitTraffic => self.dow_factors.as_ref().map(StationTable::len),
        }
    }

    /// Names of the caches that are loaded, in load order.
    pub fn data_sources(&self) -> Vec<&'static str> {
        CacheKind::ALL
            .into_iter()
            .filter(|kind| self.entry_count(*kind).is_some())
            .map(|kind| kind.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CacheKind, DataCaches, FacilityRecord, PlatformLayout, StationTable, TravelTimeTable,
    };
    use crate::domain::trip::Direction;

    fn table() -> TravelTimeTable {
        TravelTimeTable::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
            vec![0.0, 120.0, 300.0, 600.0],
        )
        .expect("travel table")
    }

    #[test]
    fn travel_seconds_follow_direction_and_wrap() {
        let table = table();

        assert_eq!(table.seconds("a", "c", Some(Direction::Inner)), Some(300.0));
        assert_eq!(table.seconds("a", "c", Some(Direction::Outer)), Some(300.0));
        assert_eq!(table.seconds("c", "b", Some(Direction::Inner)), Some(420.0));
        assert_eq!(table.seconds("c", "b", Some(Direction::Outer)), Some(180.0));
        assert_eq!(table.seconds("c", "b", None), Some(180.0));
        assert_eq!(table.seconds("a", "z", None), None);
    }

    #[test]
    fn travel_table_rejects_mismatched_lists() {
        assert!(TravelTimeTable::new(vec!["a".to_string()], vec![]).is_none());
        assert!(TravelTimeTable::new(vec!["a".to_string()], vec![0.0]).is_none());
    }

    #[test]
    fn station_table_counts_distinct_keys() {
        let mut table = StationTable::default();
        table.insert("강남".to_string(), 8u32, 1.0);
        table.insert("강남".to_string(), 9u32, 2.0);
        table.insert("강남".to_string(), 8u32, 3.0);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("강남", &8), Some(&3.0));
        assert_eq!(table.get("역삼", &8), None);
    }

    #[test]
    fn exit_counts_ignore_out_of_range_cars() {
        let mut layout = PlatformLayout::default();
        for car in [1, 1, 4, 11] {
            layout.push(
                "강남".to_string(),
                Direction::Inner,
                FacilityRecord { car, facility: "계단".to_string() },
            );
        }

        let counts = layout.exit_counts("강남", Direction::Inner).expect("counts");
        assert_eq!(counts[0], 2);
        assert_eq!(counts[3], 1);
        assert_eq!(counts.iter().sum::<usize>(), 3);
        assert!(layout.exit_counts("강남", Direction::Outer).is_none());
        assert_eq!(layout.record_count(), 4);
    }

    #[test]
    fn data_sources_list_loaded_caches_in_order() {
        let caches = DataCaches {
            alighting: Some(StationTable::default()),
            travel_times: Some(table()),
            ..DataCaches::default()
        };

        assert_eq!(caches.data_sources(), vec!["travel_times", "alighting"]);
        assert_eq!(caches.entry_count(CacheKind::TravelTimes), Some(4));
        assert_eq!(caches.entry_count(CacheKind::GetoffRate), None);
    }
}
