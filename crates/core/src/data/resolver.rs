//! Best-available lookups for every quantity the scoring recurrence needs.
//!
//! Each quantity is an ordered list of strategies, each a pure `key -> Option<value>` lookup,
//! composed by [`first_available`]. Nothing here fails: the last resort is always a constant.

use serde::Serialize;

use crate::calibration::CalibrationParams;
use crate::data::caches::DataCaches;
use crate::domain::station::StationNetwork;
use crate::domain::trip::{DayCode, Direction};
use crate::domain::{MAX_CAPACITY, SEATS_PER_CAR, TOTAL_CARS};

/// Global share of alighting riders per car, used when a station has no per-car data.
pub const EMPIRICAL_CAR_DIST: [f64; TOTAL_CARS] =
    [0.088, 0.102, 0.111, 0.116, 0.111, 0.104, 0.109, 0.099, 0.085, 0.074];

/// Rush hours the train-level congestion source is known to cover.
pub const RUSH_HOURS: [u32; 6] = [7, 8, 9, 17, 18, 19];

/// Train congestion percentage that maps to a neutral scale of 1.0.
pub const BASELINE_CONGESTION: f64 = 50.0;

const UNIFORM_SHARE: f64 = 1.0 / TOTAL_CARS as f64;
const MAX_SEATED_FRACTION: f64 = 0.85;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTier {
    Exact,
    Interpolated,
    Fallback,
}

impl DataTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Interpolated => "interpolated",
            Self::Fallback => "fallback",
        }
    }
}

/// A value together with the tier that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub tier: DataTier,
}

impl<T> Resolved<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved { value: f(self.value), tier: self.tier }
    }
}

pub struct Strategy<'a, K, T> {
    pub tier: DataTier,
    pub lookup: &'a dyn Fn(&K) -> Option<T>,
}

/// First strategy that yields a value wins; otherwise `default` at [`DataTier::Fallback`].
pub fn first_available<K, T>(
    key: &K,
    strategies: &[Strategy<'_, K, T>],
    default: T,
) -> Resolved<T> {
    strategies
        .iter()
        .find_map(|strategy| {
            (strategy.lookup)(key).map(|value| Resolved { value, tier: strategy.tier })
        })
        .unwrap_or(Resolved { value: default, tier: DataTier::Fallback })
}

/// Station-level lookup context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupKey<'s> {
    pub station: &'s str,
    pub hour: u32,
    pub direction: Direction,
    pub day: Option<DayCode>,
}

impl<'s> LookupKey<'s> {
    pub fn new(station: &'s str, hour: u32, direction: Direction, day: Option<DayCode>) -> Self {
        Self { station, hour, direction, day }
    }

    pub fn day_key(&self) -> DayCode {
        DayCode::cache_key(self.day)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TravelKey<'s> {
    pub from: &'s str,
    pub to: &'s str,
    pub direction: Option<Direction>,
}

/// Train-level congestion percentage to a scale clamped to `[0.5, 2.0]`.
pub fn congestion_scale(congestion_pct: f64) -> f64 {
    (congestion_pct / BASELINE_CONGESTION).clamp(0.5, 2.0)
}

/// Share of alighting riders who were seated, from the train congestion scale: 0.85 at or
/// below 30% congestion, seats/capacity at or above 100%, linear in between.
pub fn seated_fraction_for_scale(scale: f64) -> f64 {
    let min_fraction = SEATS_PER_CAR / MAX_CAPACITY;
    let congestion_pct = scale * BASELINE_CONGESTION;
    if congestion_pct <= 30.0 {
        return MAX_SEATED_FRACTION;
    }
    if congestion_pct >= 100.0 {
        return min_fraction;
    }
    let t = (congestion_pct - 30.0) / 70.0;
    MAX_SEATED_FRACTION - t * (MAX_SEATED_FRACTION - min_fraction)
}

fn per_car(values: &[f64]) -> Option<[f64; TOTAL_CARS]> {
    <[f64; TOTAL_CARS]>::try_from(values).ok()
}

fn shares(values: &[f64; TOTAL_CARS]) -> Option<[f64; TOTAL_CARS]> {
    let total: f64 = values.iter().sum();
    (total > 0.0).then(|| values.map(|value| value / total))
}

/// Read-only view over the loaded data and one calibration snapshot.
#[derive(Clone, Copy)]
pub struct DataResolver<'a> {
    network: &'a StationNetwork,
    caches: &'a DataCaches,
    params: &'a CalibrationParams,
}

impl<'a> DataResolver<'a> {
    pub fn new(
        network: &'a StationNetwork,
        caches: &'a DataCaches,
        params: &'a CalibrationParams,
    ) -> Self {
        Self { network, caches, params }
    }

    pub fn caches(&self) -> &'a DataCaches {
        self.caches
    }

    pub fn network(&self) -> &'a StationNetwork {
        self.network
    }

    pub fn params(&self) -> &'a CalibrationParams {
        self.params
    }

    /// Exit traffic on `day` relative to the station's weekday average; 1.0 without a day.
    pub fn dow_factor(&self, station: &str, day: Option<DayCode>) -> f64 {
        day.and_then(|day| self.caches.dow_factors.as_ref()?.get(station, &day).copied())
            .unwrap_or(1.0)
    }

    // -- alighting volume D(s) -------------------------------------------------------------

    pub fn congestion_same_direction(&self, key: &LookupKey<'_>) -> Option<f64> {
        let table = self.caches.congestion_30min.as_ref()?;
        table.get(key.station, &(key.direction, key.hour)).copied()
    }

    pub fn congestion_any_direction(&self, key: &LookupKey<'_>) -> Option<f64> {
        let by_key = self.caches.congestion_30min.as_ref()?.for_station(key.station)?;
        [key.direction, key.direction.opposite()]
            .into_iter()
            .find_map(|direction| by_key.get(&(direction, key.hour)).copied())
    }

    pub fn hourly_alighting(&self, key: &LookupKey<'_>) -> Option<f64> {
        self.caches.alighting.as_ref()?.get(key.station, &key.hour).copied()
    }

    pub fn alighting_volume(&self, key: &LookupKey<'_>) -> Resolved<f64> {
        let strategies: [Strategy<'_, LookupKey<'_>, f64>; 3] = [
            Strategy { tier: DataTier::Exact, lookup: &|key| self.congestion_same_direction(key) },
            Strategy {
                tier: DataTier::Interpolated,
                lookup: &|key| self.congestion_any_direction(key),
            },
            Strategy { tier: DataTier::Interpolated, lookup: &|key| self.hourly_alighting(key) },
        ];

        first_available(key, &strategies, 1.0)
            .map(|volume| volume * self.dow_factor(key.station, key.day))
    }

    // -- per-car alighting fraction w(c, s) ------------------------------------------------

    pub fn getoff_rate_shares(&self, key: &LookupKey<'_>) -> Option<[f64; TOTAL_CARS]> {
        let table = self.caches.getoff_rate.as_ref()?;
        let rates = per_car(table.get(key.station, &(key.hour, key.day_key()))?)?;
        Some(shares(&rates).unwrap_or([UNIFORM_SHARE; TOTAL_CARS]))
    }

    /// Global distribution nudged toward cars with more nearby exits.
    pub fn exit_layout_weights(&self, key: &LookupKey<'_>) -> Option<[f64; TOTAL_CARS]> {
        let counts = self.caches.platform.as_ref()?.exit_counts(key.station, key.direction)?;
        let total: usize = counts.iter().sum();
        if total == 0 {
            return Some(EMPIRICAL_CAR_DIST);
        }

        let mut weights = EMPIRICAL_CAR_DIST;
        for (weight, count) in weights.iter_mut().zip(counts) {
            let exit_share = count as f64 / total as f64;
            *weight = (*weight + 0.3 * (exit_share - UNIFORM_SHARE)).max(0.01);
        }
        Some(weights)
    }

    pub fn car_weights(&self, key: &LookupKey<'_>) -> Resolved<[f64; TOTAL_CARS]> {
        let strategies: [Strategy<'_, LookupKey<'_>, [f64; TOTAL_CARS]>; 2] = [
            Strategy { tier: DataTier::Exact, lookup: &|key| self.getoff_rate_shares(key) },
            Strategy { tier: DataTier::Interpolated, lookup: &|key| self.exit_layout_weights(key) },
        ];

        first_available(key, &strategies, [UNIFORM_SHARE; TOTAL_CARS])
    }

    // -- boarding penalty B(c, h) ----------------------------------------------------------

    pub fn car_congestion_shares(&self, key: &LookupKey<'_>) -> Option<[f64; TOTAL_CARS]> {
        let values =
            self.caches.car_congestion.as_ref()?.get(key.station, &(key.hour, key.day_key()))?;
        shares(&per_car(values)?)
    }

    /// Facility weight next to each car over the station-direction total, using the weights
    /// of the current calibration snapshot.
    pub fn facility_shares(&self, key: &LookupKey<'_>) -> Option<[f64; TOTAL_CARS]> {
        let records = self.caches.platform.as_ref()?.records(key.station, key.direction)?;
        let weights = &self.params.facility_weights;

        let total: f64 = records.iter().map(|record| weights.weight_of(&record.facility)).sum();
        let mut scores = [0.0; TOTAL_CARS];
        for record in records.iter().filter(|record| (1..=TOTAL_CARS).contains(&record.car)) {
            scores[record.car - 1] += weights.weight_of(&record.facility);
        }
        (total > 0.0).then(|| scores.map(|score| score / total))
    }

    /// Per-car share of boarding crowding, before train-level scaling.
    pub fn boarding_shares(&self, key: &LookupKey<'_>) -> Resolved<[f64; TOTAL_CARS]> {
        let strategies: [Strategy<'_, LookupKey<'_>, [f64; TOTAL_CARS]>; 2] = [
            Strategy { tier: DataTier::Exact, lookup: &|key| self.car_congestion_shares(key) },
            Strategy { tier: DataTier::Interpolated, lookup: &|key| self.facility_shares(key) },
        ];

        first_available(key, &strategies, [UNIFORM_SHARE; TOTAL_CARS])
    }

    /// Boarding shares scaled by how crowded the whole train is at the boarding station.
    pub fn boarding_penalty(&self, key: &LookupKey<'_>) -> Resolved<[f64; TOTAL_CARS]> {
        let scale = self.train_congestion_scale(key).value;
        self.boarding_shares(key).map(|shares| shares.map(|share| share * scale))
    }

    // -- train-level congestion ------------------------------------------------------------

    pub fn train_congestion_exact(&self, key: &LookupKey<'_>) -> Option<f64> {
        let table = self.caches.train_congestion.as_ref()?;
        table.get(key.station, &(key.hour, key.day_key())).copied()
    }

    /// Nearest rush hour with data, blended toward the baseline by
    /// `max(0.3, 1 - 0.12 * hours_away)`. Earlier rush hours win ties.
    pub fn train_congestion_near_rush(&self, key: &LookupKey<'_>) -> Option<f64> {
        let table = self.caches.train_congestion.as_ref()?;
        let day = key.day_key();

        let mut nearest: Option<(u32, f64)> = None;
        for rush_hour in RUSH_HOURS {
            let Some(value) = table.get(key.station, &(rush_hour, day)) else {
                continue;
            };
            let distance = key.hour.abs_diff(rush_hour);
            if nearest.map_or(true, |(best, _)| distance < best) {
                nearest = Some((distance, *value));
            }
        }

        let (distance, congestion) = nearest?;
        let decay = (1.0 - 0.12 * distance as f64).max(0.3);
        Some(decay * congestion + (1.0 - decay) * BASELINE_CONGESTION)
    }

    pub fn train_congestion_scale(&self, key: &LookupKey<'_>) -> Resolved<f64> {
        let strategies: [Strategy<'_, LookupKey<'_>, f64>; 2] = [
            Strategy { tier: DataTier::Exact, lookup: &|key| self.train_congestion_exact(key) },
            Strategy {
                tier: DataTier::Interpolated,
                lookup: &|key| self.train_congestion_near_rush(key),
            },
        ];

        first_available(key, &strategies, BASELINE_CONGESTION).map(congestion_scale)
    }

    pub fn seated_fraction(&self, key: &LookupKey<'_>) -> Resolved<f64> {
        self.train_congestion_scale(key).map(seated_fraction_for_scale)
    }

    // -- standing competitors C(c, s) ------------------------------------------------------

    /// Standees per car: riders in the car beyond the seat count, floored at 0.5. The tier is
    /// that of the per-car split.
    pub fn competitors(&self, key: &LookupKey<'_>) -> Resolved<[f64; TOTAL_CARS]> {
        let scale = self.train_congestion_scale(key).value;
        let pax_per_car = scale * BASELINE_CONGESTION / 100.0
            * MAX_CAPACITY
            * self.dow_factor(key.station, key.day);

        let split = match self.car_congestion_shares(key) {
            Some(shares) => Resolved { value: shares, tier: DataTier::Exact },
            None => Resolved { value: EMPIRICAL_CAR_DIST, tier: DataTier::Fallback },
        };
        split.map(|fractions| {
            fractions.map(|fraction| {
                let pax_in_car = pax_per_car * TOTAL_CARS as f64 * fraction;
                (pax_in_car - SEATS_PER_CAR).max(0.0).max(0.5)
            })
        })
    }

    // -- travel time T(a -> b) -------------------------------------------------------------

    pub fn timetable_minutes(&self, key: &TravelKey<'_>) -> Option<f64> {
        let seconds = self.caches.travel_times.as_ref()?.seconds(key.from, key.to, key.direction)?;
        Some((seconds / 60.0).max(0.1))
    }

    /// Cumulative-distance difference plus a 0.1 floor.
    pub fn distance_proxy(&self, key: &TravelKey<'_>) -> Option<f64> {
        let from = self.network.station(self.network.position(key.from)?)?;
        let to = self.network.station(self.network.position(key.to)?)?;
        Some((to.cumulative_distance - from.cumulative_distance).abs() + 0.1)
    }

    pub fn travel_time(&self, key: &TravelKey<'_>) -> Resolved<f64> {
        let strategies: [Strategy<'_, TravelKey<'_>, f64>; 2] = [
            Strategy { tier: DataTier::Exact, lookup: &|key| self.timetable_minutes(key) },
            Strategy { tier: DataTier::Interpolated, lookup: &|key| self.distance_proxy(key) },
        ];

        first_available(key, &strategies, 1.0)
    }

    pub fn travel_minutes(&self, from: &str, to: &str, direction: Direction) -> f64 {
        self.travel_time(&TravelKey { from, to, direction: Some(direction) }).value
    }
}

#[cfg(test)]
mod tests {
    use super::{
        congestion_scale, first_available, seated_fraction_for_scale, DataResolver, DataTier,
        LookupKey, Strategy, TravelKey, EMPIRICAL_CAR_DIST,
    };
    use crate::calibration::CalibrationParams;
    use crate::data::caches::{
        DataCaches, FacilityRecord, PlatformLayout, StationTable, TravelTimeTable,
    };
    use crate::domain::station::StationNetwork;
    use crate::domain::trip::{DayCode, Direction};
    use crate::domain::TOTAL_CARS;

    fn network() -> StationNetwork {
        StationNetwork::new(vec![
            ("a".to_string(), 0.0),
            ("b".to_string(), 1.0),
            ("c".to_string(), 2.5),
            ("d".to_string(), 4.0),
        ])
        .expect("network")
    }

    fn key(station: &str, hour: u32) -> LookupKey<'_> {
        LookupKey::new(station, hour, Direction::Inner, None)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn combinator_reports_the_tier_that_answered() {
        let strategies: [Strategy<'_, u32, u32>; 2] = [
            Strategy { tier: DataTier::Exact, lookup: &|_| None },
            Strategy { tier: DataTier::Interpolated, lookup: &|value| Some(value * 2) },
        ];

        let resolved = first_available(&21, &strategies, 0);
        assert_eq!(resolved.value, 42);
        assert_eq!(resolved.tier, DataTier::Interpolated);

        let fallback = first_available(&21, &strategies[..1], 7);
        assert_eq!(fallback.value, 7);
        assert_eq!(fallback.tier, DataTier::Fallback);
    }

    #[test]
    fn alighting_prefers_direction_then_any_direction_then_hourly() {
        let network = network();
        let params = CalibrationParams::default();
        let mut congestion = StationTable::default();
        congestion.insert("b".to_string(), (Direction::Inner, 8), 40.0);
        congestion.insert("c".to_string(), (Direction::Outer, 8), 25.0);
        let mut hourly = StationTable::default();
        hourly.insert("d".to_string(), 8, 300.0);
        let caches = DataCaches {
            congestion_30min: Some(congestion),
            alighting: Some(hourly),
            ..DataCaches::default()
        };
        let resolver = DataResolver::new(&network, &caches, &params);

        let exact = resolver.alighting_volume(&key("b", 8));
        assert_eq!((exact.value, exact.tier), (40.0, DataTier::Exact));

        let other_direction = resolver.alighting_volume(&key("c", 8));
        assert_eq!((other_direction.value, other_direction.tier), (25.0, DataTier::Interpolated));

        let from_hourly = resolver.alighting_volume(&key("d", 8));
        assert_eq!((from_hourly.value, from_hourly.tier), (300.0, DataTier::Interpolated));

        let missing = resolver.alighting_volume(&key("a", 8));
        assert_eq!((missing.value, missing.tier), (1.0, DataTier::Fallback));
    }

    #[test]
    fn alighting_volume_applies_day_of_week_factor() {
        let network = network();
        let params = CalibrationParams::default();
        let mut factors = StationTable::default();
        factors.insert("a".to_string(), DayCode::Sat, 0.5);
        let caches = DataCaches { dow_factors: Some(factors), ..DataCaches::default() };
        let resolver = DataResolver::new(&network, &caches, &params);

        let saturday = LookupKey::new("a", 8, Direction::Inner, Some(DayCode::Sat));
        let weekend = resolver.alighting_volume(&saturday);
        assert_eq!(weekend.value, 0.5);
        assert_eq!(resolver.dow_factor("a", None), 1.0);
        assert_eq!(resolver.dow_factor("b", Some(DayCode::Sat)), 1.0);
    }

    #[test]
    fn car_weights_normalize_rates_and_ignore_wrong_length_rows() {
        let network = network();
        let params = CalibrationParams::default();
        let mut rates = StationTable::default();
        rates.insert("a".to_string(), (8, DayCode::Mon), vec![1.0; TOTAL_CARS]);
        rates.insert("b".to_string(), (8, DayCode::Mon), vec![1.0; 4]);
        rates.insert("c".to_string(), (8, DayCode::Mon), vec![0.0; TOTAL_CARS]);
        let caches = DataCaches { getoff_rate: Some(rates), ..DataCaches::default() };
        let resolver = DataResolver::new(&network, &caches, &params);

        let wednesday = LookupKey::new("a", 8, Direction::Inner, Some(DayCode::Wed));
        let exact = resolver.car_weights(&wednesday);
        assert_eq!(exact.tier, DataTier::Exact);
        assert_close(exact.value.iter().sum(), 1.0);

        let malformed = resolver.car_weights(&key("b", 8));
        assert_eq!(malformed.tier, DataTier::Fallback);
        assert_eq!(malformed.value, [0.1; TOTAL_CARS]);

        let zero_total = resolver.car_weights(&key("c", 8));
        assert_eq!(zero_total.tier, DataTier::Exact);
        assert_eq!(zero_total.value, [0.1; TOTAL_CARS]);
    }

    #[test]
    fn exit_layout_shifts_weight_toward_cars_near_exits() {
        let network = network();
        let params = CalibrationParams::default();
        let mut layout = PlatformLayout::default();
        for _ in 0..4 {
            layout.push(
                "a".to_string(),
                Direction::Inner,
                FacilityRecord { car: 10, facility: "계단".to_string() },
            );
        }
        let caches = DataCaches { platform: Some(layout), ..DataCaches::default() };
        let resolver = DataResolver::new(&network, &caches, &params);

        let weights = resolver.car_weights(&key("a", 8));

        assert_eq!(weights.tier, DataTier::Interpolated);
        assert_close(weights.value[9], EMPIRICAL_CAR_DIST[9] + 0.3 * 0.9);
        assert_close(weights.value[0], EMPIRICAL_CAR_DIST[0] - 0.03);
        assert!(weights.value[0] >= 0.01);
    }

    #[test]
    fn boarding_shares_use_facility_weights_when_congestion_is_missing() {
        let network = network();
        let params = CalibrationParams::default();
        let mut layout = PlatformLayout::default();
        for (station, car, facility) in
            [("a", 1, "에스컬레이터"), ("a", 2, "계단"), ("a", 3, "엘리베이터"), ("b", 3, "엘리베이터")]
        {
            let record = FacilityRecord { car, facility: facility.to_string() };
            layout.push(station.to_string(), Direction::Inner, record);
        }
        let caches = DataCaches { platform: Some(layout), ..DataCaches::default() };
        let resolver = DataResolver::new(&network, &caches, &params);

        let shares = resolver.boarding_shares(&key("a", 8));
        assert_eq!(shares.tier, DataTier::Interpolated);
        assert_close(shares.value[0], 1.2 / 2.2);
        assert_close(shares.value[1], 1.0 / 2.2);
        assert_eq!(shares.value[2], 0.0);

        let elevator_only = resolver.boarding_shares(&key("b", 8));
        assert_eq!(elevator_only.tier, DataTier::Fallback);
        assert_eq!(elevator_only.value, [0.1; TOTAL_CARS]);
    }

    #[test]
    fn train_congestion_decays_toward_baseline_away_from_rush() {
        let network = network();
        let params = CalibrationParams::default();
        let mut train = StationTable::default();
        train.insert("a".to_string(), (8, DayCode::Mon), 100.0);
        train.insert("a".to_string(), (18, DayCode::Mon), 90.0);
        let caches = DataCaches { train_congestion: Some(train), ..DataCaches::default() };
        let resolver = DataResolver::new(&network, &caches, &params);

        let exact = resolver.train_congestion_scale(&key("a", 8));
        assert_eq!((exact.value, exact.tier), (2.0, DataTier::Exact));

        // 11:00 is three hours from 08:00: decay 0.64 -> 0.64 * 100 + 0.36 * 50 = 82.
        let blended = resolver.train_congestion_scale(&key("a", 11));
        assert_eq!(blended.tier, DataTier::Interpolated);
        assert_close(blended.value, 82.0 / 50.0);

        // 13:00 is five hours from both 08:00 and 18:00; the earlier one wins.
        assert_close(resolver.train_congestion_near_rush(&key("a", 13)).unwrap_or_default(), 70.0);

        let far = resolver.train_congestion_near_rush(&key("a", 0)).unwrap_or_default();
        assert_close(far, 0.3 * 100.0 + 0.7 * 50.0);

        let none = resolver.train_congestion_scale(&key("b", 8));
        assert_eq!((none.value, none.tier), (1.0, DataTier::Fallback));
    }

    #[test]
    fn seated_fraction_interpolates_between_bounds() {
        assert_eq!(seated_fraction_for_scale(0.5), 0.85);
        assert_eq!(seated_fraction_for_scale(2.0), 54.0 / 160.0);
        assert_close(seated_fraction_for_scale(1.3), 0.85 - (35.0 / 70.0) * (0.85 - 54.0 / 160.0));
        assert_eq!(congestion_scale(10.0), 0.5);
        assert_eq!(congestion_scale(500.0), 2.0);
    }

    #[test]
    fn competitors_are_floored_and_follow_car_split() {
        let network = network();
        let params = CalibrationParams::default();
        let mut split = StationTable::default();
        let mut values = vec![1.0; TOTAL_CARS];
        values[0] = 10.0;
        split.insert("a".to_string(), (8, DayCode::Mon), values);
        let caches = DataCaches { car_congestion: Some(split), ..DataCaches::default() };
        let resolver = DataResolver::new(&network, &caches, &params);

        let with_split = resolver.competitors(&key("a", 8));
        assert_eq!(with_split.tier, DataTier::Exact);
        // 80 riders per car on average; car 1 carries 10/19 of the train.
        assert_close(with_split.value[0], 800.0 * 10.0 / 19.0 - 54.0);
        assert_eq!(with_split.value[1], 0.5);

        let empirical = resolver.competitors(&key("b", 8));
        assert_eq!(empirical.tier, DataTier::Fallback);
        assert_close(empirical.value[3], 800.0 * 0.116 - 54.0);
    }

    #[test]
    fn travel_time_prefers_timetable_then_distance() {
        let network = network();
        let params = CalibrationParams::default();
        let table = TravelTimeTable::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
            vec![0.0, 120.0, 240.0, 480.0],
        );
        let timed = DataCaches { travel_times: table, ..DataCaches::default() };
        let untimed = DataCaches::default();

        let exact = DataResolver::new(&network, &timed, &params)
            .travel_time(&TravelKey { from: "b", to: "a", direction: Some(Direction::Inner) });
        assert_eq!((exact.value, exact.tier), (6.0, DataTier::Exact));

        let proxy = DataResolver::new(&network, &untimed, &params)
            .travel_time(&TravelKey { from: "d", to: "b", direction: Some(Direction::Inner) });
        assert_eq!(proxy.tier, DataTier::Interpolated);
        assert_close(proxy.value, 3.1);

        let unknown = DataResolver::new(&network, &untimed, &params)
            .travel_time(&TravelKey { from: "a", to: "zz", direction: None });
        assert_eq!((unknown.value, unknown.tier), (1.0, DataTier::Fallback));
    }
}
