//! Station-by-station seat-capture recurrence.
//!
//! For each car the walk tracks two running quantities: the probability the rider is still
//! standing and the fraction of the original standees still competing. Every lookup goes
//! through [`DataResolver`], so missing data only degrades the inputs and never fails a run.

use serde::Serialize;

use crate::data::resolver::{DataResolver, LookupKey};
use crate::domain::trip::{DayCode, Direction};
use crate::domain::TOTAL_CARS;
use crate::scoring::normalize::{normalize_scores, rank_order};

/// Softening term added to the competitor count in every capture ratio.
pub const COMPETITION_EPSILON: f64 = 0.5;

pub const MIN_LOAD_FACTOR: f64 = 0.3;
pub const MAX_LOAD_FACTOR: f64 = 3.0;

pub const MAX_P_SEATED: f64 = 0.95;

/// Stations are already resolved to canonical names and ordered in travel direction.
#[derive(Clone, Debug, PartialEq)]
pub struct TripPlan {
    pub boarding: String,
    pub destination: String,
    pub intermediates: Vec<String>,
    pub hour: u32,
    pub direction: Direction,
    pub day: Option<DayCode>,
}

impl TripPlan {
    fn key<'s>(&self, station: &'s str) -> LookupKey<'s> {
        LookupKey::new(station, self.hour, self.direction, self.day)
    }
}

/// One station's effect on one car, rounded for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationContribution {
    pub station: String,
    pub alighting_volume: f64,
    pub travel_time: f64,
    pub car_weight: f64,
    pub load_ratio: f64,
    pub load_factor_eff: f64,
    pub sitting_fraction: f64,
    pub freed_seats: f64,
    pub competitors: f64,
    pub competitors_adj: f64,
    pub p_capture: f64,
    pub p_first: f64,
    pub contribution: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CarScore {
    pub car: usize,
    pub benefit: f64,
    pub penalty: f64,
    pub raw_score: f64,
    pub score: f64,
    pub rank: usize,
    pub gap_from_best: f64,
    pub load_factor: f64,
    pub load_factor_eff: f64,
    pub p_seated: f64,
    pub contributions: Vec<StationContribution>,
}

/// Ten car records ordered best first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreBoard {
    pub cars: Vec<CarScore>,
    pub alpha: f64,
    pub total_trip_minutes: f64,
    pub spread: f64,
}

impl ScoreBoard {
    pub fn best(&self) -> Option<&CarScore> {
        self.cars.first()
    }

    pub fn worst(&self) -> Option<&CarScore> {
        self.cars.last()
    }

    pub fn car(&self, car: usize) -> Option<&CarScore> {
        self.cars.iter().find(|record| record.car == car)
    }

    /// Records in car order, 1 through 10.
    pub fn by_car(&self) -> Vec<&CarScore> {
        let mut records: Vec<&CarScore> = self.cars.iter().collect();
        records.sort_by_key(|record| record.car);
        records
    }
}

/// Inputs shared by all ten cars at one intermediate station.
struct StationContext<'p> {
    name: &'p str,
    alighting_volume: f64,
    travel_to_destination: f64,
    sitting_fraction: f64,
    car_weights: [f64; TOTAL_CARS],
    competitors: [f64; TOTAL_CARS],
    load_ratios: [f64; TOTAL_CARS],
}

struct CarOutcome {
    benefit: f64,
    penalty: f64,
    p_seated: f64,
    contributions: Vec<StationContribution>,
}

/// Scores every car for one trip. `alpha` is the already-adjusted time-of-day multiplier; the
/// calibration snapshot is the one the resolver was built with.
pub fn score_trip(resolver: &DataResolver<'_>, plan: &TripPlan, alpha: f64) -> ScoreBoard {
    let params = resolver.params();
    let stations: Vec<StationContext<'_>> =
        plan.intermediates.iter().map(|name| station_context(resolver, plan, name)).collect();

    let load_factors = raw_load_factors(&stations);
    let effective = effective_load_factors(&load_factors, params.gamma);
    let total_trip = resolver.travel_minutes(&plan.boarding, &plan.destination, plan.direction);
    let boarding_penalty = resolver.boarding_penalty(&plan.key(&plan.boarding)).value;

    let outcomes: Vec<CarOutcome> = (0..TOTAL_CARS)
        .map(|car| {
            let mut outcome = walk_stations(&stations, car, effective[car], alpha);
            outcome.benefit += params.delta * (1.0 - effective[car]).max(0.0) * total_trip;
            outcome.penalty = params.beta * boarding_penalty[car] * total_trip;
            outcome
        })
        .collect();

    let raw: [f64; TOTAL_CARS] =
        std::array::from_fn(|car| outcomes[car].benefit - outcomes[car].penalty);
    let scores = normalize_scores(&raw, &load_factors);
    let best_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst_score = scores.iter().copied().fold(f64::INFINITY, f64::min);

    let mut outcomes: Vec<Option<CarOutcome>> = outcomes.into_iter().map(Some).collect();
    let cars = rank_order(&scores)
        .into_iter()
        .enumerate()
        .filter_map(|(position, car)| {
            let outcome = outcomes[car].take()?;
            Some(CarScore {
                car: car + 1,
                benefit: outcome.benefit,
                penalty: outcome.penalty,
                raw_score: raw[car],
                score: scores[car],
                rank: position + 1,
                gap_from_best: best_score - scores[car],
                load_factor: load_factors[car],
                load_factor_eff: effective[car],
                p_seated: outcome.p_seated,
                contributions: outcome.contributions,
            })
        })
        .collect();

    ScoreBoard { cars, alpha, total_trip_minutes: total_trip, spread: best_score - worst_score }
}

fn station_context<'p>(
    resolver: &DataResolver<'_>,
    plan: &TripPlan,
    name: &'p str,
) -> StationContext<'p> {
    let key = plan.key(name);
    let competitors = resolver.competitors(&key).value;
    let mean = (competitors.iter().sum::<f64>() / TOTAL_CARS as f64).max(1e-9);

    StationContext {
        name,
        alighting_volume: resolver.alighting_volume(&key).value,
        travel_to_destination: resolver.travel_minutes(name, &plan.destination, plan.direction),
        sitting_fraction: resolver.seated_fraction(&key).value,
        car_weights: resolver.car_weights(&key).value,
        competitors,
        load_ratios: competitors.map(|count| count / mean),
    }
}

/// Mean competitor-to-average ratio per car across the route, clamped to `[0.3, 3.0]`. A trip
/// with no intermediate stations is uniformly loaded.
fn raw_load_factors(stations: &[StationContext<'_>]) -> [f64; TOTAL_CARS] {
    if stations.is_empty() {
        return [1.0; TOTAL_CARS];
    }
    let mut sums = [0.0; TOTAL_CARS];
    for station in stations {
        for (sum, ratio) in sums.iter_mut().zip(station.load_ratios) {
            *sum += ratio;
        }
    }
    sums.map(|sum| (sum / stations.len() as f64).clamp(MIN_LOAD_FACTOR, MAX_LOAD_FACTOR))
}

/// `max(0.01, L)^gamma`, rescaled to mean 1.
pub fn effective_load_factors(raw: &[f64; TOTAL_CARS], gamma: f64) -> [f64; TOTAL_CARS] {
    let compressed = raw.map(|factor| factor.max(0.01).powf(gamma));
    let mean = compressed.iter().sum::<f64>() / TOTAL_CARS as f64;
    if mean > 0.0 && mean.is_finite() {
        compressed.map(|factor| factor / mean)
    } else {
        [1.0; TOTAL_CARS]
    }
}

/// Chance of already having a seat when boarding. Only off-peak hours (`alpha < 1`) have one,
/// and more loaded cars get less of it.
pub fn initial_seat_probability(alpha: f64, load_factor_eff: f64) -> f64 {
    if alpha >= 1.0 {
        return 0.0;
    }
    let base = (1.0 - alpha) * 0.7;
    let car_factor = (1.0 - 0.5 * (load_factor_eff - 1.0).max(0.0)).max(0.5);
    (base * car_factor).min(0.6)
}

fn walk_stations(
    stations: &[StationContext<'_>],
    car: usize,
    load_factor_eff: f64,
    alpha: f64,
) -> CarOutcome {
    let mut benefit = 0.0;
    let mut p_not_seated = 1.0 - initial_seat_probability(alpha, load_factor_eff);
    let mut remaining_competitors = 1.0;
    let mut contributions = Vec::with_capacity(stations.len());

    for station in stations {
        let car_weight = station.car_weights[car];
        let freed = station.alighting_volume * car_weight * station.sitting_fraction * alpha;
        let competitors = station.competitors[car] * remaining_competitors;
        let competitors_adj = competitors * load_factor_eff;

        let exponent = (-freed / (COMPETITION_EPSILON + competitors_adj)).clamp(-20.0, 0.0);
        let p_capture = (1.0 - exponent.exp()).clamp(0.0, 1.0);

        // standees who took seats here stop competing at later stations
        if competitors > 0.0 {
            let taken = freed * competitors_adj / (COMPETITION_EPSILON + competitors_adj);
            let seated_share = (taken / competitors.max(1.0)).min(0.5);
            remaining_competitors *= 1.0 - seated_share;
        }

        let p_first = p_capture * p_not_seated;
        let contribution = p_first * station.travel_to_destination;
        benefit += contribution;
        p_not_seated *= 1.0 - p_capture;

        contributions.push(StationContribution {
            station: station.name.to_string(),
            alighting_volume: round_to(station.alighting_volume, 2),
            travel_time: round_to(station.travel_to_destination, 2),
            car_weight: round_to(car_weight, 4),
            load_ratio: round_to(station.load_ratios[car], 4),
            load_factor_eff: round_to(load_factor_eff, 4),
            sitting_fraction: round_to(station.sitting_fraction, 4),
            freed_seats: round_to(freed, 4),
            competitors: round_to(competitors, 4),
            competitors_adj: round_to(competitors_adj, 4),
            p_capture: round_to(p_capture, 6),
            p_first: round_to(p_first, 6),
            contribution: round_to(contribution, 4),
        });
    }

    CarOutcome {
        benefit,
        penalty: 0.0,
        p_seated: (1.0 - p_not_seated).clamp(0.0, MAX_P_SEATED),
        contributions,
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::{
        effective_load_factors, initial_seat_probability, round_to, score_trip, TripPlan,
    };
    use crate::calibration::CalibrationParams;
    use crate::data::caches::{DataCaches, StationTable};
    use crate::data::resolver::DataResolver;
    use crate::domain::station::StationNetwork;
    use crate::domain::trip::{DayCode, Direction};
    use crate::domain::TOTAL_CARS;

    fn network() -> StationNetwork {
        let rows = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i as f64))
            .collect();
        StationNetwork::new(rows).expect("network")
    }

    fn plan(intermediates: &[&str], hour: u32) -> TripPlan {
        TripPlan {
            boarding: "a".to_string(),
            destination: "e".to_string(),
            intermediates: intermediates.iter().map(|name| name.to_string()).collect(),
            hour,
            direction: Direction::Inner,
            day: None,
        }
    }

    fn skewed_caches() -> DataCaches {
        let mut congestion = StationTable::default();
        let mut rates = StationTable::default();
        let mut alighting = StationTable::default();
        for station in ["a", "b", "c", "d"] {
            let crowd: Vec<f64> = (1..=TOTAL_CARS).map(|car| car as f64 * 10.0).collect();
            let exits: Vec<f64> = (1..=TOTAL_CARS).map(|car| (11 - car) as f64).collect();
            congestion.insert(station.to_string(), (8, DayCode::Mon), crowd);
            rates.insert(station.to_string(), (8, DayCode::Mon), exits);
            alighting.insert(station.to_string(), 8, 400.0);
        }
        DataCaches {
            car_congestion: Some(congestion),
            getoff_rate: Some(rates),
            alighting: Some(alighting),
            ..DataCaches::default()
        }
    }

    #[test]
    fn board_has_ten_ranked_cars_in_score_order() {
        let network = network();
        let caches = skewed_caches();
        let params = CalibrationParams::default();
        let resolver = DataResolver::new(&network, &caches, &params);

        let board = score_trip(&resolver, &plan(&["b", "c", "d"], 8), 1.4);

        assert_eq!(board.cars.len(), TOTAL_CARS);
        let mut ranks: Vec<usize> = board.cars.iter().map(|car| car.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (1..=TOTAL_CARS).collect::<Vec<_>>());
        assert!(board.cars.windows(2).all(|pair| pair[0].score >= pair[1].score));
        assert!(board.cars.iter().all(|car| (0.0..=0.95).contains(&car.p_seated)));
        assert!(board.cars.iter().all(|car| car.contributions.len() == 3));
        assert_eq!(board.best().map(|car| car.rank), Some(1));
        assert_eq!(board.best().map(|car| car.gap_from_best), Some(0.0));
    }

    #[test]
    fn less_crowded_front_cars_beat_crowded_rear_cars() {
        let network = network();
        let caches = skewed_caches();
        let params = CalibrationParams::default();
        let resolver = DataResolver::new(&network, &caches, &params);

        let board = score_trip(&resolver, &plan(&["b", "c", "d"], 8), 1.4);

        let first = board.car(1).map(|car| car.score).unwrap_or_default();
        let last = board.car(10).map(|car| car.score).unwrap_or_default();
        assert!(first > last, "car 1 ({first}) should outrank car 10 ({last})");
        assert_eq!(board.best().map(|car| car.car), Some(1));
    }

    #[test]
    fn effective_load_factors_average_to_one() {
        let raw = [0.3, 0.5, 0.8, 1.0, 1.2, 1.5, 2.0, 2.5, 3.0, 0.9];

        for gamma in [0.1, 0.5, 1.0, 2.0, 3.0] {
            let effective = effective_load_factors(&raw, gamma);
            let mean = effective.iter().sum::<f64>() / TOTAL_CARS as f64;
            assert!((mean - 1.0).abs() < 1e-9, "gamma {gamma} gave mean {mean}");
        }
    }

    #[test]
    fn initial_seat_probability_is_off_peak_only_and_capped() {
        assert_eq!(initial_seat_probability(1.0, 1.0), 0.0);
        assert_eq!(initial_seat_probability(1.4, 0.5), 0.0);
        assert!((initial_seat_probability(0.6, 1.0) - 0.28).abs() < 1e-12);
        assert!((initial_seat_probability(0.6, 3.0) - 0.14).abs() < 1e-12);
        assert_eq!(initial_seat_probability(0.0, 0.5), 0.6);
    }

    #[test]
    fn no_intermediates_and_no_data_ties_every_car_at_fifty() {
        let network = network();
        let caches = DataCaches::default();
        let params = CalibrationParams::default();
        let resolver = DataResolver::new(&network, &caches, &params);

        let board = score_trip(&resolver, &plan(&[], 8), 1.4);

        assert!(board.cars.iter().all(|car| car.score == 50.0));
        assert!(board.cars.iter().all(|car| car.contributions.is_empty()));
        let order: Vec<usize> = board.cars.iter().map(|car| car.car).collect();
        assert_eq!(order, (1..=10).collect::<Vec<_>>());
        assert_eq!(board.spread, 0.0);
    }

    #[test]
    fn larger_beta_never_raises_scores() {
        let network = network();
        let caches = skewed_caches();
        let low = CalibrationParams::default().with_beta(0.1);
        let high = CalibrationParams::default().with_beta(0.9);

        let trip = plan(&["b", "c"], 8);
        let low_board = score_trip(&DataResolver::new(&network, &caches, &low), &trip, 1.4);
        let high_board = score_trip(&DataResolver::new(&network, &caches, &high), &trip, 1.4);

        for car in 1..=TOTAL_CARS {
            let low_raw = low_board.car(car).map(|record| record.raw_score).unwrap_or_default();
            let high_raw = high_board.car(car).map(|record| record.raw_score).unwrap_or_default();
            assert!(high_raw <= low_raw);
        }
    }

    #[test]
    fn rounding_helper_matches_display_precision() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.1234567, 6), 0.123457);
    }
}
