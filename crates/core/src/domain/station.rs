use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::trip::Direction;
use crate::errors::{EngineError, LoadError};

/// Canonical form used for every station key: bracketed annotations, one trailing `역`, and all
/// spaces are removed.
pub fn normalize_station_name(name: &str) -> String {
    let mut stripped = String::with_capacity(name.len());
    let mut depth_paren = 0usize;
    let mut depth_bracket = 0usize;

    for ch in name.chars() {
        match ch {
            '(' => depth_paren += 1,
            ')' if depth_paren > 0 => depth_paren -= 1,
            '[' => depth_bracket += 1,
            ']' if depth_bracket > 0 => depth_bracket -= 1,
            _ if depth_paren == 0 && depth_bracket == 0 => stripped.push(ch),
            _ => {}
        }
    }

    let without_suffix = stripped.strip_suffix('역').unwrap_or(&stripped);
    without_suffix.chars().filter(|ch| !ch.is_whitespace()).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub index: usize,
    pub cumulative_distance: f64,
}

/// Stations of the circular line in inner (clockwise) order.
#[derive(Clone, Debug, Default)]
pub struct StationNetwork {
    stations: Vec<Station>,
    by_name: HashMap<String, usize>,
    loop_distance: Option<f64>,
}

impl StationNetwork {
    /// Builds the network from `(name, cumulative_distance)` rows. A trailing row that repeats
    /// the first station closes the loop and is folded into `loop_distance`.
    pub fn new(rows: Vec<(String, f64)>) -> Result<Self, LoadError> {
        let mut rows: Vec<(String, f64)> = rows
            .into_iter()
            .map(|(name, distance)| (normalize_station_name(&name), distance))
            .collect();

        let mut loop_distance = None;
        if rows.len() > 1 && rows.first().map(|row| &row.0) == rows.last().map(|row| &row.0) {
            loop_distance = rows.pop().map(|(_, distance)| distance);
        }

        let mut stations = Vec::with_capacity(rows.len());
        let mut by_name = HashMap::with_capacity(rows.len());
        for (index, (name, cumulative_distance)) in rows.into_iter().enumerate() {
            if by_name.insert(name.clone(), index).is_some() {
                return Err(LoadError::DuplicateStation { name });
            }
            stations.push(Station { name, index, cumulative_distance });
        }

        Ok(Self { stations, by_name, loop_distance })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, index: usize) -> Option<&Station> {
        self.stations.get(index)
    }

    pub fn loop_distance(&self) -> Option<f64> {
        self.loop_distance
    }

    /// Exact match on the normalized name first, then the first station whose name contains the
    /// query or is contained by it.
    pub fn position(&self, name: &str) -> Option<usize> {
        let normalized = normalize_station_name(name);
        if normalized.is_empty() {
            return None;
        }
        if let Some(index) = self.by_name.get(&normalized) {
            return Some(*index);
        }

        self.stations
            .iter()
            .find(|station| {
                normalized.contains(station.name.as_str()) || station.name.contains(&normalized)
            })
            .map(|station| station.index)
    }

    pub fn locate(&self, name: &str) -> Result<usize, EngineError> {
        self.position(name).ok_or_else(|| EngineError::UnknownStation { name: name.to_owned() })
    }

    /// Number of hops from `from` to `to` travelling in `direction`.
    pub fn hops(&self, from: usize, to: usize, direction: Direction) -> usize {
        let n = self.stations.len();
        if n == 0 {
            return 0;
        }
        match direction {
            Direction::Inner => (to % n + n - from % n) % n,
            Direction::Outer => (from % n + n - to % n) % n,
        }
    }

    /// Stations strictly between `from` and `to` in travel order; boarding equal to destination
    /// yields an empty list.
    pub fn intermediates(&self, from: usize, to: usize, direction: Direction) -> Vec<&Station> {
        let n = self.stations.len();
        if n == 0 || from == to {
            return Vec::new();
        }

        let steps = self.hops(from, to, direction).saturating_sub(1);
        (1..=steps)
            .map(|step| match direction {
                Direction::Inner => (from + step) % n,
                Direction::Outer => (from + n - step) % n,
            })
            .filter_map(|index| self.stations.get(index))
            .collect()
    }

    /// Direction with fewer hops around the loop; ties go to inner.
    pub fn shorter_direction(&self, from: usize, to: usize) -> Direction {
        if self.hops(from, to, Direction::Inner) <= self.hops(from, to, Direction::Outer) {
            Direction::Inner
        } else {
            Direction::Outer
        }
    }
}
