use std::fmt;

use chrono::{Datelike, Local, Weekday};
use serde::{Deserialize, Serialize};

/// Traversal sense around the loop. Inner runs in station-table order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inner,
    Outer,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Outer => "outer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inner" | "clockwise" | "cw" | "내선" | "하행" => Some(Self::Inner),
            "outer" | "counter-clockwise" | "counterclockwise" | "ccw" | "외선" | "상행" => {
                Some(Self::Outer)
            }
            _ => None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Inner => Self::Outer,
            Self::Outer => Self::Inner,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
            .ok_or_else(|| format!("unsupported direction `{value}` (expected inner|outer)"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayCode {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayCode {
    pub const WEEKDAYS: [DayCode; 5] = [Self::Mon, Self::Tue, Self::Wed, Self::Thu, Self::Fri];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mon => "MON",
            Self::Tue => "TUE",
            Self::Wed => "WED",
            Self::Thu => "THU",
            Self::Fri => "FRI",
            Self::Sat => "SAT",
            Self::Sun => "SUN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" => Some(Self::Mon),
            "tue" | "tuesday" => Some(Self::Tue),
            "wed" | "wednesday" => Some(Self::Wed),
            "thu" | "thursday" => Some(Self::Thu),
            "fri" | "friday" => Some(Self::Fri),
            "sat" | "saturday" => Some(Self::Sat),
            "sun" | "sunday" => Some(Self::Sun),
            _ => None,
        }
    }

    pub fn is_weekday(&self) -> bool {
        !matches!(self, Self::Sat | Self::Sun)
    }

    /// Day code for the local calendar date.
    pub fn today() -> Self {
        Local::now().weekday().into()
    }

    /// Key used for per-car and train-level cache lookups. Weekdays share one pattern, so they
    /// (and an unspecified day) collapse onto Monday.
    pub fn cache_key(day: Option<DayCode>) -> DayCode {
        match day {
            Some(day) if !day.is_weekday() => day,
            _ => Self::Mon,
        }
    }
}

impl fmt::Display for DayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DayCode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
            .ok_or_else(|| format!("unsupported day code `{value}` (expected MON..SUN)"))
    }
}

impl From<Weekday> for DayCode {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
            Weekday::Sun => Self::Sun,
        }
    }
}

/// One rider query. Station names are raw user input until the façade normalizes them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub boarding: String,
    pub destination: String,
    pub hour: u32,
    pub direction: Direction,
    pub day: Option<DayCode>,
}

impl TripRequest {
    pub fn new(
        boarding: impl Into<String>,
        destination: impl Into<String>,
        hour: u32,
        direction: Direction,
    ) -> Self {
        Self {
            boarding: boarding.into(),
            destination: destination.into(),
            hour,
            direction,
            day: None,
        }
    }

    pub fn on_day(mut self, day: DayCode) -> Self {
        self.day = Some(day);
        self
    }

    pub fn day_key(&self) -> DayCode {
        DayCode::cache_key(self.day)
    }
}
