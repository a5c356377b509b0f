//! Optional weather adjustment of the time-of-day multiplier.
//!
//! Providers live outside the engine. Whatever they return is checked here, and any error or
//! unusable factor means "no adjustment".

use serde::{Deserialize, Serialize};

use crate::errors::WeatherError;

pub const PRECIPITATION_FACTOR: f64 = 1.15;
pub const EXTREME_TEMPERATURE_FACTOR: f64 = 1.08;

pub trait WeatherService: Send + Sync {
    /// Multiplier applied to α(h); 1.0 means no effect.
    fn weather_factor(&self) -> Result<f64, WeatherError>;
}

impl<F> WeatherService for F
where
    F: Fn() -> Result<f64, WeatherError> + Send + Sync,
{
    fn weather_factor(&self) -> Result<f64, WeatherError> {
        self()
    }
}

/// Always returns the same factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedWeather(pub f64);

impl WeatherService for FixedWeather {
    fn weather_factor(&self) -> Result<f64, WeatherError> {
        Ok(self.0)
    }
}

/// Current conditions as reported by a forecast feed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// 0 none, 1 rain, 2 rain and snow, 3 snow, 4 shower.
    pub precipitation_type: u8,
    pub temperature_c: f64,
}

impl WeatherObservation {
    pub fn factor(&self) -> f64 {
        if (1..=4).contains(&self.precipitation_type) {
            PRECIPITATION_FACTOR
        } else if self.temperature_c >= 33.0 || self.temperature_c <= -5.0 {
            EXTREME_TEMPERATURE_FACTOR
        } else {
            1.0
        }
    }
}

impl WeatherService for WeatherObservation {
    fn weather_factor(&self) -> Result<f64, WeatherError> {
        if !self.temperature_c.is_finite() {
            return Err(WeatherError::Malformed("temperature is not a number".to_string()));
        }
        Ok(self.factor())
    }
}

/// Asks the service once and keeps only finite positive factors.
pub fn checked_factor(service: &dyn WeatherService) -> Result<f64, WeatherError> {
    let factor = service.weather_factor()?;
    if factor.is_finite() && factor > 0.0 {
        Ok(factor)
    } else {
        Err(WeatherError::Malformed(format!("factor {factor} is not a positive number")))
    }
}
