//! Raw forecast samples as delivered by a weather provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Location;

/// One forecast data point for a location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastSample {
    /// Start of the forecast interval
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Precipitation over the preceding interval in mm, zero when the source has none
    pub precipitation: f64,
    /// Human-readable description of weather conditions
    pub description: String,
    /// Wind speed in m/s
    pub wind_speed: f64,
}

impl ForecastSample {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{}°C", self.temperature)
    }

    /// Format wind speed with unit
    #[must_use]
    pub fn format_wind(&self) -> String {
        format!("{} m/s", self.wind_speed)
    }

    /// Format precipitation with unit
    #[must_use]
    pub fn format_precipitation(&self) -> String {
        format!("{} mm", self.precipitation)
    }
}

/// Forecast samples for one location, ordered by timestamp
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocationForecast {
    pub location: Location,
    pub samples: Vec<ForecastSample>,
}

impl LocationForecast {
    #[must_use]
    pub fn new(location: Location, mut samples: Vec<ForecastSample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self { location, samples }
    }

    /// The first `window` samples, or fewer when the forecast is short
    #[must_use]
    pub fn window(&self, window: usize) -> &[ForecastSample] {
        &self.samples[..window.min(self.samples.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(hours: i64, temperature: f64) -> ForecastSample {
        ForecastSample {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hours),
            temperature,
            precipitation: 0.0,
            description: "clear sky".to_string(),
            wind_speed: 3.5,
        }
    }

    #[test]
    fn test_new_orders_samples_by_time() {
        let location = Location::new(37.9838, 23.7275, "Athens, Greece");
        let forecast = LocationForecast::new(location, vec![sample(6, 22.0), sample(0, 18.0), sample(3, 20.0)]);

        let temps: Vec<f64> = forecast.samples.iter().map(|s| s.temperature).collect();
        assert_eq!(temps, vec![18.0, 20.0, 22.0]);
    }

    #[test]
    fn test_window_clamps_to_available() {
        let location = Location::new(37.9838, 23.7275, "Athens, Greece");
        let forecast = LocationForecast::new(location, vec![sample(0, 18.0), sample(3, 20.0)]);

        assert_eq!(forecast.window(5).len(), 2);
        assert_eq!(forecast.window(1).len(), 1);
        assert!(forecast.window(0).is_empty());
    }

    #[test]
    fn test_formatting() {
        let s = sample(0, 21.5);
        assert_eq!(s.format_temperature(), "21.5°C");
        assert_eq!(s.format_wind(), "3.5 m/s");
        assert_eq!(s.format_precipitation(), "0 mm");
    }
}
