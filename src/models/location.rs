//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

use crate::{Result, TripcastError};

/// A destination with a fixed coordinate
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Location name (city, region, ski area, etc.)
    pub name: String,
    /// Country name, when known
    pub country: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
            country: None,
        }
    }

    /// Create location with country
    #[must_use]
    pub fn with_country(
        latitude: f64,
        longitude: f64,
        name: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
            country: Some(country.into()),
        }
    }

    /// Check that the coordinate lies on the globe
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TripcastError::validation("Location name cannot be empty"));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(TripcastError::validation(format!(
                "Latitude {} of '{}' must be between -90 and 90",
                self.latitude, self.name
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(TripcastError::validation(format!(
                "Longitude {} of '{}' must be between -180 and 180",
                self.longitude, self.name
            )));
        }
        Ok(())
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Generate the forecast cache key for this location and provider
    #[must_use]
    pub fn cache_key(&self, provider: &str) -> String {
        let (lat, lon) = self.rounded_coordinates(2);
        format!("forecast:{provider}:{lat:.2}:{lon:.2}")
    }
}
