//! Data models for tripcast
//!
//! - Location: Geographic coordinates and metadata
//! - Forecast: Raw forecast samples and per-location collections

pub mod forecast;
pub mod location;

pub use forecast::{ForecastSample, LocationForecast};
pub use location::Location;
