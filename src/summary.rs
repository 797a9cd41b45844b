//! Forecast summarization
//!
//! Reduces the leading samples of a location's forecast to mean temperature
//! and mean precipitation. Every call returns a fresh value; nothing is
//! accumulated between calls.

use serde::{Deserialize, Serialize};

use crate::models::ForecastSample;
use crate::{Result, TripcastError};

/// Number of leading forecast samples averaged per location
pub const DEFAULT_WINDOW: usize = 5;

/// What to do when a forecast is shorter than the window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortSequencePolicy {
    /// Average over the samples that are available
    #[default]
    Average,
    /// Treat a short forecast as insufficient data
    Reject,
}

/// Summary statistics of a forecast window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationStats {
    /// Mean temperature in Celsius
    pub mean_temperature: f64,
    /// Mean precipitation per interval in mm
    pub mean_precipitation: f64,
    /// Number of samples the means were computed from
    pub sample_count: usize,
}

impl LocationStats {
    #[must_use]
    pub const fn new(mean_temperature: f64, mean_precipitation: f64, sample_count: usize) -> Self {
        Self {
            mean_temperature,
            mean_precipitation,
            sample_count,
        }
    }
}

/// Summarize the first `window` samples of `location`'s forecast.
///
/// Fails with [`TripcastError::InsufficientData`] when there is nothing to
/// average, or when the forecast is short and `policy` is
/// [`ShortSequencePolicy::Reject`].
pub fn summarize(
    location: &str,
    samples: &[ForecastSample],
    window: usize,
    policy: ShortSequencePolicy,
) -> Result<LocationStats> {
    let leading = &samples[..window.min(samples.len())];

    if leading.is_empty() || (policy == ShortSequencePolicy::Reject && leading.len() < window) {
        return Err(TripcastError::insufficient_data(location, samples.len(), window));
    }

    let count = leading.len() as f64;
    let total_temperature: f64 = leading.iter().map(|s| s.temperature).sum();
    let total_precipitation: f64 = leading.iter().map(|s| s.precipitation).sum();

    Ok(LocationStats::new(
        total_temperature / count,
        total_precipitation / count,
        leading.len(),
    ))
}
