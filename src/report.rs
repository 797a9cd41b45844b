//! Ranking and report rendering
//!
//! Orders scored locations, assigns dense ranks and renders the plain-text
//! body that is mailed to the user.

use std::cmp::Reverse;
use std::fmt;

use serde::Serialize;

use crate::models::LocationForecast;
use crate::scoring::{MAX_SCORE, ScoredLocation};

/// Default number of entries kept in a report
pub const MAX_REPORT_ENTRIES: usize = 10;

/// Mean precipitation (mm) from which rain counts as heavy
pub const HEAVY_RAIN_THRESHOLD: f64 = 2.0;

/// Qualitative description of a location's mean precipitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RainOutlook {
    Dry,
    Light,
    Heavy,
}

impl RainOutlook {
    /// Classify a mean precipitation in mm
    #[must_use]
    pub fn from_mean_precipitation(mean_precipitation: f64) -> Self {
        if mean_precipitation == 0.0 {
            Self::Dry
        } else if mean_precipitation > 0.0 && mean_precipitation < HEAVY_RAIN_THRESHOLD {
            Self::Light
        } else {
            Self::Heavy
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dry => "no rain expected",
            Self::Light => "light rain expected",
            Self::Heavy => "heavy rain expected",
        }
    }
}

impl fmt::Display for RainOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One line-up position in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based dense rank
    pub rank: usize,
    pub scored: ScoredLocation,
}

impl RankedEntry {
    /// Mean temperature rounded to whole degrees, ties to even
    #[must_use]
    pub fn rounded_temperature(&self) -> i64 {
        self.scored.stats.mean_temperature.round_ties_even() as i64
    }

    #[must_use]
    pub fn rain_outlook(&self) -> RainOutlook {
        RainOutlook::from_mean_precipitation(self.scored.stats.mean_precipitation)
    }
}

impl fmt::Display for RankedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}. {} Forecast:", self.rank, self.scored.location.name)?;
        writeln!(f, "      Average Temperature: {}°C", self.rounded_temperature())?;
        writeln!(f, "      Rain: {}", self.rain_outlook())?;
        write!(f, "      Match Score: {}/{}", self.scored.score, MAX_SCORE)
    }
}

/// Ranked, truncated view of a ranking run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedReport {
    pub entries: Vec<RankedEntry>,
}

impl RankedReport {
    /// Rank `scored` (given in catalog order) by descending score.
    ///
    /// The sort is stable on the score alone, so equal scores keep their
    /// catalog order. Only the first `max_entries` positions are kept.
    #[must_use]
    pub fn rank(scored: &[ScoredLocation], max_entries: usize) -> Self {
        let mut ordered: Vec<&ScoredLocation> = scored.iter().collect();
        ordered.sort_by_key(|s| Reverse(s.score));

        let entries = ordered
            .into_iter()
            .take(max_entries)
            .enumerate()
            .map(|(index, scored)| RankedEntry {
                rank: index + 1,
                scored: scored.clone(),
            })
            .collect();

        Self { entries }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Render the report as one text block, entries separated by a blank line
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RankedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Render the leading `window` samples of each forecast, sample by sample
#[must_use]
pub fn render_forecast_digest(forecasts: &[LocationForecast], window: usize) -> String {
    forecasts
        .iter()
        .map(|forecast| {
            let samples = forecast
                .window(window)
                .iter()
                .map(|sample| {
                    format!(
                        "Date: {}\nTemperature: {}\nDescription: {}\nWind Speed: {}\nPrecipitation: {}",
                        sample.timestamp.format("%Y-%m-%d %H:%M"),
                        sample.format_temperature(),
                        sample.description,
                        sample.format_wind(),
                        sample.format_precipitation(),
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            format!("{} Forecast:\n\n{samples}\n", forecast.location.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
