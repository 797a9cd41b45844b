//! Ranking run orchestration
//!
//! Walks the catalog one location at a time: fetch, summarize, score. A
//! location whose forecast cannot be fetched or summarized is logged,
//! recorded as skipped and left out; the others are still ranked.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::catalog::Catalog;
use crate::config::RankingConfig;
use crate::models::{Location, LocationForecast};
use crate::report::RankedReport;
use crate::scoring::{Preference, ScoredLocation};
use crate::summary::{self, ShortSequencePolicy};
use crate::weather::ForecastProvider;

/// Window, report size and short-forecast policy of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingSettings {
    pub window: usize,
    pub max_entries: usize,
    pub policy: ShortSequencePolicy,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            window: summary::DEFAULT_WINDOW,
            max_entries: crate::report::MAX_REPORT_ENTRIES,
            policy: ShortSequencePolicy::default(),
        }
    }
}

impl From<&RankingConfig> for RankingSettings {
    fn from(config: &RankingConfig) -> Self {
        Self {
            window: config.window_size,
            max_entries: config.max_entries,
            policy: config.short_sequence_policy,
        }
    }
}

/// A location left out of the ranking, with the reason
#[derive(Debug, Clone, Serialize)]
pub struct SkippedLocation {
    pub location: Location,
    pub reason: String,
}

/// Result of a ranking run
#[derive(Debug, Clone)]
pub struct RankingOutcome {
    /// Every successfully scored location, in catalog order
    pub scored: Vec<ScoredLocation>,
    pub report: RankedReport,
    pub skipped: Vec<SkippedLocation>,
}

pub struct RankingService<'a> {
    provider: &'a dyn ForecastProvider,
    settings: RankingSettings,
}

impl<'a> RankingService<'a> {
    pub fn new(provider: &'a dyn ForecastProvider, settings: RankingSettings) -> Self {
        Self { provider, settings }
    }

    /// Score every catalog location against `preference` and rank them
    #[instrument(skip_all, fields(locations = catalog.len(), provider = self.provider.name()))]
    pub async fn rank(&self, catalog: &Catalog, preference: &Preference) -> RankingOutcome {
        let mut scored = Vec::with_capacity(catalog.len());
        let mut skipped = Vec::new();

        for location in catalog.locations() {
            let samples = match self.provider.fetch_forecast(location).await {
                Ok(samples) => samples,
                Err(e) => {
                    warn!("Skipping {}: forecast fetch failed: {e:#}", location.name);
                    skipped.push(SkippedLocation {
                        location: location.clone(),
                        reason: format!("{e:#}"),
                    });
                    continue;
                }
            };

            // Time order decides which samples fall inside the window
            let forecast = LocationForecast::new(location.clone(), samples);

            match summary::summarize(
                &location.name,
                &forecast.samples,
                self.settings.window,
                self.settings.policy,
            ) {
                Ok(stats) => {
                    let entry = ScoredLocation::new(location.clone(), stats, preference);
                    info!(
                        "{}: mean {:.1}°C, {:.2} mm, score {}",
                        location.name, stats.mean_temperature, stats.mean_precipitation, entry.score
                    );
                    scored.push(entry);
                }
                Err(e) => {
                    warn!("Skipping {}: {e}", location.name);
                    skipped.push(SkippedLocation {
                        location: location.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let report = RankedReport::rank(&scored, self.settings.max_entries);
        info!(
            "Ranked {} locations ({} skipped)",
            scored.len(),
            skipped.len()
        );

        RankingOutcome {
            scored,
            report,
            skipped,
        }
    }

    /// Fetch every catalog location's forecast without scoring.
    ///
    /// Failed fetches are skipped the same way as in [`Self::rank`].
    pub async fn collect_forecasts(&self, catalog: &Catalog) -> (Vec<LocationForecast>, Vec<SkippedLocation>) {
        let mut forecasts = Vec::with_capacity(catalog.len());
        let mut skipped = Vec::new();

        for location in catalog.locations() {
            match self.provider.fetch_forecast(location).await {
                Ok(samples) => forecasts.push(LocationForecast::new(location.clone(), samples)),
                Err(e) => {
                    warn!("Skipping {}: forecast fetch failed: {e:#}", location.name);
                    skipped.push(SkippedLocation {
                        location: location.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        (forecasts, skipped)
    }
}
