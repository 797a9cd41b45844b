//! `tripcast` - rank holiday destinations by how well their weather
//! forecast matches a traveler's preference
//!
//! The core (summary, scoring, report) is pure and synchronous. Forecast
//! providers, the persistent cache, catalog resolution and report delivery
//! form the async I/O layer around it.

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod email;
pub mod error;
pub mod location_resolver;
pub mod models;
pub mod prompt;
pub mod ranking;
pub mod report;
pub mod scoring;
pub mod summary;
pub mod telemetry;
pub mod weather;

// Re-export core types for public API
pub use cache::PersistentCache;
pub use catalog::{Catalog, CatalogEntry, Preset};
pub use config::TripcastConfig;
pub use email::ReportTransport;
pub use error::TripcastError;
pub use models::{ForecastSample, Location, LocationForecast};
pub use ranking::{RankingOutcome, RankingService, RankingSettings, SkippedLocation};
pub use report::{RainOutlook, RankedEntry, RankedReport};
pub use scoring::{Preference, RainfallChoice, ScoredLocation};
pub use summary::{LocationStats, ShortSequencePolicy, summarize};
pub use weather::ForecastProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TripcastError>;
