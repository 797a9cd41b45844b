//! Configuration management for `tripcast`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TripcastError;
use crate::catalog::{CatalogEntry, Preset};
use crate::summary::{DEFAULT_WINDOW, ShortSequencePolicy};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for `tripcast`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripcastConfig {
    /// Weather API configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Scoring window and report size
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Which locations to rank
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Report delivery
    #[serde(default)]
    pub email: EmailConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Supported forecast sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherProviderKind {
    /// OpenWeatherMap 3-hourly forecast (API key required)
    #[default]
    OpenWeatherMap,
    /// Open-Meteo hourly forecast (no key)
    OpenMeteo,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast source
    #[serde(default)]
    pub provider: WeatherProviderKind,
    /// OpenWeatherMap API key, falls back to the `WEATHER_TOKEN` env var
    pub api_key: Option<String>,
    /// Base URL for the OpenWeatherMap API
    #[serde(default = "default_openweathermap_url")]
    pub openweathermap_url: String,
    /// Base URL for the Open-Meteo forecast API
    #[serde(default = "default_open_meteo_url")]
    pub open_meteo_url: String,
    /// Base URL for the Open-Meteo geocoding API
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_weather_max_retries")]
    pub max_retries: u32,
}

/// Ranking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Number of leading forecast samples averaged per location
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Maximum number of entries in the report
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Behaviour for forecasts shorter than the window
    #[serde(default)]
    pub short_sequence_policy: ShortSequencePolicy,
}

/// Catalog settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Built-in catalog used when no locations are listed
    #[serde(default)]
    pub preset: Preset,
    /// Custom locations, in ranking tie-break order
    #[serde(default)]
    pub locations: Vec<CatalogEntry>,
}

/// Supported report transports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Gmail REST API with OAuth2
    #[default]
    Gmail,
    /// Plain SMTP relay with username and password
    Smtp,
}

/// Email delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// How the report is delivered
    #[serde(default)]
    pub transport: TransportKind,
    /// Sender address, falls back to the SMTP username
    pub sender: Option<String>,
    /// Subject line of the report
    #[serde(default = "default_email_subject")]
    pub subject: String,
    /// SMTP relay host
    #[serde(default = "default_smtp_relay")]
    pub smtp_relay: String,
    /// Gmail API base URL
    #[serde(default = "default_gmail_url")]
    pub gmail_url: String,
    /// Google installed-app client secrets file
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Forecast cache TTL in minutes, 0 disables forecast caching
    #[serde(default = "default_forecast_ttl")]
    pub forecast_ttl_minutes: u32,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint; export is off when unset
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_openweathermap_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_open_meteo_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_weather_max_retries() -> u32 {
    3
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW
}

fn default_max_entries() -> usize {
    crate::report::MAX_REPORT_ENTRIES
}

fn default_email_subject() -> String {
    "Weather Forecast for Your Destinations".to_string()
}

fn default_smtp_relay() -> String {
    "smtp.gmail.com".to_string()
}

fn default_gmail_url() -> String {
    "https://gmail.googleapis.com".to_string()
}

fn default_credentials_file() -> String {
    "credentials.json".to_string()
}

fn default_forecast_ttl() -> u32 {
    60
}

fn default_cache_location() -> String {
    "~/.cache/tripcast".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: WeatherProviderKind::default(),
            api_key: None,
            openweathermap_url: default_openweathermap_url(),
            open_meteo_url: default_open_meteo_url(),
            geocoding_url: default_geocoding_url(),
            timeout_seconds: default_weather_timeout(),
            max_retries: default_weather_max_retries(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            max_entries: default_max_entries(),
            short_sequence_policy: ShortSequencePolicy::default(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            sender: None,
            subject: default_email_subject(),
            smtp_relay: default_smtp_relay(),
            gmail_url: default_gmail_url(),
            credentials_file: default_credentials_file(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            forecast_ttl_minutes: default_forecast_ttl(),
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl WeatherConfig {
    /// The configured API key, or the `WEATHER_TOKEN` environment variable
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var("WEATHER_TOKEN").ok().filter(|key| !key.is_empty()))
    }
}

impl CacheConfig {
    /// Cache directory with a leading `~` expanded
    #[must_use]
    pub fn resolved_location(&self) -> PathBuf {
        match self.location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(rest)),
            None => PathBuf::from(&self.location),
        }
    }
}

impl TripcastConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRIPCAST_WEATHER__API_KEY overrides weather.api_key
        builder = builder.add_source(
            Environment::with_prefix("TRIPCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TripcastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tripcast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.openweathermap_url.is_empty() {
            self.weather.openweathermap_url = default_openweathermap_url();
        }
        if self.weather.open_meteo_url.is_empty() {
            self.weather.open_meteo_url = default_open_meteo_url();
        }
        if self.weather.geocoding_url.is_empty() {
            self.weather.geocoding_url = default_geocoding_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.email.subject.is_empty() {
            self.email.subject = default_email_subject();
        }
        if self.email.smtp_relay.is_empty() {
            self.email.smtp_relay = default_smtp_relay();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_catalog()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(TripcastError::config("Weather API timeout cannot exceed 300 seconds").into());
        }

        if self.weather.max_retries > 10 {
            return Err(TripcastError::config("Weather API max retries cannot exceed 10").into());
        }

        if !(1..=40).contains(&self.ranking.window_size) {
            return Err(TripcastError::config("Ranking window size must be between 1 and 40").into());
        }

        if !(1..=100).contains(&self.ranking.max_entries) {
            return Err(TripcastError::config("Report max entries must be between 1 and 100").into());
        }

        if self.cache.forecast_ttl_minutes > 24 * 60 {
            return Err(TripcastError::config("Forecast cache TTL cannot exceed 1440 minutes (1 day)").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TripcastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TripcastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("weather.openweathermap_url", &self.weather.openweathermap_url),
            ("weather.open_meteo_url", &self.weather.open_meteo_url),
            ("weather.geocoding_url", &self.weather.geocoding_url),
            ("email.gmail_url", &self.email.gmail_url),
        ];
        for (key, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TripcastError::config(format!("{key} must be a valid HTTP or HTTPS URL")).into());
            }
        }

        if let Some(endpoint) = &self.logging.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(TripcastError::config("logging.otlp_endpoint must be a valid HTTP or HTTPS URL").into());
            }
        }

        Ok(())
    }

    /// Validate custom catalog entries
    fn validate_catalog(&self) -> Result<()> {
        for entry in &self.catalog.locations {
            if entry.name.trim().is_empty() {
                return Err(TripcastError::config("Catalog location names cannot be empty").into());
            }
            if entry.latitude.is_some() != entry.longitude.is_some() {
                return Err(TripcastError::config(format!(
                    "Catalog location '{}' must set both latitude and longitude, or neither",
                    entry.name
                ))
                .into());
            }
            if let Some(location) = entry.to_location() {
                location.validate()?;
            }
        }
        Ok(())
    }
}
