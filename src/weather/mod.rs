//! Forecast retrieval
//!
//! Providers turn a location's coordinate into an ordered list of
//! [`ForecastSample`]s. Retry and timeout policy live in the shared HTTP
//! client built here, never in the ranking core.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{WeatherConfig, WeatherProviderKind};
use crate::models::{ForecastSample, Location};

pub mod cached;
pub mod open_meteo;
pub mod openweathermap;

pub use cached::CachedForecastProvider;
pub use open_meteo::OpenMeteoClient;
pub use openweathermap::OpenWeatherMapClient;

/// Source of raw forecast samples
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Short identifier used in logs and cache keys
    fn name(&self) -> &'static str;

    /// Fetch the forecast for `location`, ordered by timestamp ascending
    async fn fetch_forecast(&self, location: &Location) -> Result<Vec<ForecastSample>>;
}

/// HTTP client with timeout and exponential-backoff retries
pub fn build_http_client(config: &WeatherConfig) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(concat!("tripcast/", env!("CARGO_PKG_VERSION")))
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Request failure text without the request URL, causes included.
///
/// Query strings may carry credentials, so the URL never reaches logs.
pub(crate) fn describe_request_error(error: reqwest_middleware::Error) -> String {
    let error = match error {
        reqwest_middleware::Error::Reqwest(e) => reqwest_middleware::Error::Reqwest(e.without_url()),
        other => other,
    };

    let mut message = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Build the provider selected in the configuration
pub fn provider_from_config(
    config: &WeatherConfig,
    http: ClientWithMiddleware,
) -> Result<Box<dyn ForecastProvider>> {
    let provider: Box<dyn ForecastProvider> = match config.provider {
        WeatherProviderKind::OpenWeatherMap => {
            let api_key = config.resolved_api_key().ok_or_else(|| {
                crate::TripcastError::config(
                    "OpenWeatherMap needs an API key: set weather.api_key, TRIPCAST_WEATHER__API_KEY or WEATHER_TOKEN",
                )
            })?;
            Box::new(OpenWeatherMapClient::new(
                http,
                &config.openweathermap_url,
                api_key,
            ))
        }
        WeatherProviderKind::OpenMeteo => Box::new(OpenMeteoClient::new(http, &config.open_meteo_url)),
    };
    Ok(provider)
}

#[async_trait]
impl<P: ForecastProvider + ?Sized> ForecastProvider for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch_forecast(&self, location: &Location) -> Result<Vec<ForecastSample>> {
        (**self).fetch_forecast(location).await
    }
}
