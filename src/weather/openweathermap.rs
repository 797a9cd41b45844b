//! OpenWeatherMap 5 day / 3 hour forecast client

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ForecastProvider, describe_request_error};
use crate::TripcastError;
use crate::models::{ForecastSample, Location};

pub struct OpenWeatherMapClient {
    http: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl OpenWeatherMapClient {
    #[must_use]
    pub fn new(http: ClientWithMiddleware, base_url: &str, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Error text with the API key masked
    fn redacted(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.api_key, "<redacted>")
        }
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherMapClient {
    fn name(&self) -> &'static str {
        "openweathermap"
    }

    #[instrument(skip(self, location), fields(location = %location.name))]
    async fn fetch_forecast(&self, location: &Location) -> Result<Vec<ForecastSample>> {
        let url = format!(
            "{}/forecast?lat={}&lon={}&appid={}&units=metric",
            self.base_url,
            location.latitude,
            location.longitude,
            urlencoding::encode(&self.api_key)
        );
        debug!("Requesting forecast for {}", location.format_coordinates());

        let response = self.http.get(&url).send().await.map_err(|e| {
            TripcastError::api(format!(
                "Forecast request for {} failed: {}",
                location.name,
                self.redacted(&describe_request_error(e))
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<response::ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(TripcastError::api(format!(
                "OpenWeatherMap returned {status} for {}: {}",
                location.name,
                self.redacted(&message)
            ))
            .into());
        }

        let forecast: response::ForecastResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| "Failed to parse OpenWeatherMap forecast response")?;

        let samples = forecast.into_samples()?;
        debug!("Received {} forecast samples", samples.len());
        Ok(samples)
    }
}

/// OpenWeatherMap response structures
mod response {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct ErrorBody {
        pub message: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub list: Vec<ForecastEntry>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastEntry {
        /// Unix timestamp of the interval start
        pub dt: i64,
        pub main: MainData,
        #[serde(default)]
        pub weather: Vec<Condition>,
        pub wind: Option<Wind>,
        pub rain: Option<Rain>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MainData {
        pub temp: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Condition {
        pub description: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Wind {
        pub speed: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Rain {
        #[serde(rename = "3h")]
        pub three_hours: Option<f64>,
    }

    impl ForecastResponse {
        pub fn into_samples(self) -> Result<Vec<ForecastSample>> {
            let mut samples = self
                .list
                .into_iter()
                .map(|entry| {
                    let timestamp = DateTime::from_timestamp(entry.dt, 0)
                        .ok_or_else(|| anyhow!("Invalid forecast timestamp {}", entry.dt))?;
                    Ok(ForecastSample {
                        timestamp,
                        temperature: entry.main.temp,
                        precipitation: entry.rain.and_then(|r| r.three_hours).unwrap_or(0.0),
                        description: entry
                            .weather
                            .into_iter()
                            .next()
                            .map_or_else(|| "unknown".to_string(), |c| c.description),
                        wind_speed: entry.wind.map_or(0.0, |w| w.speed),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            samples.sort_by_key(|s| s.timestamp);
            Ok(samples)
        }
    }
}
