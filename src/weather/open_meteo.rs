//! Open-Meteo hourly forecast client (no API key required)

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, DurationRound, NaiveDateTime, TimeDelta, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ForecastProvider, describe_request_error};
use crate::TripcastError;
use crate::models::{ForecastSample, Location};

pub struct OpenMeteoClient {
    http: ClientWithMiddleware,
    base_url: String,
}

impl OpenMeteoClient {
    #[must_use]
    pub fn new(http: ClientWithMiddleware, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    fn name(&self) -> &'static str {
        "openmeteo"
    }

    #[instrument(skip(self, location), fields(location = %location.name))]
    async fn fetch_forecast(&self, location: &Location) -> Result<Vec<ForecastSample>> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&hourly=temperature_2m,precipitation,weathercode,windspeed_10m&wind_speed_unit=ms&timezone=UTC&forecast_days=3",
            self.base_url, location.latitude, location.longitude
        );
        debug!("OpenMeteo API request URL: {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            TripcastError::api(format!(
                "Forecast request for {} failed: {}",
                location.name,
                describe_request_error(e)
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TripcastError::api(format!(
                "OpenMeteo returned {status} for {}",
                location.name
            ))
            .into());
        }

        let forecast: ForecastResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse OpenMeteo forecast response")?;

        let current_hour = Utc::now()
            .duration_trunc(TimeDelta::hours(1))
            .unwrap_or_else(|_| Utc::now());
        let samples = forecast.into_samples(current_hour);
        debug!("Received {} upcoming hourly samples", samples.len());
        Ok(samples)
    }
}

/// Forecast response from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Option<HourlyData>,
}

/// Hourly weather data from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct HourlyData {
    time: Vec<String>,
    #[serde(rename = "temperature_2m")]
    temperature: Option<Vec<Option<f64>>>,
    precipitation: Option<Vec<Option<f64>>>,
    #[serde(rename = "weathercode")]
    weather_code: Option<Vec<Option<u8>>>,
    #[serde(rename = "windspeed_10m")]
    wind_speed: Option<Vec<Option<f64>>>,
}

fn value_at<T: Copy>(series: Option<&Vec<Option<T>>>, index: usize) -> Option<T> {
    series.and_then(|values| values.get(index).copied().flatten())
}

impl ForecastResponse {
    /// Samples from `not_before` onwards; hours without a temperature are skipped
    fn into_samples(self, not_before: DateTime<Utc>) -> Vec<ForecastSample> {
        let Some(hourly) = self.hourly else {
            return Vec::new();
        };

        hourly
            .time
            .iter()
            .enumerate()
            .filter_map(|(i, time)| {
                let timestamp = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M")
                    .ok()?
                    .and_utc();
                if timestamp < not_before {
                    return None;
                }
                let temperature = value_at(hourly.temperature.as_ref(), i)?;
                let code = value_at(hourly.weather_code.as_ref(), i);
                Some(ForecastSample {
                    timestamp,
                    temperature,
                    precipitation: value_at(hourly.precipitation.as_ref(), i).unwrap_or(0.0),
                    description: code
                        .map_or("Unknown", weather_code_to_description)
                        .to_string(),
                    wind_speed: value_at(hourly.wind_speed.as_ref(), i).unwrap_or(0.0),
                })
            })
            .collect()
    }
}

/// Convert `OpenMeteo` weather code to human-readable description
#[must_use]
pub fn weather_code_to_description(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn response() -> ForecastResponse {
        serde_json::from_value(json!({
            "latitude": 46.96,
            "longitude": 11.0,
            "hourly": {
                "time": ["2024-01-15T08:00", "2024-01-15T09:00", "2024-01-15T10:00", "2024-01-15T11:00"],
                "temperature_2m": [-6.0, -5.5, null, -3.0],
                "precipitation": [0.0, 0.4, 0.0, null],
                "weathercode": [0, 71, 3, 73],
                "windspeed_10m": [1.2, 2.5, 2.0, 3.1]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_into_samples_drops_past_hours() {
        let not_before = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let samples = response().into_samples(not_before);

        // 08:00 is in the past, 10:00 has no temperature
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp, not_before);
        assert_eq!(samples[0].temperature, -5.5);
        assert_eq!(samples[0].precipitation, 0.4);
        assert_eq!(samples[0].description, "Slight snow fall");
        assert_eq!(samples[1].precipitation, 0.0);
        assert_eq!(samples[1].wind_speed, 3.1);
    }

    #[test]
    fn test_missing_hourly_block() {
        let response: ForecastResponse = serde_json::from_value(json!({"latitude": 0.0})).unwrap();
        assert!(response.into_samples(Utc::now()).is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_an_api_error() {
        use crate::config::WeatherConfig;
        use crate::weather::build_http_client;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": true, "reason": "bad latitude"})))
            .mount(&mock_server)
            .await;

        let config = WeatherConfig {
            max_retries: 0,
            ..WeatherConfig::default()
        };
        let client = OpenMeteoClient::new(build_http_client(&config).unwrap(), &mock_server.uri());
        let err = client
            .fetch_forecast(&Location::new(46.96, 11.0, "Sölden"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TripcastError>(),
            Some(TripcastError::Api { .. })
        ));
        assert!(err.to_string().contains("Sölden"));
    }

    #[test]
    fn test_weather_code_to_description() {
        assert_eq!(weather_code_to_description(0), "Clear sky");
        assert_eq!(weather_code_to_description(65), "Heavy rain");
        assert_eq!(weather_code_to_description(200), "Unknown");
    }
}
