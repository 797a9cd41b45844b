//! Location Resolution Module
//!
//! Turns the configured catalog into validated [`Location`]s. Entries that
//! carry a coordinate are used as-is; name-only entries are geocoded through
//! the Open-Meteo geocoding API.

use crate::catalog::{Catalog, CatalogEntry};
use crate::config::CatalogConfig;
use crate::models::Location;
use anyhow::{Context, Result, anyhow};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info};

/// Service for resolving catalog entries
pub struct LocationResolver {
    http: ClientWithMiddleware,
    base_url: String,
}

impl LocationResolver {
    pub fn new(http: ClientWithMiddleware, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the catalog described by `config`: the preset when no custom
    /// locations are listed, otherwise the listed locations in order.
    pub async fn resolve_catalog(&self, config: &CatalogConfig) -> Result<Catalog> {
        if config.locations.is_empty() {
            debug!("Using catalog preset '{}'", config.preset);
            return Ok(Catalog::from_preset(config.preset));
        }

        let mut locations = Vec::with_capacity(config.locations.len());
        for entry in &config.locations {
            locations.push(self.resolve_entry(entry).await?);
        }

        info!("Resolved {} custom catalog locations", locations.len());
        Ok(Catalog::new(locations)?)
    }

    async fn resolve_entry(&self, entry: &CatalogEntry) -> Result<Location> {
        if let Some(location) = entry.to_location() {
            return Ok(location);
        }

        let found = self
            .geocode(&entry.name)
            .await?
            .ok_or_else(|| anyhow!("Location not found: {}", entry.name))?;

        debug!(
            "Found location: {} ({:.4}, {:.4})",
            entry.name, found.latitude, found.longitude
        );

        // Keep the catalog's own name so reports read the way the user wrote them
        Ok(Location {
            name: entry.name.clone(),
            country: entry.country.clone().or(found.country),
            ..found
        })
    }

    /// Geocode a place name; the best match wins
    pub async fn geocode(&self, name: &str) -> Result<Option<Location>> {
        let url = format!(
            "{}/search?name={}&count=1&language=en&format=json",
            self.base_url,
            urlencoding::encode(name)
        );

        debug!("Geocoding location name: {}", name);

        let response: GeocodingResponse = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Geocoding request for '{name}' failed"))?
            .error_for_status()
            .with_context(|| format!("Geocoding request for '{name}' was rejected"))?
            .json()
            .await
            .with_context(|| "Failed to parse OpenMeteo geocoding response")?;

        Ok(response
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(Location::from))
    }
}

/// Geocoding response from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

impl From<GeocodingResult> for Location {
    fn from(result: GeocodingResult) -> Self {
        Location {
            latitude: result.latitude,
            longitude: result.longitude,
            name: result.name,
            country: result.country,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Preset;
    use crate::config::WeatherConfig;
    use crate::weather::build_http_client;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(base_url: &str) -> LocationResolver {
        let config = WeatherConfig {
            max_retries: 0,
            ..WeatherConfig::default()
        };
        LocationResolver::new(build_http_client(&config).unwrap(), base_url)
    }

    #[tokio::test]
    async fn test_preset_when_no_custom_locations() {
        let config = CatalogConfig {
            preset: Preset::Alpine,
            locations: Vec::new(),
        };
        // No server needed: presets never hit the network
        let catalog = resolver("http://127.0.0.1:9").resolve_catalog(&config).await.unwrap();
        assert_eq!(catalog.locations()[1].name, "Sölden");
    }

    #[tokio::test]
    async fn test_name_only_entries_are_geocoded() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("name", "Zermatt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"name": "Zermatt", "latitude": 46.0207, "longitude": 7.7491, "country": "Switzerland"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let config = CatalogConfig {
            preset: Preset::Mediterranean,
            locations: vec![
                CatalogEntry {
                    name: "Funchal".to_string(),
                    latitude: Some(32.6669),
                    longitude: Some(-16.9241),
                    country: None,
                },
                CatalogEntry {
                    name: "Zermatt".to_string(),
                    latitude: None,
                    longitude: None,
                    country: None,
                },
            ],
        };

        let catalog = resolver(&mock_server.uri()).resolve_catalog(&config).await.unwrap();
        let locations = catalog.locations();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].name, "Funchal");
        assert_eq!(locations[1].name, "Zermatt");
        assert_eq!(locations[1].latitude, 46.0207);
        assert_eq!(locations[1].country.as_deref(), Some("Switzerland"));
    }

    #[tokio::test]
    async fn test_unknown_name_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"generationtime_ms": 0.1})))
            .mount(&mock_server)
            .await;

        let config = CatalogConfig {
            preset: Preset::Mediterranean,
            locations: vec![CatalogEntry {
                name: "Atlantis".to_string(),
                latitude: None,
                longitude: None,
                country: None,
            }],
        };

        let err = resolver(&mock_server.uri()).resolve_catalog(&config).await.unwrap_err();
        assert!(err.to_string().contains("Location not found: Atlantis"));
    }
}
