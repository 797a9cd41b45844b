use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::RngExt;
use tracing::{debug, warn};

use super::ForecastProvider;
use crate::cache::PersistentCache;
use crate::models::{ForecastSample, Location};

/// Serves forecasts from the persistent cache, fetching on a miss.
///
/// Cache failures never fail a fetch; they are logged and the inner
/// provider is asked instead.
pub struct CachedForecastProvider<P> {
    inner: P,
    cache: Arc<PersistentCache>,
    ttl: Duration,
}

impl<P: ForecastProvider> CachedForecastProvider<P> {
    pub fn new(inner: P, cache: Arc<PersistentCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn jittered_ttl(&self) -> Duration {
        let jitter: f64 = rand::rng().random_range(0.9..1.1);
        self.ttl.mul_f64(jitter)
    }
}

#[async_trait]
impl<P: ForecastProvider> ForecastProvider for CachedForecastProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch_forecast(&self, location: &Location) -> Result<Vec<ForecastSample>> {
        let key = location.cache_key(self.inner.name());

        match self.cache.get::<Vec<ForecastSample>>(&key).await {
            Ok(Some(samples)) => {
                debug!("Using cached forecast for {}", location.name);
                return Ok(samples);
            }
            Ok(None) => {}
            Err(e) => warn!("Forecast cache lookup failed for {}: {e:#}", location.name),
        }

        let samples = self.inner.fetch_forecast(location).await?;

        if let Err(e) = self.cache.put(&key, samples.clone(), self.jittered_ttl()).await {
            warn!("Failed to cache forecast for {}: {e:#}", location.name);
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ForecastProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_forecast(&self, _location: &Location) -> Result<Vec<ForecastSample>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ForecastSample {
                timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
                temperature: 27.0,
                precipitation: 0.0,
                description: "clear sky".to_string(),
                wind_speed: 4.0,
            }])
        }
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(PersistentCache::open(dir.path()).unwrap());
        let provider = CachedForecastProvider::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            cache,
            Duration::from_secs(600),
        );
        let location = Location::new(39.6953, 3.0176, "Mallorca, Spain");

        let first = provider.fetch_forecast(&location).await.unwrap();
        let second = provider.fetch_forecast(&location).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_locations_are_cached_separately() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(PersistentCache::open(dir.path()).unwrap());
        let provider = CachedForecastProvider::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            cache,
            Duration::from_secs(600),
        );

        provider
            .fetch_forecast(&Location::new(39.6953, 3.0176, "Mallorca, Spain"))
            .await
            .unwrap();
        provider
            .fetch_forecast(&Location::new(37.1028, -8.6741, "Lagos, Portugal"))
            .await
            .unwrap();

        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 2);
    }
}
