//! The provider abstraction and its fail-soft call boundary.
//!
//! Every upstream source implements [`DataProvider`]. Callers never invoke
//! `fetch` directly; they go through [`fetch_guarded`], which applies the
//! per-call timeout and converts any failure into an empty result.

use crate::api::{OpenAqProvider, SensorCommunityProvider, WaqiProvider};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{DataSource, ObservationRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One upstream air quality source.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Tag stamped on every record this provider produces.
    fn source(&self) -> DataSource;

    /// Whether the provider has what it needs (usually an API key) to make a request.
    fn is_configured(&self) -> bool {
        true
    }

    /// Fetches and normalizes the provider's current readings.
    async fn fetch(&self) -> Result<Vec<ObservationRecord>>;
}

/// How a guarded provider call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "reason")]
pub enum FetchStatus {
    Ok,
    /// No credentials; the network was never touched.
    Skipped,
    Failed(String),
    TimedOut,
}

impl From<&AppError> for FetchStatus {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Timeout(_) => FetchStatus::TimedOut,
            other => FetchStatus::Failed(other.to_string()),
        }
    }
}

/// Result of one guarded provider call. `records` is empty unless `status` is `Ok`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFetch {
    pub source: DataSource,
    pub status: FetchStatus,
    pub records: Vec<ObservationRecord>,
    pub elapsed_ms: u128,
}

/// Calls `provider` under `timeout`. Never returns an error: network failures,
/// bad payloads and timeouts are logged and yield an empty record list.
pub async fn fetch_guarded(provider: &dyn DataProvider, timeout: Duration) -> ProviderFetch {
    let source = provider.source();
    let started = Instant::now();

    if !provider.is_configured() {
        debug!("Provider {} is not configured, skipping", source);
        return ProviderFetch {
            source,
            status: FetchStatus::Skipped,
            records: Vec::new(),
            elapsed_ms: 0,
        };
    }

    let outcome = tokio::time::timeout(timeout, provider.fetch())
        .await
        .unwrap_or_else(|_| Err(AppError::Timeout(timeout.as_secs())));

    let (status, records) = match outcome {
        Ok(records) => {
            info!("Provider {} returned {} records", source, records.len());
            (FetchStatus::Ok, records)
        },
        Err(e) => {
            warn!("Provider {} failed: {}", source, e);
            (FetchStatus::from(&e), Vec::new())
        },
    };

    ProviderFetch {
        source,
        status,
        records,
        elapsed_ms: started.elapsed().as_millis(),
    }
}

/// Builds the static provider list from configuration. All providers share one HTTP client.
pub fn default_providers(config: &Config) -> Vec<Arc<dyn DataProvider>> {
    let client = Client::new();
    vec![
        Arc::new(OpenAqProvider::new(
            client.clone(),
            config.openaq_key.clone(),
            &config.openaq_base_url,
        )),
        Arc::new(WaqiProvider::new(
            client.clone(),
            config.waqi_token.clone(),
            &config.waqi_base_url,
            &config.waqi_bounds,
        )),
        Arc::new(SensorCommunityProvider::new(
            client,
            config.sensor_community_enabled,
            &config.sensor_community_base_url,
        )),
    ]
}


#[cfg(test)]
mod tests {
    use super::fakes::{Behaviour, FakeProvider};
    use super::*;
    use crate::api::fallback_dataset;
    use chrono::Utc;

    #[tokio::test]
    async fn test_guarded_success_passes_records_through() {
        let records = fallback_dataset(Utc::now());
        let provider = FakeProvider::returning(DataSource::Waqi, records.clone());
        let fetched = fetch_guarded(provider.as_ref(), Duration::from_secs(5)).await;
        assert_eq!(fetched.status, FetchStatus::Ok);
        assert_eq!(fetched.records.len(), records.len());
    }

    #[tokio::test]
    async fn test_guarded_failure_becomes_empty() {
        let provider = FakeProvider::with(DataSource::OpenAq, Behaviour::Fail("boom".into()));
        let fetched = fetch_guarded(provider.as_ref(), Duration::from_secs(5)).await;
        assert!(fetched.records.is_empty());
        assert!(matches!(fetched.status, FetchStatus::Failed(ref m) if m.contains("boom")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_timeout_abandons_call() {
        let provider = FakeProvider::with(DataSource::OpenAq, Behaviour::Hang);
        let fetched = fetch_guarded(provider.as_ref(), Duration::from_secs(5)).await;
        assert_eq!(fetched.status, FetchStatus::TimedOut);
        assert!(fetched.records.is_empty());
    }

    #[test]
    fn test_fetch_status_from_error() {
        assert_eq!(
            FetchStatus::from(&AppError::Timeout(5)),
            FetchStatus::TimedOut
        );
        assert_eq!(
            FetchStatus::from(&AppError::Provider("HTTP 503".to_string())),
            FetchStatus::Failed("Provider Error: HTTP 503".to_string())
        );
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_skipped() {
        let provider = FakeProvider::with(DataSource::Waqi, Behaviour::Unconfigured);
        let fetched = fetch_guarded(provider.as_ref(), Duration::from_secs(5)).await;
        assert_eq!(fetched.status, FetchStatus::Skipped);
        assert!(fetched.records.is_empty());
    }

    #[test]
    fn test_default_providers_cover_every_live_source() {
        let providers = default_providers(&Config::default());
        let sources: Vec<DataSource> = providers.iter().map(|p| p.source()).collect();
        assert_eq!(
            sources,
            vec![
                DataSource::OpenAq,
                DataSource::Waqi,
                DataSource::SensorCommunity
            ]
        );
        // No keys in the default config.
        assert!(!providers[0].is_configured());
        assert!(!providers[1].is_configured());
        assert!(providers[2].is_configured());
    }
}
