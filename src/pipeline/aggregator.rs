//! Concurrent fan-out over every registered provider.

use super::settle::{settle_all, Settled};
use crate::api::{fallback_dataset, fetch_guarded, DataProvider, FetchStatus};
use crate::models::{DataSource, ObservationRecord};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Per-provider summary of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    pub source: DataSource,
    pub status: FetchStatus,
    pub record_count: usize,
    pub elapsed_ms: u128,
}

/// Everything one pass produced: the concatenated records plus how each provider fared.
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub records: Vec<ObservationRecord>,
    pub reports: Vec<FetchReport>,
    /// Set when every provider came back empty and the fallback dataset was substituted.
    pub used_fallback: bool,
}

/// Runs all providers concurrently and merges their output.
pub struct Aggregator {
    providers: Vec<Arc<dyn DataProvider>>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn DataProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn providers(&self) -> &[Arc<dyn DataProvider>] {
        &self.providers
    }

    /// Fetches from every provider and waits for all of them to settle.
    ///
    /// Always resolves. Results are concatenated in registration order; when
    /// the total is empty the deterministic fallback dataset is returned instead.
    pub async fn fetch_all(&self) -> AggregateResult {
        info!("Fetching from {} providers", self.providers.len());

        let tasks: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let timeout = self.timeout;
                async move { fetch_guarded(provider.as_ref(), timeout).await }
            })
            .collect();

        let mut records = Vec::new();
        let mut reports = Vec::with_capacity(self.providers.len());

        for (provider, outcome) in self.providers.iter().zip(settle_all(tasks).await) {
            match outcome {
                Settled::Fulfilled(fetch) => {
                    reports.push(FetchReport {
                        source: fetch.source,
                        status: fetch.status,
                        record_count: fetch.records.len(),
                        elapsed_ms: fetch.elapsed_ms,
                    });
                    records.extend(fetch.records);
                },
                Settled::Rejected(reason) => {
                    warn!("Provider {} task did not complete: {}", provider.source(), reason);
                    reports.push(FetchReport {
                        source: provider.source(),
                        status: FetchStatus::Failed(reason),
                        record_count: 0,
                        elapsed_ms: 0,
                    });
                },
            }
        }

        let failed = reports
            .iter()
            .filter(|r| matches!(r.status, FetchStatus::Failed(_) | FetchStatus::TimedOut))
            .count();
        if failed > 0 {
            warn!("{} of {} providers failed this pass", failed, reports.len());
        }

        if records.is_empty() {
            warn!("No provider returned data, substituting the fallback dataset");
            return AggregateResult {
                records: fallback_dataset(Utc::now()),
                reports,
                used_fallback: true,
            };
        }

        info!("Aggregated {} records", records.len());
        AggregateResult {
            records,
            reports,
            used_fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fakes::{Behaviour, FakeProvider};
    use crate::models::{AqiCategory, Coordinates, Pollutants, StationLocation};

    fn record(id: &str, source: DataSource) -> ObservationRecord {
        ObservationRecord {
            id: id.to_string(),
            location: StationLocation {
                name: id.to_string(),
                coordinates: Some(Coordinates::new(4.9, 52.37)),
                city: Some("Amsterdam".to_string()),
                region: Some("NL".to_string()),
            },
            parameters: Pollutants::default(),
            aqi: 30,
            aqi_category: AqiCategory::Good,
            source,
            timestamp: Utc::now(),
            last_updated: None,
        }
    }

    #[tokio::test]
    async fn test_concatenates_successful_results() {
        let aggregator = Aggregator::new(
            vec![
                FakeProvider::returning(DataSource::OpenAq, vec![record("a", DataSource::OpenAq)]),
                FakeProvider::with(DataSource::Waqi, Behaviour::Fail("503".into())),
                FakeProvider::returning(
                    DataSource::SensorCommunity,
                    vec![
                        record("b", DataSource::SensorCommunity),
                        record("c", DataSource::SensorCommunity),
                    ],
                ),
            ],
            Duration::from_secs(5),
        );

        let result = aggregator.fetch_all().await;

        assert!(!result.used_fallback);
        let ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(result.reports.len(), 3);
        assert_eq!(result.reports[0].record_count, 1);
        assert!(matches!(result.reports[1].status, FetchStatus::Failed(_)));
        assert_eq!(result.reports[2].record_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_providers_failing_yields_fallback() {
        let aggregator = Aggregator::new(
            vec![
                FakeProvider::with(DataSource::OpenAq, Behaviour::Fail("401".into())),
                FakeProvider::with(DataSource::Waqi, Behaviour::Hang),
                FakeProvider::with(DataSource::SensorCommunity, Behaviour::Panic),
            ],
            Duration::from_secs(5),
        );

        let result = aggregator.fetch_all().await;

        assert!(result.used_fallback);
        assert!(!result.records.is_empty());
        assert!(result
            .records
            .iter()
            .all(|r| r.source == DataSource::Fallback));
        assert_eq!(result.reports[1].status, FetchStatus::TimedOut);
        assert!(matches!(result.reports[2].status, FetchStatus::Failed(ref m) if m.contains("blew up")));
    }

    #[tokio::test]
    async fn test_no_providers_still_resolves_with_fallback() {
        let aggregator = Aggregator::new(Vec::new(), Duration::from_secs(5));
        let result = aggregator.fetch_all().await;
        assert!(result.used_fallback);
        assert!(!result.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_does_not_block_past_its_timeout() {
        let aggregator = Aggregator::new(
            vec![
                FakeProvider::with(DataSource::OpenAq, Behaviour::Hang),
                FakeProvider::returning(DataSource::Waqi, vec![record("w", DataSource::Waqi)]),
            ],
            Duration::from_secs(5),
        );
        let started = tokio::time::Instant::now();
        let result = aggregator.fetch_all().await;

        assert!(started.elapsed() < Duration::from_secs(6));
        assert!(!result.used_fallback);
        assert_eq!(result.records.len(), 1);
    }
}
