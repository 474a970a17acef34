//! The air quality service: one aggregation pass per request, rankings memoized in the shared cache.

use crate::analysis::{
    best_cities, calculate_country_stats, calculate_stats, city_rankings, worst_cities,
};
use crate::api::default_providers;
use crate::cache::RankingCache;
use crate::config::Config;
use crate::models::{CityAggregate, CountryStats, GlobalStats};
use crate::pipeline::{deduplicate, AggregateResult, Aggregator};
use std::sync::Arc;
use tracing::{debug, info};

const CITY_RANKINGS_KEY: &str = "city-rankings";

fn worst_key(n: usize) -> String {
    format!("worst-cities:{}", n)
}

fn best_key(n: usize) -> String {
    format!("best-cities:{}", n)
}

/// Owns the provider fan-out and a handle to the process-wide ranking cache.
pub struct AirQualityService {
    aggregator: Aggregator,
    cache: Arc<RankingCache>,
}

impl AirQualityService {
    pub fn new(aggregator: Aggregator, cache: Arc<RankingCache>) -> Self {
        Self { aggregator, cache }
    }

    /// Registers the live providers described by `config`.
    pub fn from_config(config: &Config, cache: Arc<RankingCache>) -> Self {
        let aggregator = Aggregator::new(default_providers(config), config.provider_timeout);
        Self::new(aggregator, cache)
    }

    pub fn provider_count(&self) -> usize {
        self.aggregator.providers().len()
    }

    pub fn cache(&self) -> &Arc<RankingCache> {
        &self.cache
    }

    /// Fetches from every provider and deduplicates the combined records.
    pub async fn snapshot(&self) -> AggregateResult {
        let mut result = self.aggregator.fetch_all().await;
        let fetched = result.records.len();
        result.records = deduplicate(result.records);
        info!(
            "Snapshot holds {} stations ({} before deduplication)",
            result.records.len(),
            fetched
        );
        result
    }

    pub async fn stats(&self) -> GlobalStats {
        calculate_stats(&self.snapshot().await.records)
    }

    pub async fn country_stats(&self) -> Vec<CountryStats> {
        calculate_country_stats(&self.snapshot().await.records)
    }

    /// Every ranked city, in first-seen order.
    pub async fn city_rankings(&self) -> Vec<CityAggregate> {
        if let Some(hit) = self.cache.get(CITY_RANKINGS_KEY) {
            debug!("Ranking cache hit for {}", CITY_RANKINGS_KEY);
            return hit;
        }
        debug!("Ranking cache miss for {}, fetching", CITY_RANKINGS_KEY);

        let snapshot = self.snapshot().await;
        let ranked = city_rankings(&snapshot.records);
        self.cache.set(CITY_RANKINGS_KEY, ranked.clone());
        ranked
    }

    pub async fn worst_cities(&self, n: usize) -> Vec<CityAggregate> {
        self.cached_selection(&worst_key(n), |all| worst_cities(all, n))
            .await
    }

    pub async fn best_cities(&self, n: usize) -> Vec<CityAggregate> {
        self.cached_selection(&best_key(n), |all| best_cities(all, n))
            .await
    }

    /// Drops every cached ranking; the next request recomputes from fresh data.
    pub fn clear_cache(&self) -> usize {
        let dropped = self.cache.len();
        debug!("Dropping cached rankings {:?}", self.cache.keys());
        self.cache.clear();
        info!("Cleared {} cached rankings", dropped);
        dropped
    }

    /// Selections are derived from the cached city list, so every query key
    /// reflects the same snapshot until that list expires.
    async fn cached_selection<F>(&self, key: &str, select: F) -> Vec<CityAggregate>
    where
        F: FnOnce(&[CityAggregate]) -> Vec<CityAggregate>,
    {
        if let Some(hit) = self.cache.get(key) {
            debug!("Ranking cache hit for {}", key);
            return hit;
        }
        debug!("Ranking cache miss for {}, selecting from city rankings", key);

        let selected = select(&self.city_rankings().await);
        self.cache.set(key, selected.clone());
        selected
    }
}
