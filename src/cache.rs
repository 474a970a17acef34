//! Process-local TTL cache for ranking results.
//!
//! The cache is constructed once at startup and shared through an `Arc`; the
//! underlying map sits behind a `Mutex`, and no lock is ever held across an `.await`.

use crate::models::CityAggregate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Cached rankings, keyed by query (e.g. `worst-cities:10`).
pub type RankingCache = TtlCache<Vec<CityAggregate>>;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub data: V,
    pub timestamp: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // Each critical section is a single map operation, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the cached value, or `None` if absent or expired. Expired entries are evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries();
        let entry = entries.get(key)?;
        if entry.is_expired(now) {
            debug!(
                "Cache entry {} expired {:?} after it was set, evicting",
                key,
                now - entry.timestamp
            );
            entries.remove(key);
            return None;
        }
        Some(entry.data.clone())
    }

    /// Stores `data` under `key` with the cache's default TTL, replacing any previous entry.
    pub fn set(&self, key: &str, data: V) {
        self.set_with_ttl(key, data, self.default_ttl);
    }

    /// Stores `data` under `key` for `ttl`, replacing any previous entry.
    pub fn set_with_ttl(&self, key: &str, data: V, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            key: key.to_string(),
            data,
            timestamp: now,
            expires_at: now + ttl,
        };
        self.entries().insert(key.to_string(), entry);
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries().values().map(|e| e.key.clone()).collect();
        keys.sort();
        keys
    }
}

/// Runs `clear_expired` every `interval` until the returned task is aborted.
pub fn spawn_sweeper<V>(cache: Arc<TtlCache<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if cache.is_empty() {
                continue;
            }
            let removed = cache.clear_expired();
            if removed > 0 {
                debug!("Cache sweep removed {} expired entries", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache: TtlCache<Vec<u32>> = TtlCache::default();
        cache.set_with_ttl("k", vec![1, 2, 3], Duration::from_millis(100));
        assert_eq!(cache.get("k"), Some(vec![1, 2, 3]));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("k"), None);
        // `get` already evicted it.
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_expired_removes_stale_entries_only() {
        let cache: TtlCache<&'static str> = TtlCache::default();
        cache.set_with_ttl("stale", "old", Duration::from_millis(100));
        cache.set("fresh", "new");

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.len(), 2, "expired entries stay until swept");
        assert_eq!(cache.clear_expired(), 1);
        assert_eq!(cache.keys(), vec!["fresh".to_string()]);
        assert_eq!(cache.get("fresh"), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_overwrites_and_resets_ttl() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(100));
        cache.set("k", 1);
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.set("k", 2);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_is_valid_exactly_at_expiry() {
        let cache: TtlCache<u32> = TtlCache::default();
        cache.set_with_ttl("k", 7, Duration::from_millis(100));
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(cache.get("k"), Some(7));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_clear() {
        let cache: TtlCache<u32> = TtlCache::default();
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.default_ttl(), DEFAULT_TTL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_in_background() {
        let cache = Arc::new(TtlCache::<u32>::default());
        cache.set_with_ttl("k", 1, Duration::from_millis(100));
        let sweeper = spawn_sweeper(Arc::clone(&cache), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(cache.is_empty());
        sweeper.abort();
    }
}
