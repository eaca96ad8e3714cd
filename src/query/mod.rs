//! Fetch-through caching in front of the API client. Reads go through a [QueryCache] keyed by
//! what was asked for; writes go straight to the server and invalidate the keys they affect.

pub mod repository;

use std::{collections::HashMap, future::Future, hash::Hash, sync::Arc, sync::Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::utils::clock::Clock;

struct Cached<V> {
    value: V,
    fetched_at: DateTime<Utc>,
}

pub struct QueryCache<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, Cached<V>>>,
    stale_after: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Eq + Hash + Clone, V: Clone> QueryCache<K, V> {
    pub fn new(name: &'static str, stale_after: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            stale_after,
            clock,
        }
    }

    /// The cached value for `key` unless it is older than the stale time.
    pub fn get_fresh(&self, key: &K) -> Option<V> {
        let now = self.clock.time();
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|cached| now - cached.fetched_at < self.stale_after)
            .map(|cached| cached.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let fetched_at = self.clock.time();
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, Cached { value, fetched_at });
        }
    }

    pub fn invalidate(&self, key: &K) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    pub fn invalidate_all(&self) {
        trace!("Invalidating {} queries", self.name);
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Returns the fresh cached value or runs `fetch` and caches its success.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get_fresh(&key) {
            trace!("Cache hit for {} query", self.name);
            return Ok(value);
        }
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use super::QueryCache;
    use crate::utils::clock::test_clock::ManualClock;

    fn cache(clock: Arc<ManualClock>) -> QueryCache<u32, String> {
        QueryCache::new("test", Duration::seconds(30), clock)
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn fresh_value_skips_fetch() {
        let cache = cache(clock());
        let first: Result<_, ()> = cache.get_or_fetch(1, || async { Ok("a".to_string()) }).await;
        assert_eq!(first, Ok("a".to_string()));
        let second = cache.get_or_fetch(1, || async { Err(()) }).await;
        assert_eq!(second, Ok("a".to_string()));
    }

    #[tokio::test]
    async fn stale_value_is_refetched() {
        let clock = clock();
        let cache = cache(clock.clone());
        cache.insert(1, "old".into());
        clock.advance(Duration::seconds(30));
        assert_eq!(cache.get_fresh(&1), None);

        let value: Result<_, ()> = cache.get_or_fetch(1, || async { Ok("new".to_string()) }).await;
        assert_eq!(value, Ok("new".to_string()));
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = cache(clock());
        let failed: Result<String, &str> = cache.get_or_fetch(1, || async { Err("offline") }).await;
        assert_eq!(failed, Err("offline"));
        assert_eq!(cache.get_fresh(&1), None);
    }

    #[test]
    fn invalidation_drops_keys() {
        let cache = cache(clock());
        cache.insert(1, "a".into());
        cache.insert(2, "b".into());
        cache.invalidate(&1);
        assert_eq!(cache.get_fresh(&1), None);
        assert_eq!(cache.get_fresh(&2), Some("b".into()));
        cache.invalidate_all();
        assert_eq!(cache.get_fresh(&2), None);
    }
}
