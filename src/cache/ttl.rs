//! Namespaced, expiring key-value cache.
//!
//! Entries expire lazily: there is no background sweep, an expired entry is
//! deleted the first time a read finds it. Corrupt entries are likewise
//! deleted and reported as a miss; nothing in this layer throws at callers.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::store::KeyValueStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
    /// Epoch millis at which the entry was stored
    stored_at: i64,
    ttl_ms: i64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.stored_at >= self.ttl_ms
    }
}

/// Diagnostic snapshot of a cache prefix. Reporting only; taking stats
/// never evicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub approximate_size_bytes: usize,
}

/// Expiring cache under a single key prefix.
///
/// Logically distinct caches (reference data vs. admin listings) take
/// disjoint prefixes so clearing one can never touch the other.
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl TtlCache {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn scope(&self) -> String {
        format!("{}:", self.prefix)
    }

    fn entry_key(&self, namespace: &str, params: Option<&str>) -> String {
        match params {
            Some(p) => format!("{}:{}:{}", self.prefix, namespace, p),
            None => format!("{}:{}", self.prefix, namespace),
        }
    }

    /// Canonical key fragment for a params value.
    fn canonical_params<P: Serialize>(params: &P) -> Option<String> {
        match serde_json::to_string(params) {
            Ok(s) => Some(s),
            Err(e) => {
                debug!(error = %e, "Unserializable cache params");
                None
            }
        }
    }

    pub fn get<T: DeserializeOwned>(&self, namespace: &str) -> Option<T> {
        self.read_entry(&self.entry_key(namespace, None))
    }

    pub fn get_with<T: DeserializeOwned, P: Serialize>(
        &self,
        namespace: &str,
        params: &P,
    ) -> Option<T> {
        let params = Self::canonical_params(params)?;
        self.read_entry(&self.entry_key(namespace, Some(&params)))
    }

    pub fn set<T: Serialize>(&self, namespace: &str, data: &T, ttl_ms: i64) -> Result<()> {
        self.write_entry(&self.entry_key(namespace, None), data, ttl_ms)
    }

    pub fn set_with<T: Serialize, P: Serialize>(
        &self,
        namespace: &str,
        data: &T,
        ttl_ms: i64,
        params: &P,
    ) -> Result<()> {
        let params = serde_json::to_string(params).context("Failed to serialize cache params")?;
        self.write_entry(&self.entry_key(namespace, Some(&params)), data, ttl_ms)
    }

    fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Discarding corrupt cache entry");
                self.store.remove(key);
                return None;
            }
        };

        if entry.is_expired(Utc::now().timestamp_millis()) {
            debug!(key, "Cache entry expired");
            self.store.remove(key);
            return None;
        }

        Some(entry.data)
    }

    fn write_entry<T: Serialize>(&self, key: &str, data: &T, ttl_ms: i64) -> Result<()> {
        let entry = CacheEntry {
            data,
            stored_at: Utc::now().timestamp_millis(),
            ttl_ms,
        };
        let serialized = serde_json::to_string(&entry)
            .with_context(|| format!("Failed to serialize cache entry: {}", key))?;
        self.store.set(key, &serialized)
    }

    /// Remove entries under this cache's prefix. With a namespace, only
    /// keys containing that namespace; without, everything under the
    /// prefix. Other prefixes are never touched.
    pub fn clear(&self, namespace: Option<&str>) {
        let scope = self.scope();
        let marker = namespace.map(|ns| format!(":{}", ns));

        for key in self.store.keys() {
            if !key.starts_with(&scope) {
                continue;
            }
            let matches = match &marker {
                Some(marker) => key.contains(marker.as_str()),
                None => true,
            };
            if matches {
                self.store.remove(&key);
            }
        }
    }

    /// Scan this prefix and report entry counts and size. Expired entries
    /// are counted as invalid but deliberately left in place, so repeated
    /// calls observe the same state.
    pub fn stats(&self) -> CacheStats {
        let scope = self.scope();
        let now_ms = Utc::now().timestamp_millis();
        let mut stats = CacheStats::default();

        for key in self.store.keys() {
            if !key.starts_with(&scope) {
                continue;
            }
            let Some(raw) = self.store.get(&key) else {
                continue;
            };

            stats.total_entries += 1;
            stats.approximate_size_bytes += key.len() + raw.len();

            if let Ok(entry) = serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) {
                if !entry.is_expired(now_ms) {
                    stats.valid_entries += 1;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cache(prefix: &str) -> (TtlCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (TtlCache::new(store.clone(), prefix), store)
    }

    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[test]
    fn test_set_then_get_returns_value_unchanged() {
        let (cache, _) = cache("ref");
        let defs = vec!["phq9".to_string(), "gad7".to_string()];

        cache.set("tests", &defs, HOUR_MS).expect("set");
        let got: Vec<String> = cache.get("tests").expect("hit");
        assert_eq!(got, defs);
    }

    #[test]
    fn test_miss_on_unknown_namespace() {
        let (cache, _) = cache("ref");
        assert_eq!(cache.get::<Vec<String>>("nothing"), None);
    }

    #[test]
    fn test_expired_entry_is_miss_and_purged() {
        let (cache, store) = cache("ref");
        // Zero TTL expires immediately
        cache.set("tests", &vec![1, 2, 3], 0).expect("set");

        assert_eq!(cache.get::<Vec<i32>>("tests"), None);
        // Eagerly deleted on read
        assert_eq!(store.get("ref:tests"), None);
    }

    #[test]
    fn test_overwrite_replaces_wholesale() {
        let (cache, _) = cache("ref");
        cache.set("tests", &vec![1], HOUR_MS).expect("set");
        cache.set("tests", &vec![2, 3], HOUR_MS).expect("set");

        let got: Vec<i32> = cache.get("tests").expect("hit");
        assert_eq!(got, vec![2, 3]);
    }

    #[test]
    fn test_params_produce_distinct_keys() {
        let (cache, _) = cache("admin");
        cache.set_with("documents", &vec!["a"], HOUR_MS, &1u32).expect("set");
        cache.set_with("documents", &vec!["b"], HOUR_MS, &2u32).expect("set");

        let page1: Vec<String> = cache.get_with("documents", &1u32).expect("hit");
        let page2: Vec<String> = cache.get_with("documents", &2u32).expect("hit");
        assert_eq!(page1, vec!["a"]);
        assert_eq!(page2, vec!["b"]);
    }

    #[test]
    fn test_corrupt_entry_is_miss_and_purged() {
        let (cache, store) = cache("ref");
        store.set("ref:tests", "{broken").expect("set");

        assert_eq!(cache.get::<Vec<i32>>("tests"), None);
        assert_eq!(store.get("ref:tests"), None);
    }

    #[test]
    fn test_clear_namespace_leaves_siblings() {
        let (cache, _) = cache("ref");
        cache.set("tests", &1, HOUR_MS).expect("set");
        cache.set("stats", &2, HOUR_MS).expect("set");

        cache.clear(Some("tests"));
        assert_eq!(cache.get::<i32>("tests"), None);
        assert_eq!(cache.get::<i32>("stats"), Some(2));
    }

    #[test]
    fn test_clear_all_is_scoped_to_prefix() {
        let store = Arc::new(MemoryStore::new());
        let reference = TtlCache::new(store.clone(), "ref");
        let admin = TtlCache::new(store.clone(), "admin");

        reference.set("tests", &1, HOUR_MS).expect("set");
        admin.set("documents", &2, HOUR_MS).expect("set");

        reference.clear(None);
        assert_eq!(reference.get::<i32>("tests"), None);
        assert_eq!(admin.get::<i32>("documents"), Some(2));
    }

    #[test]
    fn test_stats_counts_without_evicting() {
        let (cache, store) = cache("ref");
        cache.set("fresh", &1, HOUR_MS).expect("set");
        cache.set("stale", &2, 0).expect("set");

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 1);
        assert!(stats.approximate_size_bytes > 0);

        // Idempotent: the expired entry is still stored
        assert!(store.get("ref:stale").is_some());
        assert_eq!(cache.stats(), stats);

        // A read purges it, and stats reflect that afterwards
        assert_eq!(cache.get::<i32>("stale"), None);
        let after = cache.stats();
        assert_eq!(after.total_entries, 1);
        assert_eq!(after.valid_entries, 1);
    }

    #[test]
    fn test_prefix_is_not_a_substring_match() {
        let store = Arc::new(MemoryStore::new());
        let a = TtlCache::new(store.clone(), "ref");
        let b = TtlCache::new(store.clone(), "reference");

        a.set("x", &1, HOUR_MS).expect("set");
        b.set("x", &2, HOUR_MS).expect("set");

        a.clear(None);
        assert_eq!(b.get::<i32>("x"), Some(2));
    }
}
