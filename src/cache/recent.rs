//! Bounded most-recently-used list.

use std::marker::PhantomData;

use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::ttl::TtlCache;

/// Default number of records remembered
pub const DEFAULT_RECENT_CAP: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecentEntry<T> {
    key: String,
    record: T,
}

/// The last N distinct records touched, most recent first.
///
/// The whole list lives in one cache entry, so when its TTL lapses the
/// list empties atomically rather than decaying item by item.
pub struct RecencyList<T> {
    cache: TtlCache,
    namespace: String,
    cap: usize,
    ttl_ms: i64,
    _record: PhantomData<T>,
}

impl<T> RecencyList<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(cache: TtlCache, namespace: impl Into<String>, cap: usize, ttl_ms: i64) -> Self {
        Self {
            cache,
            namespace: namespace.into(),
            cap,
            ttl_ms,
            _record: PhantomData,
        }
    }

    /// Record a touch: an existing entry with the same key is removed
    /// first, the record goes to the head, and the tail is dropped past
    /// the cap.
    pub fn touch(&self, key: &str, record: T) -> Result<()> {
        let mut entries: Vec<RecentEntry<T>> =
            self.cache.get(&self.namespace).unwrap_or_default();

        entries.retain(|e| e.key != key);
        entries.insert(
            0,
            RecentEntry {
                key: key.to_string(),
                record,
            },
        );
        entries.truncate(self.cap);

        self.cache.set(&self.namespace, &entries, self.ttl_ms)
    }

    /// Records most-recent-first. No cursor; every call re-reads the list.
    pub fn list(&self) -> Vec<T> {
        self.cache
            .get::<Vec<RecentEntry<T>>>(&self.namespace)
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.record)
            .collect()
    }

    pub fn clear(&self) {
        self.cache.clear(Some(&self.namespace));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

    fn list(cap: usize) -> RecencyList<String> {
        let cache = TtlCache::new(Arc::new(MemoryStore::new()), "ref");
        RecencyList::new(cache, "recent", cap, WEEK_MS)
    }

    #[test]
    fn test_most_recent_first() {
        let recent = list(4);
        recent.touch("a", "A".to_string()).expect("touch");
        recent.touch("b", "B".to_string()).expect("touch");
        recent.touch("c", "C".to_string()).expect("touch");

        assert_eq!(recent.list(), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let recent = list(4);
        for key in ["a", "b", "c", "d", "e"] {
            recent.touch(key, key.to_uppercase()).expect("touch");
        }

        let listed = recent.list();
        assert_eq!(listed.len(), 4);
        assert_eq!(listed, vec!["E", "D", "C", "B"]);
        // Least-recently-touched is gone
        assert!(!listed.contains(&"A".to_string()));
    }

    #[test]
    fn test_retouch_promotes_without_growing() {
        let recent = list(4);
        recent.touch("a", "A".to_string()).expect("touch");
        recent.touch("b", "B".to_string()).expect("touch");
        recent.touch("c", "C".to_string()).expect("touch");

        recent.touch("a", "A".to_string()).expect("touch");
        assert_eq!(recent.list(), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_retouch_replaces_record() {
        let recent = list(4);
        recent.touch("a", "old".to_string()).expect("touch");
        recent.touch("a", "new".to_string()).expect("touch");

        assert_eq!(recent.list(), vec!["new"]);
    }

    #[test]
    fn test_clear_empties_list() {
        let recent = list(4);
        recent.touch("a", "A".to_string()).expect("touch");
        recent.clear();
        assert!(recent.list().is_empty());
    }

    #[test]
    fn test_expired_backing_entry_empties_whole_list() {
        let cache = TtlCache::new(Arc::new(MemoryStore::new()), "ref");
        let recent: RecencyList<String> = RecencyList::new(cache, "recent", 4, 0);

        recent.touch("a", "A".to_string()).expect("touch");
        // Zero TTL: the single backing entry lapsed, so the list is empty
        assert!(recent.list().is_empty());
    }
}
