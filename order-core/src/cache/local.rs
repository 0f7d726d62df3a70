//! In-process local cache tier
//!
//! Lock-free map of TTL-boxed entries. Expired entries are dropped
//! lazily on read and in bulk by the background eviction sweep, which
//! bounds memory growth independent of read traffic.

use super::keys;
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct LocalEntry {
    value: Value,
    expires_at: Instant,
}

/// Local in-process tier
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: DashMap<String, LocalEntry>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get a live entry; expired entries count as a miss and are dropped
    pub fn get(&self, key: &str) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            LocalEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Idempotent: removing an absent key is a no-op
    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Remove every entry whose key matches the pattern
    pub fn delete_by_pattern(&self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !keys::matches(key, pattern));
        before - self.entries.len()
    }

    /// Drop all expired entries, returning how many were purged
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let cache = LocalCache::new();
        cache.set("k", json!({"a": 1}), Duration::from_secs(10));
        assert_eq!(cache.get("k"), Some(json!({"a": 1})));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = LocalCache::new();
        cache.set("k", json!(1), Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        // Lazy expiry removed the entry
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let cache = LocalCache::new();
        cache.delete("never-set");
    }

    #[test]
    fn test_delete_by_pattern() {
        let cache = LocalCache::new();
        cache.set("tenant:t1:orders:id:1", json!(1), Duration::from_secs(10));
        cache.set("tenant:t1:orders:kitchen", json!(2), Duration::from_secs(10));
        cache.set("tenant:t1:dashboard:summary", json!(3), Duration::from_secs(10));
        cache.set("tenant:t2:orders:id:9", json!(4), Duration::from_secs(10));

        let removed = cache.delete_by_pattern("tenant:t1:orders:*");
        assert_eq!(removed, 2);
        assert!(cache.get("tenant:t1:dashboard:summary").is_some());
        assert!(cache.get("tenant:t2:orders:id:9").is_some());
    }

    #[test]
    fn test_purge_expired() {
        let cache = LocalCache::new();
        cache.set("dead", json!(1), Duration::from_millis(0));
        cache.set("live", json!(2), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("live").is_some());
    }
}
