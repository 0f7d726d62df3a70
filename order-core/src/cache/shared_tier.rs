//! Shared cache tier abstraction
//!
//! The shared tier is reachable by all server instances (a network
//! cache in production). The engine only depends on the [`SharedCache`]
//! trait; any fault from an implementation is treated as a miss by the
//! service layer (fail open), never propagated to callers.

use super::keys;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Shared tier errors
#[derive(Debug, Error)]
pub enum SharedCacheError {
    #[error("shared cache unavailable: {0}")]
    Unavailable(String),

    #[error("shared cache operation timed out")]
    Timeout,
}

/// Pluggable shared cache tier
#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, SharedCacheError>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), SharedCacheError>;

    async fn delete(&self, key: &str) -> Result<(), SharedCacheError>;

    /// Remove entries matching a trailing-`*` pattern, returning the
    /// number removed
    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize, SharedCacheError>;
}

#[derive(Debug, Clone)]
struct SharedEntry {
    value: Value,
    expires_at: Instant,
}

/// In-process shared tier for tests and single-node deployments
#[derive(Debug, Default)]
pub struct MemorySharedCache {
    entries: DashMap<String, SharedEntry>,
}

impl MemorySharedCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SharedCache for MemorySharedCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, SharedCacheError> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    return Ok(Some(entry.value.clone()));
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), SharedCacheError> {
        self.entries.insert(
            key.to_string(),
            SharedEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SharedCacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize, SharedCacheError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !keys::matches(key, pattern));
        Ok(before - self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_and_ttl() {
        let cache = MemorySharedCache::new();
        cache
            .set("k", json!("v"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!("v")));

        cache
            .set("short", json!(1), Duration::from_millis(0))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pattern_delete() {
        let cache = MemorySharedCache::new();
        cache
            .set("tenant:t1:orders:id:1", json!(1), Duration::from_secs(10))
            .await
            .unwrap();
        cache
            .set("tenant:t1:dashboard:summary", json!(2), Duration::from_secs(10))
            .await
            .unwrap();
        let removed = cache.delete_by_pattern("tenant:t1:orders:*").await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
    }
}
