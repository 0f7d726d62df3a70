//! Two-tier tenant-scoped cache
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 CacheService                 │
//! │  get/set/delete/delete_by_pattern/dedup      │
//! └────────┬──────────────────────┬──────────────┘
//!          │                      │
//!   SharedCache trait        LocalCache
//!   (network tier,           (in-process DashMap,
//!    bounded timeout,         background eviction)
//!    fail open)
//! ```
//!
//! Reads try the shared tier first, then the local tier, then miss.
//! Writes go through to both tiers with the same TTL. Any fault or
//! timeout reaching the shared tier degrades to a miss: caching is a
//! performance optimization, never a correctness dependency.
//!
//! Lifecycle is explicit: the composition root calls [`CacheService::start`]
//! to launch the eviction sweep and [`CacheService::close`] on shutdown.

mod dedup;
pub mod keys;
mod local;
mod shared_tier;

pub use dedup::InflightRegistry;
pub use local::LocalCache;
pub use shared_tier::{MemorySharedCache, SharedCache, SharedCacheError};

use crate::config::CacheConfig;
use serde_json::Value;
use shared::error::CoreResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Two-tier cache service with request deduplication
pub struct CacheService {
    shared: Arc<dyn SharedCache>,
    local: Arc<LocalCache>,
    inflight: InflightRegistry,
    cfg: CacheConfig,
    shutdown: CancellationToken,
    eviction: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("local_entries", &self.local.len())
            .field("in_flight", &self.inflight.in_flight())
            .finish()
    }
}

impl CacheService {
    pub fn new(shared: Arc<dyn SharedCache>, cfg: CacheConfig) -> Self {
        Self {
            shared,
            local: Arc::new(LocalCache::new()),
            inflight: InflightRegistry::new(),
            cfg,
            shutdown: CancellationToken::new(),
            eviction: parking_lot::Mutex::new(None),
        }
    }

    /// Convenience constructor with an in-process shared tier
    pub fn in_memory(cfg: CacheConfig) -> Self {
        Self::new(Arc::new(MemorySharedCache::new()), cfg)
    }

    /// Launch the background eviction sweep. Idempotent.
    pub fn start(&self) {
        let mut slot = self.eviction.lock();
        if slot.is_some() {
            return;
        }
        let local = self.local.clone();
        let token = self.shutdown.clone();
        let interval = self.cfg.eviction_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let purged = local.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, "evicted expired local cache entries");
                        }
                    }
                }
            }
        }));
    }

    /// Stop the eviction sweep and wait for it to finish
    pub async fn close(&self) {
        self.shutdown.cancel();
        let handle = self.eviction.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Read through both tiers: shared first, then local, else miss
    pub async fn get(&self, key: &str) -> Option<Value> {
        match timeout(self.cfg.shared_timeout, self.shared.get(key)).await {
            Ok(Ok(Some(value))) => return Some(value),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::warn!(key, error = %e, "shared cache read failed, failing open");
            }
            Err(_) => {
                tracing::warn!(key, "shared cache read timed out, failing open");
            }
        }
        self.local.get(key)
    }

    /// Write-through to both tiers with the same TTL
    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.cfg.default_ttl);
        match timeout(
            self.cfg.shared_timeout,
            self.shared.set(key, value.clone(), ttl),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(key, error = %e, "shared cache write failed"),
            Err(_) => tracing::warn!(key, "shared cache write timed out"),
        }
        self.local.set(key, value, ttl);
    }

    /// Remove a key from both tiers. Idempotent.
    pub async fn delete(&self, key: &str) {
        match timeout(self.cfg.shared_timeout, self.shared.delete(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(key, error = %e, "shared cache delete failed"),
            Err(_) => tracing::warn!(key, "shared cache delete timed out"),
        }
        self.local.delete(key);
    }

    /// Remove every matching key from both tiers
    pub async fn delete_by_pattern(&self, pattern: &str) {
        match timeout(
            self.cfg.shared_timeout,
            self.shared.delete_by_pattern(pattern),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(pattern, error = %e, "shared cache pattern delete failed");
            }
            Err(_) => tracing::warn!(pattern, "shared cache pattern delete timed out"),
        }
        self.local.delete_by_pattern(pattern);
    }

    /// Share one in-flight computation among concurrent callers
    pub async fn deduplicate<F, Fut>(&self, key: &str, compute: F) -> CoreResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<Value>>,
    {
        self.inflight.run(key, compute).await
    }

    /// Read-through: get, else compute once (deduplicated) and populate
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> CoreResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<Value>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }
        self.inflight
            .run(key, || async move {
                // Re-check after winning leadership: a concurrent leader
                // may have populated the key while this caller queued.
                if let Some(value) = self.get(key).await {
                    return Ok(value);
                }
                let value = compute().await?;
                self.set(key, value.clone(), ttl).await;
                Ok(value)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_cfg() -> CacheConfig {
        CacheConfig {
            default_ttl: Duration::from_secs(60),
            shared_timeout: Duration::from_millis(100),
            eviction_interval: Duration::from_millis(20),
        }
    }

    /// Shared tier that fails every call
    struct FailingSharedCache;

    #[async_trait]
    impl SharedCache for FailingSharedCache {
        async fn get(&self, _key: &str) -> Result<Option<Value>, SharedCacheError> {
            Err(SharedCacheError::Unavailable("connection refused".into()))
        }
        async fn set(
            &self,
            _key: &str,
            _value: Value,
            _ttl: Duration,
        ) -> Result<(), SharedCacheError> {
            Err(SharedCacheError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<(), SharedCacheError> {
            Err(SharedCacheError::Unavailable("connection refused".into()))
        }
        async fn delete_by_pattern(&self, _pattern: &str) -> Result<usize, SharedCacheError> {
            Err(SharedCacheError::Unavailable("connection refused".into()))
        }
    }

    /// Shared tier that never answers
    struct HangingSharedCache;

    #[async_trait]
    impl SharedCache for HangingSharedCache {
        async fn get(&self, _key: &str) -> Result<Option<Value>, SharedCacheError> {
            futures::future::pending().await
        }
        async fn set(
            &self,
            _key: &str,
            _value: Value,
            _ttl: Duration,
        ) -> Result<(), SharedCacheError> {
            futures::future::pending().await
        }
        async fn delete(&self, _key: &str) -> Result<(), SharedCacheError> {
            futures::future::pending().await
        }
        async fn delete_by_pattern(&self, _pattern: &str) -> Result<usize, SharedCacheError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let cache = CacheService::in_memory(test_cfg());
        cache.set("k", json!("v"), None).await;
        assert_eq!(cache.get("k").await, Some(json!("v")));
    }

    #[tokio::test]
    async fn test_ttl_expiry_is_a_miss() {
        let cache = CacheService::in_memory(test_cfg());
        cache
            .set("k", json!("v"), Some(Duration::from_millis(10)))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_noop() {
        let cache = CacheService::in_memory(test_cfg());
        cache.delete("never-set").await;
        cache.delete_by_pattern("tenant:none:*").await;
    }

    #[tokio::test]
    async fn test_fail_open_on_shared_fault() {
        let cache = CacheService::new(Arc::new(FailingSharedCache), test_cfg());
        // Writes land in the local tier even when the shared tier is down
        cache.set("k", json!(1), None).await;
        assert_eq!(cache.get("k").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_fail_open_on_shared_timeout() {
        let cache = CacheService::new(Arc::new(HangingSharedCache), test_cfg());
        cache.set("k", json!(1), None).await;
        assert_eq!(cache.get("k").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_get_or_compute_populates() {
        let cache = Arc::new(CacheService::in_memory(test_cfg()));
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let v = cache
            .get_or_compute("k", None, || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(json!("computed"))
            })
            .await
            .unwrap();
        assert_eq!(v, json!("computed"));

        // Second read hits the cache, compute does not run again
        let c = calls.clone();
        let v = cache
            .get_or_compute("k", None, || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(json!("recomputed"))
            })
            .await
            .unwrap();
        assert_eq!(v, json!("computed"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_eviction_loop_purges() {
        let cache = CacheService::in_memory(test_cfg());
        cache.start();
        cache
            .set("k", json!(1), Some(Duration::from_millis(10)))
            .await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        // Entry purged by the sweep, not by a read
        assert_eq!(cache.local.len(), 0);
        cache.close().await;
    }

    #[tokio::test]
    async fn test_close_is_clean_without_start() {
        let cache = CacheService::in_memory(test_cfg());
        cache.close().await;
    }
}
