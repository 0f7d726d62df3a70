//! Engine configuration
//!
//! Plain struct with defaults; the composition root overrides fields as
//! needed. No file or environment layer here.

use chrono_tz::Tz;
use std::time::Duration;

/// Top-level engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prefix for human-readable order numbers (PREFIX-YYYYMMDD-NNN)
    pub order_number_prefix: String,
    /// Business timezone used to compute the order-number calendar day
    pub timezone: Tz,
    /// Attempts for the create-order conflict retry loop
    pub create_retry_attempts: u32,
    /// Base delay for exponential backoff between attempts
    pub create_retry_base_delay: Duration,
    /// Total elapsed-time bound for the retry loop
    pub create_retry_max_elapsed: Duration,
    /// Maximum ids accepted by a bulk operation
    pub max_bulk_batch: usize,
    /// Side effects dispatched per chunk after a bulk commit
    pub side_effect_chunk: usize,
    /// Bound on any single repository call
    pub repository_timeout: Duration,
    /// Capacity of the side-effect queue feeding the worker
    pub effect_queue_capacity: usize,
    pub cache: CacheConfig,
}

/// Cache layer configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when the caller does not pass one
    pub default_ttl: Duration,
    /// Bound on any shared-tier call; exceeding it is a miss
    pub shared_timeout: Duration,
    /// Interval of the local-tier background eviction sweep
    pub eviction_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_number_prefix: "ORD".to_string(),
            timezone: chrono_tz::UTC,
            create_retry_attempts: 5,
            create_retry_base_delay: Duration::from_millis(50),
            create_retry_max_elapsed: Duration::from_secs(5),
            max_bulk_batch: 100,
            side_effect_chunk: 20,
            repository_timeout: Duration::from_secs(5),
            effect_queue_capacity: 1024,
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            shared_timeout: Duration::from_millis(150),
            eviction_interval: Duration::from_secs(30),
        }
    }
}
