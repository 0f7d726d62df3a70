//! Order lifecycle & tenant-scoped caching engine
//!
//! Library-level core of a multi-tenant restaurant ordering backend.
//! The (out-of-scope) transport layer constructs the services here and
//! invokes them with a resolved [`shared::TenantContext`].
//!
//! # Components
//!
//! ```text
//! mutation ──▶ OrderService ──▶ OrderNumberGenerator (on create)
//!                  │                 │
//!                  │            state machine validates transition
//!                  │                 │
//!                  ├──▶ CoreRepository (atomic write, CAS / unique index)
//!                  ├──▶ CacheService invalidation
//!                  └──▶ SideEffectQueue (best-effort, post-commit)
//!
//! read ──▶ CacheService (shared tier → local tier → miss)
//!              └─ miss ──▶ deduplicate ──▶ repository ──▶ populate
//! ```
//!
//! Lifecycle is explicit: the composition root calls
//! [`cache::CacheService::start`] / `close` and
//! [`dispatch::SideEffectQueue::start`] / `close`; nothing hooks process
//! signals.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod money;
pub mod orders;
pub mod repository;

pub use cache::CacheService;
pub use config::EngineConfig;
pub use orders::OrderService;
pub use repository::{CoreRepository, MemoryRepository, RepositoryError};
