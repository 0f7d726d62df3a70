//! Shared types for the ordering backend
//!
//! Common types used across multiple crates: tenant context, domain
//! models, input payloads and the unified error taxonomy.

pub mod error;
pub mod models;
pub mod types;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{CoreError, CoreResult, ErrorCategory};
pub use types::{ActorRef, TenantContext, TenantId};
