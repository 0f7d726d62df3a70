//! Guest session model
//!
//! Walk-in customers get an ephemeral session keyed by a reusable
//! identifier (a table QR slot, a pager number). The session is released
//! once every order attached to it is terminal, freeing the identifier.

use crate::types::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ephemeral guest session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestSession {
    pub id: String,
    pub tenant_id: TenantId,
    /// Reusable identifier handed to the guest
    pub customer_ref: String,
    pub created_at: DateTime<Utc>,
}
