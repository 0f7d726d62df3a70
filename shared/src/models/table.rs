//! Dining Table Model

use crate::types::TenantId;
use serde::{Deserialize, Serialize};

/// Dining table entity
///
/// Occupancy is mutated only by the order lifecycle, inside the same
/// atomic unit as the order write that triggers the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub tenant_id: TenantId,
    /// Unique per tenant
    pub table_number: String,
    pub capacity: i32,
    pub is_active: bool,
    pub is_occupied: bool,
    /// Weak back-reference to the occupying order, cleared when that
    /// order reaches a terminal state
    pub current_order_id: Option<String>,
}

impl Table {
    pub fn new(
        id: impl Into<String>,
        tenant_id: TenantId,
        table_number: impl Into<String>,
        capacity: i32,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id,
            table_number: table_number.into(),
            capacity,
            is_active: true,
            is_occupied: false,
            current_order_id: None,
        }
    }
}
