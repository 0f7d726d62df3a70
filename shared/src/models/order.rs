//! Order Model

use crate::types::{ActorRef, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order status
///
/// `Served` and `Cancelled` are terminal: no transition leaves them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Received,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Served | Self::Cancelled)
    }

    /// Active statuses block bulk deletion
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Preparing | Self::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Served => "served",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the append-only status history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub actor: Option<ActorRef>,
}

/// Customization selected for an item (size, doneness, ...)
///
/// `price_modifier` is added to the item's unit price; negative values
/// are allowed (e.g. "no cheese" rebates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCustomization {
    pub name: String,
    /// Price modifier in currency units
    pub price_modifier: f64,
}

/// Add-on attached to an item (extra topping, side)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAddon {
    pub name: String,
    /// Price in currency units
    pub price: f64,
}

/// Order line item: a snapshot of the menu item at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Menu item reference (String ID)
    pub menu_item_id: String,
    pub name: String,
    /// Unit price snapshot in currency units
    pub price: f64,
    pub quantity: i32,
    pub customizations: Vec<ItemCustomization>,
    pub addons: Vec<ItemAddon>,
    /// Line total: (price + customizations + add-ons) * quantity
    pub subtotal: f64,
    pub note: Option<String>,
}

/// Order entity
///
/// Owned by exactly one tenant. Mutated only through the state machine
/// and the coordinators; `status_history` is append-only and its last
/// entry always equals `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub tenant_id: TenantId,
    /// Unique within (tenant, calendar day), format PREFIX-YYYYMMDD-NNN
    pub order_number: String,
    pub table_id: String,
    /// Denormalized table number snapshot at creation time
    pub table_number: String,
    /// Weak customer reference; absent for anonymous walk-in orders
    pub customer_ref: Option<String>,
    pub items: Vec<OrderItem>,
    /// Sum of item subtotals in currency units
    pub subtotal: f64,
    pub tax: f64,
    pub tip: f64,
    /// subtotal + tax + tip, rounded to 2 decimals
    pub total: f64,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    pub notes: Option<String>,
    /// Set exactly once, when status becomes Served
    pub served_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency version, bumped by the repository on every
    /// write
    #[serde(default)]
    pub version: u64,
}

impl Order {
    /// Lightweight projection for real-time event emission
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id.clone(),
            order_number: self.order_number.clone(),
            table_number: self.table_number.clone(),
            status: self.status,
            total: self.total,
            item_count: self.items.iter().map(|i| i.quantity).sum(),
        }
    }
}

/// Projection of an order pushed to real-time subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: String,
    pub order_number: String,
    pub table_number: String,
    pub status: OrderStatus,
    pub total: f64,
    pub item_count: i32,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderInput {
    pub table_id: String,
    pub items: Vec<OrderItemInput>,
    pub notes: Option<String>,
    pub customer_ref: Option<String>,
    /// Tip in currency units, defaults to 0
    pub tip: Option<f64>,
}

/// Item payload within a create request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub menu_item_id: String,
    pub name: String,
    /// Unit price in currency units
    pub price: f64,
    pub quantity: i32,
    #[serde(default)]
    pub customizations: Vec<ItemCustomization>,
    #[serde(default)]
    pub addons: Vec<ItemAddon>,
    pub note: Option<String>,
}

/// Result of a bulk status update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdateOutcome {
    /// Number of ids in the request
    pub requested: usize,
    /// Number of orders actually transitioned
    pub updated: usize,
    /// The updated orders
    pub orders: Vec<Order>,
}

/// Result of a bulk delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteOutcome {
    pub requested: usize,
    pub deleted: usize,
}
