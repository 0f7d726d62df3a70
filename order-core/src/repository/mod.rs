//! Repository interfaces
//!
//! The engine's only view of durable storage. Every method that touches
//! more than one record is an atomic unit: the implementation opens a
//! transaction, applies all writes, and commits or aborts as a whole.
//! No partially-applied state is ever visible to other readers.
//!
//! Uniqueness-constraint violations are signalled distinctly
//! ([`RepositoryError::UniqueViolation`]) so the create-order retry loop
//! can tell an order-number collision apart from any other fault.

mod memory;

pub use memory::MemoryRepository;

use async_trait::async_trait;
use shared::error::CoreError;
use shared::models::order::{Order, OrderStatus};
use shared::models::table::Table;
use shared::types::TenantId;
use thiserror::Error;

/// Storage faults
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique index rejected the write; `constraint` names the index
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Optimistic write conditioned on a stale version
    #[error("version conflict on {resource}")]
    VersionConflict { resource: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("repository operation timed out")]
    Timeout,

    #[error("backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn unique(constraint: impl Into<String>) -> Self {
        Self::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    /// Whether this is an order-number uniqueness collision
    pub fn is_order_number_collision(&self) -> bool {
        matches!(self, Self::UniqueViolation { constraint } if constraint == ORDER_NUMBER_CONSTRAINT)
    }
}

impl From<RepositoryError> for CoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { resource } => CoreError::NotFound { resource },
            RepositoryError::VersionConflict { resource } => {
                CoreError::ConcurrencyConflict { resource }
            }
            other => CoreError::Repository(other.to_string()),
        }
    }
}

/// Name of the per-tenant-per-day order number unique index
pub const ORDER_NUMBER_CONSTRAINT: &str = "order_number_tenant_day";

/// Name of the single-occupant table constraint
pub const TABLE_OCCUPANCY_CONSTRAINT: &str = "table_single_occupancy";

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Filter for tenant-scoped order scans
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restrict to these statuses; empty means all
    pub statuses: Vec<OrderStatus>,
    /// Restrict to orders of one customer
    pub customer_ref: Option<String>,
}

impl OrderFilter {
    pub fn active() -> Self {
        Self {
            statuses: vec![
                OrderStatus::Received,
                OrderStatus::Preparing,
                OrderStatus::Ready,
            ],
            ..Default::default()
        }
    }

    pub fn for_customer(customer_ref: impl Into<String>) -> Self {
        Self {
            customer_ref: Some(customer_ref.into()),
            ..Default::default()
        }
    }

    fn matches(&self, order: &Order) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&order.status) {
            return false;
        }
        if let Some(customer) = &self.customer_ref {
            return order.customer_ref.as_deref() == Some(customer.as_str());
        }
        true
    }
}

/// Order persistence
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Atomic unit: insert the order (enforcing the per-tenant-per-day
    /// order-number unique index) and mark its table occupied with a
    /// back-reference. All writes commit or abort together.
    async fn insert_order_and_occupy_table(&self, order: &Order) -> RepoResult<Order>;

    /// Tenant-scoped point lookup; a foreign order is `None`
    async fn get_order(&self, tenant: &TenantId, order_id: &str) -> RepoResult<Option<Order>>;

    /// Most recently *created* order whose number starts with `prefix`
    /// (creation-time order, not lexical order on the number)
    async fn latest_order_with_number_prefix(
        &self,
        tenant: &TenantId,
        prefix: &str,
    ) -> RepoResult<Option<Order>>;

    /// Atomic versioned write. Fails with [`RepositoryError::VersionConflict`]
    /// unless the stored version equals `expected_version`; when
    /// `release_table` is set, the order's table is freed in the same
    /// unit.
    async fn update_order(
        &self,
        order: &Order,
        expected_version: u64,
        release_table: bool,
    ) -> RepoResult<Order>;

    /// Tenant-scoped filtered scan, newest first
    async fn list_orders(&self, tenant: &TenantId, filter: &OrderFilter) -> RepoResult<Vec<Order>>;

    /// Fetch the subset of `ids` that belong to `tenant`; foreign or
    /// missing ids are silently absent from the result
    async fn get_orders(&self, tenant: &TenantId, ids: &[String]) -> RepoResult<Vec<Order>>;

    /// Atomic batch: write every order (versioned) and free the listed
    /// tables; all or nothing
    async fn bulk_update_orders(
        &self,
        tenant: &TenantId,
        orders: &[Order],
        release_table_ids: &[String],
    ) -> RepoResult<()>;

    /// Atomic batch delete, clearing back-references from the listed
    /// tables; returns the number of orders removed
    async fn bulk_delete_orders(
        &self,
        tenant: &TenantId,
        ids: &[String],
        release_table_ids: &[String],
    ) -> RepoResult<u64>;
}

/// Table lookups (occupancy is mutated only via order operations)
#[async_trait]
pub trait TableRepository: Send + Sync {
    async fn get_table(&self, tenant: &TenantId, table_id: &str) -> RepoResult<Option<Table>>;
}

/// Guest session bookkeeping
#[async_trait]
pub trait GuestSessionRepository: Send + Sync {
    /// Whether the customer still has any non-terminal order
    async fn customer_has_active_orders(
        &self,
        tenant: &TenantId,
        customer_ref: &str,
    ) -> RepoResult<bool>;

    /// Free the reusable guest identifier. Idempotent.
    async fn release_guest_session(&self, tenant: &TenantId, customer_ref: &str) -> RepoResult<()>;
}

/// Combined storage surface the engine is constructed with
pub trait CoreRepository: OrderRepository + TableRepository + GuestSessionRepository {}

impl<T: OrderRepository + TableRepository + GuestSessionRepository> CoreRepository for T {}
