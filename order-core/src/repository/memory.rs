//! In-process repository
//!
//! Reference implementation of the storage traits for tests and
//! single-node deployments. One mutex guards the whole store, so every
//! trait method is trivially an atomic unit: batch operations validate
//! first and only then apply, holding the lock throughout.
//!
//! Unique order numbers are enforced by a `(tenant, order_number)`
//! index; optimistic concurrency by a per-record version counter.

use super::{
    GuestSessionRepository, OrderFilter, OrderRepository, RepoResult, RepositoryError,
    TableRepository, ORDER_NUMBER_CONSTRAINT, TABLE_OCCUPANCY_CONSTRAINT,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::customer::GuestSession;
use shared::models::order::Order;
use shared::models::table::Table;
use shared::types::TenantId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct StoreState {
    /// order id -> order
    orders: HashMap<String, Order>,
    /// (tenant, order_number) unique index
    number_index: HashSet<(String, String)>,
    /// table id -> table
    tables: HashMap<String, Table>,
    /// (tenant, customer_ref) -> session
    sessions: HashMap<(String, String), GuestSession>,
}

/// Memory-backed repository
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<StoreState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Seed or replace a table
    pub fn upsert_table(&self, table: Table) {
        self.state.lock().tables.insert(table.id.clone(), table);
    }

    /// Seed or replace a guest session
    pub fn upsert_guest_session(&self, session: GuestSession) {
        let key = (
            session.tenant_id.as_str().to_string(),
            session.customer_ref.clone(),
        );
        self.state.lock().sessions.insert(key, session);
    }

    pub fn guest_session_exists(&self, tenant: &TenantId, customer_ref: &str) -> bool {
        self.state
            .lock()
            .sessions
            .contains_key(&(tenant.as_str().to_string(), customer_ref.to_string()))
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    fn number_key(order: &Order) -> (String, String) {
        (
            order.tenant_id.as_str().to_string(),
            order.order_number.clone(),
        )
    }
}

#[async_trait]
impl OrderRepository for MemoryRepository {
    async fn insert_order_and_occupy_table(&self, order: &Order) -> RepoResult<Order> {
        let mut state = self.state.lock();

        let number_key = Self::number_key(order);
        if state.number_index.contains(&number_key) {
            return Err(RepositoryError::unique(ORDER_NUMBER_CONSTRAINT));
        }

        let table = state
            .tables
            .get(&order.table_id)
            .filter(|t| t.tenant_id == order.tenant_id)
            .ok_or_else(|| RepositoryError::not_found("table"))?;
        if table.is_occupied {
            return Err(RepositoryError::unique(TABLE_OCCUPANCY_CONSTRAINT));
        }

        let mut stored = order.clone();
        stored.version = 1;

        let table = state
            .tables
            .get_mut(&order.table_id)
            .expect("table checked above");
        table.is_occupied = true;
        table.current_order_id = Some(stored.id.clone());

        state.number_index.insert(number_key);
        state.orders.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_order(&self, tenant: &TenantId, order_id: &str) -> RepoResult<Option<Order>> {
        let state = self.state.lock();
        Ok(state
            .orders
            .get(order_id)
            .filter(|o| &o.tenant_id == tenant)
            .cloned())
    }

    async fn latest_order_with_number_prefix(
        &self,
        tenant: &TenantId,
        prefix: &str,
    ) -> RepoResult<Option<Order>> {
        let state = self.state.lock();
        Ok(state
            .orders
            .values()
            .filter(|o| &o.tenant_id == tenant && o.order_number.starts_with(prefix))
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.order_number.len().cmp(&b.order_number.len()))
                    .then_with(|| a.order_number.cmp(&b.order_number))
            })
            .cloned())
    }

    async fn update_order(
        &self,
        order: &Order,
        expected_version: u64,
        release_table: bool,
    ) -> RepoResult<Order> {
        let mut state = self.state.lock();

        let stored = state
            .orders
            .get(&order.id)
            .filter(|o| o.tenant_id == order.tenant_id)
            .ok_or_else(|| RepositoryError::not_found("order"))?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                resource: format!("order {}", order.id),
            });
        }

        let mut updated = order.clone();
        updated.version = expected_version + 1;

        if release_table {
            if let Some(table) = state.tables.get_mut(&order.table_id) {
                // Only clear occupancy still pointing at this order
                if table.current_order_id.as_deref() == Some(order.id.as_str()) {
                    table.is_occupied = false;
                    table.current_order_id = None;
                }
            }
        }

        state.orders.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn list_orders(&self, tenant: &TenantId, filter: &OrderFilter) -> RepoResult<Vec<Order>> {
        let state = self.state.lock();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| &o.tenant_id == tenant && filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn get_orders(&self, tenant: &TenantId, ids: &[String]) -> RepoResult<Vec<Order>> {
        let state = self.state.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.orders.get(id))
            .filter(|o| &o.tenant_id == tenant)
            .cloned()
            .collect())
    }

    async fn bulk_update_orders(
        &self,
        tenant: &TenantId,
        orders: &[Order],
        release_table_ids: &[String],
    ) -> RepoResult<()> {
        let mut state = self.state.lock();

        // Validate everything before touching anything
        for order in orders {
            let stored = state
                .orders
                .get(&order.id)
                .filter(|o| &o.tenant_id == tenant)
                .ok_or_else(|| RepositoryError::not_found("order"))?;
            if stored.version != order.version {
                return Err(RepositoryError::VersionConflict {
                    resource: format!("order {}", order.id),
                });
            }
        }

        let released: HashSet<&str> = release_table_ids.iter().map(String::as_str).collect();
        let order_ids: HashSet<&str> = orders.iter().map(|o| o.id.as_str()).collect();

        for order in orders {
            let mut updated = order.clone();
            updated.version = order.version + 1;
            state.orders.insert(updated.id.clone(), updated);
        }
        for table in state.tables.values_mut() {
            if &table.tenant_id == tenant
                && released.contains(table.id.as_str())
                && table
                    .current_order_id
                    .as_deref()
                    .is_some_and(|id| order_ids.contains(id))
            {
                table.is_occupied = false;
                table.current_order_id = None;
            }
        }
        Ok(())
    }

    async fn bulk_delete_orders(
        &self,
        tenant: &TenantId,
        ids: &[String],
        release_table_ids: &[String],
    ) -> RepoResult<u64> {
        let mut state = self.state.lock();

        let mut deleted = 0u64;
        let mut removed_ids: HashSet<String> = HashSet::new();
        for id in ids {
            let owned = state
                .orders
                .get(id)
                .is_some_and(|o| &o.tenant_id == tenant);
            if !owned {
                continue;
            }
            if let Some(order) = state.orders.remove(id) {
                let key = Self::number_key(&order);
                state.number_index.remove(&key);
                removed_ids.insert(order.id);
                deleted += 1;
            }
        }

        let released: HashSet<&str> = release_table_ids.iter().map(String::as_str).collect();
        for table in state.tables.values_mut() {
            if &table.tenant_id == tenant
                && released.contains(table.id.as_str())
                && table
                    .current_order_id
                    .as_deref()
                    .is_some_and(|id| removed_ids.contains(id))
            {
                table.is_occupied = false;
                table.current_order_id = None;
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl TableRepository for MemoryRepository {
    async fn get_table(&self, tenant: &TenantId, table_id: &str) -> RepoResult<Option<Table>> {
        let state = self.state.lock();
        Ok(state
            .tables
            .get(table_id)
            .filter(|t| &t.tenant_id == tenant)
            .cloned())
    }
}

#[async_trait]
impl GuestSessionRepository for MemoryRepository {
    async fn customer_has_active_orders(
        &self,
        tenant: &TenantId,
        customer_ref: &str,
    ) -> RepoResult<bool> {
        let state = self.state.lock();
        Ok(state.orders.values().any(|o| {
            &o.tenant_id == tenant
                && o.customer_ref.as_deref() == Some(customer_ref)
                && !o.status.is_terminal()
        }))
    }

    async fn release_guest_session(&self, tenant: &TenantId, customer_ref: &str) -> RepoResult<()> {
        let key = (tenant.as_str().to_string(), customer_ref.to_string());
        self.state.lock().sessions.remove(&key);
        Ok(())
    }
}
