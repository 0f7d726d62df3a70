//! Order transaction coordinator
//!
//! # Mutation flow
//!
//! ```text
//! create_order(ctx, input)
//!     ├─ 1. Validate input and table preconditions
//!     ├─ 2. Price items, compute totals
//!     ├─ 3. Draw number + atomic insert & table occupancy
//!     │      └─ retry with backoff on number collision
//!     ├─ 4. Invalidate tenant cache entries
//!     └─ 5. Hand off best-effort side effects
//! ```
//!
//! Writes are optimistic: every update is conditioned on the version
//! read at load time, so two concurrent transitions can never both
//! succeed on stale state; the loser gets `ConcurrencyConflict`.
//! Reads go through the cache with in-flight deduplication.

use crate::cache::{keys, CacheService};
use crate::config::EngineConfig;
use crate::dispatch::{SideEffect, SideEffectQueue};
use crate::money;
use crate::orders::number::OrderNumberGenerator;
use crate::orders::state_machine;
use crate::repository::{
    CoreRepository, OrderFilter, RepoResult, RepositoryError, TABLE_OCCUPANCY_CONSTRAINT,
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::error::{CoreError, CoreResult};
use shared::models::order::{CreateOrderInput, Order, OrderStatus, StatusEntry};
use shared::types::{ActorRef, TenantContext, TenantId};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Order lifecycle coordinator
pub struct OrderService {
    repo: Arc<dyn CoreRepository>,
    cache: Arc<CacheService>,
    effects: Arc<SideEffectQueue>,
    numbers: OrderNumberGenerator,
    pub(crate) cfg: EngineConfig,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn CoreRepository>,
        cache: Arc<CacheService>,
        effects: Arc<SideEffectQueue>,
        cfg: EngineConfig,
    ) -> Self {
        let numbers = OrderNumberGenerator::new(cfg.order_number_prefix.clone(), cfg.timezone);
        Self {
            repo,
            cache,
            effects,
            numbers,
            cfg,
        }
    }

    pub(crate) fn repo(&self) -> &dyn CoreRepository {
        &*self.repo
    }

    pub(crate) fn effects(&self) -> &SideEffectQueue {
        &self.effects
    }

    /// Bound a repository call by the configured timeout
    pub(crate) async fn repo_call<T, F>(&self, fut: F) -> RepoResult<T>
    where
        F: Future<Output = RepoResult<T>>,
    {
        match timeout(self.cfg.repository_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout),
        }
    }

    /// Tenant-scoped load; cross-tenant access is plain `NotFound`
    pub(crate) async fn load_order(
        &self,
        ctx: &TenantContext,
        order_id: &str,
    ) -> CoreResult<Order> {
        self.repo_call(self.repo.get_order(&ctx.tenant_id, order_id))
            .await?
            .ok_or_else(|| CoreError::not_found("order"))
    }

    /// Drop every cached view touched by an order or table mutation
    pub(crate) async fn invalidate_tenant(&self, tenant: &TenantId) {
        self.cache
            .delete_by_pattern(&keys::orders_pattern(tenant))
            .await;
        self.cache
            .delete_by_pattern(&keys::tables_pattern(tenant))
            .await;
        self.cache
            .delete_by_pattern(&keys::dashboard_pattern(tenant))
            .await;
    }

    /// Create an order: atomic number assignment, insert and table
    /// occupancy, with bounded retry on number collision
    pub async fn create_order(
        &self,
        ctx: &TenantContext,
        input: CreateOrderInput,
    ) -> CoreResult<Order> {
        if input.items.is_empty() {
            return Err(CoreError::validation("order must contain at least one item"));
        }
        for item in &input.items {
            money::validate_item_input(item)?;
        }
        let tip = input.tip.unwrap_or(0.0);
        money::validate_tip(tip)?;

        let table = self
            .repo_call(self.repo.get_table(&ctx.tenant_id, &input.table_id))
            .await?
            .ok_or_else(|| CoreError::not_found("table"))?;
        if !table.is_active {
            return Err(CoreError::precondition(
                "table is not active",
                vec![table.id.clone()],
            ));
        }
        if table.is_occupied {
            return Err(CoreError::precondition(
                "table is already occupied",
                vec![table.id.clone()],
            ));
        }

        let items: Vec<_> = input.items.into_iter().map(money::price_item).collect();
        let totals = money::order_totals(&items, ctx.tax_rate, tip);

        let started = Instant::now();
        let mut attempt = 0u32;
        let created = loop {
            attempt += 1;

            let order_number = self
                .repo_call(self.numbers.next_number(self.repo(), &ctx.tenant_id))
                .await?;
            let now = Utc::now();
            let order = Order {
                id: uuid::Uuid::new_v4().to_string(),
                tenant_id: ctx.tenant_id.clone(),
                order_number,
                table_id: table.id.clone(),
                table_number: table.table_number.clone(),
                customer_ref: input.customer_ref.clone(),
                items: items.clone(),
                subtotal: totals.subtotal,
                tax: totals.tax,
                tip: totals.tip,
                total: totals.total,
                status: OrderStatus::Received,
                status_history: vec![StatusEntry {
                    status: OrderStatus::Received,
                    timestamp: now,
                    actor: None,
                }],
                notes: input.notes.clone(),
                served_at: None,
                created_at: now,
                updated_at: now,
                version: 0,
            };

            match self
                .repo_call(self.repo.insert_order_and_occupy_table(&order))
                .await
            {
                Ok(stored) => break stored,
                Err(e) if e.is_order_number_collision() => {
                    if attempt >= self.cfg.create_retry_attempts
                        || started.elapsed() >= self.cfg.create_retry_max_elapsed
                    {
                        tracing::warn!(
                            tenant = %ctx.tenant_id,
                            attempts = attempt,
                            "order number collision retries exhausted"
                        );
                        return Err(CoreError::OrderCreationConflict { attempts: attempt });
                    }
                    let delay = backoff_delay(self.cfg.create_retry_base_delay, attempt);
                    tracing::debug!(
                        tenant = %ctx.tenant_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "order number collision, retrying with a fresh number"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(RepositoryError::UniqueViolation { constraint })
                    if constraint == TABLE_OCCUPANCY_CONSTRAINT =>
                {
                    // Lost a race for the table between precondition
                    // check and commit
                    return Err(CoreError::precondition(
                        "table is already occupied",
                        vec![table.id.clone()],
                    ));
                }
                Err(other) => return Err(other.into()),
            }
        };

        self.invalidate_tenant(&ctx.tenant_id).await;

        self.effects.submit(SideEffect::OrderCreated {
            tenant: ctx.tenant_id.clone(),
            summary: created.summary(),
        });
        self.effects.submit(SideEffect::Notification {
            recipients: vec!["kitchen".to_string()],
            title: "New order".to_string(),
            body: format!(
                "Order {} for table {}",
                created.order_number, created.table_number
            ),
            metadata: json!({ "order_id": created.id }),
        });

        Ok(created)
    }

    /// Transition an order's status with optimistic concurrency
    pub async fn update_status(
        &self,
        ctx: &TenantContext,
        order_id: &str,
        target: OrderStatus,
        actor: Option<ActorRef>,
    ) -> CoreResult<Order> {
        let order = self.load_order(ctx, order_id).await?;
        let outcome = state_machine::apply_transition(&order, target, actor, Utc::now())?;

        let stored = self
            .repo_call(self.repo.update_order(
                &outcome.order,
                order.version,
                outcome.releases_table,
            ))
            .await?;

        self.invalidate_tenant(&ctx.tenant_id).await;

        self.effects.submit(SideEffect::OrderStatusChanged {
            tenant: ctx.tenant_id.clone(),
            order: Box::new(stored.clone()),
        });
        if target == OrderStatus::Ready {
            if let Some(customer) = stored.customer_ref.clone() {
                self.effects.submit(SideEffect::Notification {
                    recipients: vec![customer],
                    title: "Order ready".to_string(),
                    body: format!("Order {} is ready for pickup", stored.order_number),
                    metadata: json!({ "order_id": stored.id }),
                });
            }
        }

        Ok(stored)
    }

    /// Remove one line item; removing the last item cancels the order
    /// instead of leaving it empty
    pub async fn remove_item(
        &self,
        ctx: &TenantContext,
        order_id: &str,
        item_index: usize,
        actor: Option<ActorRef>,
    ) -> CoreResult<Order> {
        let order = self.load_order(ctx, order_id).await?;
        if order.status.is_terminal() {
            return Err(CoreError::precondition(
                "cannot modify an order in a terminal status",
                vec![order.id.clone()],
            ));
        }
        if item_index >= order.items.len() {
            return Err(CoreError::not_found("order item"));
        }

        let mut updated = order.clone();
        updated.items.remove(item_index);
        let now = Utc::now();

        if updated.items.is_empty() {
            let outcome =
                state_machine::apply_transition(&updated, OrderStatus::Cancelled, actor, now)?;
            let stored = self
                .repo_call(self.repo.update_order(&outcome.order, order.version, true))
                .await?;
            self.invalidate_tenant(&ctx.tenant_id).await;
            self.effects.submit(SideEffect::OrderStatusChanged {
                tenant: ctx.tenant_id.clone(),
                order: Box::new(stored.clone()),
            });
            return Ok(stored);
        }

        let totals = money::order_totals(&updated.items, ctx.tax_rate, updated.tip);
        updated.subtotal = totals.subtotal;
        updated.tax = totals.tax;
        updated.total = totals.total;
        updated.updated_at = now;

        let stored = self
            .repo_call(self.repo.update_order(&updated, order.version, false))
            .await?;
        self.invalidate_tenant(&ctx.tenant_id).await;
        Ok(stored)
    }

    // ==================== Cached read path ====================

    /// Single order, read through the cache
    pub async fn get_order(&self, ctx: &TenantContext, order_id: &str) -> CoreResult<Order> {
        let key = keys::order(&ctx.tenant_id, order_id);
        let value = self
            .cache
            .get_or_compute(&key, None, || async move {
                let order = self.load_order(ctx, order_id).await?;
                serde_json::to_value(order).map_err(|e| CoreError::repository(e.to_string()))
            })
            .await?;
        serde_json::from_value(value).map_err(|e| CoreError::repository(e.to_string()))
    }

    /// Kitchen display view: non-terminal orders, newest first
    pub async fn kitchen_orders(&self, ctx: &TenantContext) -> CoreResult<Vec<Order>> {
        let key = keys::kitchen(&ctx.tenant_id);
        let value = self
            .cache
            .get_or_compute(&key, None, || async move {
                let orders = self
                    .repo_call(self.repo.list_orders(&ctx.tenant_id, &OrderFilter::active()))
                    .await?;
                serde_json::to_value(orders).map_err(|e| CoreError::repository(e.to_string()))
            })
            .await?;
        serde_json::from_value(value).map_err(|e| CoreError::repository(e.to_string()))
    }

    /// Dashboard aggregates, read through the cache
    pub async fn dashboard_summary(&self, ctx: &TenantContext) -> CoreResult<DashboardSummary> {
        let key = keys::dashboard(&ctx.tenant_id);
        let value = self
            .cache
            .get_or_compute(&key, None, || async move {
                let orders = self
                    .repo_call(
                        self.repo
                            .list_orders(&ctx.tenant_id, &OrderFilter::default()),
                    )
                    .await?;
                let summary = DashboardSummary::from_orders(&orders);
                serde_json::to_value(summary).map_err(|e| CoreError::repository(e.to_string()))
            })
            .await?;
        serde_json::from_value(value).map_err(|e| CoreError::repository(e.to_string()))
    }
}

/// Exponential backoff with jitter for the create retry loop
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let shift = (attempt - 1).min(10);
    let exp = base.saturating_mul(1u32 << shift);
    let jitter_cap = (base.as_millis() as u64 / 2).max(1);
    let jitter = rand::thread_rng().gen_range(0..jitter_cap);
    exp + Duration::from_millis(jitter)
}

/// Per-tenant order counters and revenue for the dashboard view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub received: usize,
    pub preparing: usize,
    pub ready: usize,
    pub served: usize,
    pub cancelled: usize,
    /// Sum of totals across served orders
    pub revenue_served: f64,
}

impl DashboardSummary {
    pub fn from_orders(orders: &[Order]) -> Self {
        use rust_decimal::Decimal;

        let mut summary = Self {
            received: 0,
            preparing: 0,
            ready: 0,
            served: 0,
            cancelled: 0,
            revenue_served: 0.0,
        };
        let mut revenue = Decimal::ZERO;
        for order in orders {
            match order.status {
                OrderStatus::Received => summary.received += 1,
                OrderStatus::Preparing => summary.preparing += 1,
                OrderStatus::Ready => summary.ready += 1,
                OrderStatus::Served => {
                    summary.served += 1;
                    revenue += money::to_decimal(order.total);
                }
                OrderStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary.revenue_served = money::to_f64(revenue);
        summary
    }

    pub fn open_orders(&self) -> usize {
        self.received + self.preparing + self.ready
    }
}
