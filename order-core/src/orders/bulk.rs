//! Bulk order operations
//!
//! Batched status changes and deletions. The mutation across the
//! matched set plus the linked table releases commit as one atomic
//! unit; side effects fan out afterwards in bounded chunks with
//! per-order isolation.
//!
//! Tenancy policy: requested ids that do not belong to the calling
//! tenant are silently excluded from the working set. The mismatch is
//! logged, never surfaced, so batch results cannot be used to probe
//! for other tenants' order ids.

use crate::dispatch::SideEffect;
use crate::orders::service::OrderService;
use crate::orders::state_machine;
use chrono::Utc;
use shared::error::{CoreError, CoreResult};
use shared::models::order::{BulkDeleteOutcome, BulkUpdateOutcome, Order, OrderStatus};
use shared::types::TenantContext;
use std::collections::HashSet;

impl OrderService {
    fn validate_batch(&self, ids: &[String]) -> CoreResult<()> {
        if ids.is_empty() {
            return Err(CoreError::validation("batch must contain at least one id"));
        }
        if ids.len() > self.cfg.max_bulk_batch {
            return Err(CoreError::validation(format!(
                "batch size {} exceeds maximum of {}",
                ids.len(),
                self.cfg.max_bulk_batch
            )));
        }
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(CoreError::validation("batch contains a malformed id"));
        }
        Ok(())
    }

    /// Transition every eligible order in the batch to `target`
    ///
    /// Foreign ids and orders whose current status cannot reach the
    /// target are excluded from the working set (and logged); the
    /// remaining writes commit atomically. Returns how many of the
    /// requested orders were actually updated.
    pub async fn bulk_update_status(
        &self,
        ctx: &TenantContext,
        order_ids: &[String],
        target: OrderStatus,
    ) -> CoreResult<BulkUpdateOutcome> {
        self.validate_batch(order_ids)?;

        let matched = self
            .repo_call(self.repo().get_orders(&ctx.tenant_id, order_ids))
            .await?;
        if matched.len() != order_ids.len() {
            tracing::warn!(
                tenant = %ctx.tenant_id,
                requested = order_ids.len(),
                matched = matched.len(),
                "bulk update skipped foreign or missing order ids"
            );
        }

        let now = Utc::now();
        let mut updates: Vec<Order> = Vec::with_capacity(matched.len());
        let mut release_table_ids: Vec<String> = Vec::new();
        for order in &matched {
            match state_machine::apply_transition(order, target, None, now) {
                Ok(outcome) => {
                    if outcome.releases_table {
                        release_table_ids.push(outcome.order.table_id.clone());
                    }
                    updates.push(outcome.order);
                }
                Err(e) => {
                    tracing::debug!(
                        order_id = %order.id,
                        status = %order.status,
                        error = %e,
                        "bulk update skipped ineligible order"
                    );
                }
            }
        }

        if !updates.is_empty() {
            self.repo_call(self.repo().bulk_update_orders(
                &ctx.tenant_id,
                &updates,
                &release_table_ids,
            ))
            .await?;
            self.invalidate_tenant(&ctx.tenant_id).await;
            self.dispatch_status_effects(ctx, &updates);
        }

        if target == OrderStatus::Served {
            self.release_settled_guests(ctx, &updates).await;
        }

        // Repository bumped each stored version past the one we wrote
        let orders: Vec<Order> = updates
            .into_iter()
            .map(|mut o| {
                o.version += 1;
                o
            })
            .collect();

        Ok(BulkUpdateOutcome {
            requested: order_ids.len(),
            updated: orders.len(),
            orders,
        })
    }

    /// Delete the matched batch, failing closed if any order is active
    ///
    /// `confirm` must be set; a batch containing any `preparing` or
    /// `ready` order is rejected whole with the offending ids, and
    /// nothing is deleted.
    pub async fn bulk_delete(
        &self,
        ctx: &TenantContext,
        order_ids: &[String],
        confirm: bool,
    ) -> CoreResult<BulkDeleteOutcome> {
        if !confirm {
            return Err(CoreError::validation(
                "bulk deletion requires explicit confirmation",
            ));
        }
        self.validate_batch(order_ids)?;

        let matched = self
            .repo_call(self.repo().get_orders(&ctx.tenant_id, order_ids))
            .await?;
        if matched.len() != order_ids.len() {
            tracing::warn!(
                tenant = %ctx.tenant_id,
                requested = order_ids.len(),
                matched = matched.len(),
                "bulk delete skipped foreign or missing order ids"
            );
        }

        let active: Vec<String> = matched
            .iter()
            .filter(|o| o.status.is_active())
            .map(|o| o.id.clone())
            .collect();
        if !active.is_empty() {
            return Err(CoreError::precondition(
                "batch contains orders in an active status",
                active,
            ));
        }

        let ids: Vec<String> = matched.iter().map(|o| o.id.clone()).collect();
        let release_table_ids: Vec<String> =
            matched.iter().map(|o| o.table_id.clone()).collect();

        let deleted = if ids.is_empty() {
            0
        } else {
            let deleted = self
                .repo_call(self.repo().bulk_delete_orders(
                    &ctx.tenant_id,
                    &ids,
                    &release_table_ids,
                ))
                .await?;
            self.invalidate_tenant(&ctx.tenant_id).await;
            deleted
        };

        Ok(BulkDeleteOutcome {
            requested: order_ids.len(),
            deleted: deleted as usize,
        })
    }

    /// Fan out status-changed events in bounded chunks
    fn dispatch_status_effects(&self, ctx: &TenantContext, orders: &[Order]) {
        for chunk in orders.chunks(self.cfg.side_effect_chunk) {
            for order in chunk {
                self.effects().submit(SideEffect::OrderStatusChanged {
                    tenant: ctx.tenant_id.clone(),
                    order: Box::new(order.clone()),
                });
            }
        }
    }

    /// Post-commit sweep: release guest sessions whose every order is
    /// now terminal. Best-effort, not transactional with the bulk
    /// update.
    async fn release_settled_guests(&self, ctx: &TenantContext, updated: &[Order]) {
        let customers: HashSet<&str> = updated
            .iter()
            .filter_map(|o| o.customer_ref.as_deref())
            .collect();

        for customer in customers {
            let still_active = match self
                .repo_call(
                    self.repo()
                        .customer_has_active_orders(&ctx.tenant_id, customer),
                )
                .await
            {
                Ok(active) => active,
                Err(e) => {
                    tracing::warn!(
                        tenant = %ctx.tenant_id,
                        customer,
                        error = %e,
                        "guest session sweep could not check orders"
                    );
                    continue;
                }
            };
            if still_active {
                continue;
            }
            if let Err(e) = self
                .repo_call(
                    self.repo()
                        .release_guest_session(&ctx.tenant_id, customer),
                )
                .await
            {
                tracing::warn!(
                    tenant = %ctx.tenant_id,
                    customer,
                    error = %e,
                    "guest session release failed"
                );
            }
        }
    }
}
