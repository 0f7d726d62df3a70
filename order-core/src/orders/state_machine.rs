//! Order status state machine
//!
//! ```text
//! received ──▶ preparing ──▶ ready ──▶ served (terminal)
//!     │            │           │
//!     └────────────┴───────────┴─────▶ cancelled (terminal)
//! ```
//!
//! No stage may be skipped forward except into `cancelled`, and nothing
//! leaves a terminal status. Transitions are pure here; the coordinator
//! persists the outcome atomically together with any table release.

use chrono::{DateTime, Utc};
use shared::error::{CoreError, CoreResult};
use shared::models::order::{Order, OrderStatus, StatusEntry};
use shared::types::ActorRef;

/// Whether `(from, to)` is an allowed edge
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Received, Preparing)
            | (Preparing, Ready)
            | (Ready, Served)
            | (Received | Preparing | Ready, Cancelled)
    )
}

/// A validated transition plus its bound side effects
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub order: Order,
    /// Entering a terminal status frees the linked table within the
    /// same atomic unit as the status write
    pub releases_table: bool,
}

/// Validate and apply a transition, returning the updated order
///
/// The input order is untouched on an illegal edge; `status_history`
/// gains exactly one entry on success and its last entry always equals
/// the new status.
pub fn apply_transition(
    order: &Order,
    target: OrderStatus,
    actor: Option<ActorRef>,
    now: DateTime<Utc>,
) -> CoreResult<TransitionOutcome> {
    if !can_transition(order.status, target) {
        return Err(CoreError::InvalidStatusTransition {
            from: order.status,
            to: target,
        });
    }

    let mut updated = order.clone();
    updated.status_history.push(StatusEntry {
        status: target,
        timestamp: now,
        actor,
    });
    updated.status = target;
    updated.updated_at = now;
    if target == OrderStatus::Served && updated.served_at.is_none() {
        updated.served_at = Some(now);
    }

    Ok(TransitionOutcome {
        order: updated,
        releases_table: target.is_terminal(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::TenantId;

    fn order_with_status(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: "o1".into(),
            tenant_id: TenantId::new("t1"),
            order_number: "ORD-20260807-001".into(),
            table_id: "tbl1".into(),
            table_number: "5".into(),
            customer_ref: None,
            items: vec![],
            subtotal: 0.0,
            tax: 0.0,
            tip: 0.0,
            total: 0.0,
            status,
            status_history: vec![StatusEntry {
                status,
                timestamp: now,
                actor: None,
            }],
            notes: None,
            served_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn test_full_edge_set() {
        use OrderStatus::*;
        let all = [Received, Preparing, Ready, Served, Cancelled];
        let allowed = [
            (Received, Preparing),
            (Preparing, Ready),
            (Ready, Served),
            (Received, Cancelled),
            (Preparing, Cancelled),
            (Ready, Cancelled),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    can_transition(from, to),
                    allowed.contains(&(from, to)),
                    "edge {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_forward_skip_is_rejected() {
        let order = order_with_status(OrderStatus::Received);
        let err = apply_transition(&order, OrderStatus::Ready, None, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidStatusTransition {
                from: OrderStatus::Received,
                to: OrderStatus::Ready,
            }
        );
    }

    #[test]
    fn test_nothing_leaves_terminal_statuses() {
        for terminal in [OrderStatus::Served, OrderStatus::Cancelled] {
            let order = order_with_status(terminal);
            for target in [
                OrderStatus::Received,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Served,
                OrderStatus::Cancelled,
            ] {
                assert!(apply_transition(&order, target, None, Utc::now()).is_err());
            }
        }
    }

    #[test]
    fn test_rejected_transition_leaves_order_untouched() {
        let order = order_with_status(OrderStatus::Served);
        let history_len = order.status_history.len();
        let _ = apply_transition(&order, OrderStatus::Preparing, None, Utc::now());
        assert_eq!(order.status, OrderStatus::Served);
        assert_eq!(order.status_history.len(), history_len);
    }

    #[test]
    fn test_history_appends_and_matches_status() {
        let order = order_with_status(OrderStatus::Received);
        let actor = ActorRef::named("emp_1", "Kim");
        let now = Utc::now();

        let outcome =
            apply_transition(&order, OrderStatus::Preparing, Some(actor.clone()), now).unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Preparing);
        assert_eq!(outcome.order.status_history.len(), 2);
        let last = outcome.order.status_history.last().unwrap();
        assert_eq!(last.status, OrderStatus::Preparing);
        assert_eq!(last.actor, Some(actor));
        assert!(!outcome.releases_table);
    }

    #[test]
    fn test_served_sets_served_at_and_releases_table() {
        let order = order_with_status(OrderStatus::Ready);
        let now = Utc::now();
        let outcome = apply_transition(&order, OrderStatus::Served, None, now).unwrap();
        assert_eq!(outcome.order.served_at, Some(now));
        assert!(outcome.releases_table);
    }

    #[test]
    fn test_cancelled_releases_table_without_served_at() {
        let order = order_with_status(OrderStatus::Preparing);
        let outcome =
            apply_transition(&order, OrderStatus::Cancelled, None, Utc::now()).unwrap();
        assert!(outcome.releases_table);
        assert_eq!(outcome.order.served_at, None);
    }
}
