//! Best-effort side-effect dispatch
//!
//! # Message flow
//!
//! ```text
//! coordinator ──▶ submit() ──▶ bounded mpsc ──▶ worker task
//!   (post-commit, never blocks)                    │
//!                                  ┌───────────────┤
//!                                  ▼               ▼
//!                            EventEmitter   NotificationDispatcher
//!                            (real-time)    (push fan-out)
//! ```
//!
//! The coordinators hand off fully-formed payloads after a successful
//! commit and return immediately. Delivery failures are logged and
//! isolated: they never roll back the committed write, and a failure
//! for one payload never affects the next.

use async_trait::async_trait;
use serde_json::Value;
use shared::models::order::{Order, OrderSummary};
use shared::types::TenantId;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Delivery errors surfaced by emitter/dispatcher implementations
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("delivery failed: {0}")]
    Failed(String),

    #[error("dispatcher closed")]
    Closed,
}

/// Real-time event push (websocket fan-out lives behind this)
#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn emit_order_created(
        &self,
        tenant: &TenantId,
        summary: OrderSummary,
    ) -> Result<(), DispatchError>;

    async fn emit_order_status_changed(
        &self,
        tenant: &TenantId,
        order: &Order,
    ) -> Result<(), DispatchError>;
}

/// Push-notification delivery
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(
        &self,
        recipients: &[String],
        title: &str,
        body: &str,
        metadata: Value,
    ) -> Result<(), DispatchError>;
}

/// Fully-formed side effect handed off after commit
#[derive(Debug, Clone)]
pub enum SideEffect {
    OrderCreated {
        tenant: TenantId,
        summary: OrderSummary,
    },
    OrderStatusChanged {
        tenant: TenantId,
        order: Box<Order>,
    },
    Notification {
        recipients: Vec<String>,
        title: String,
        body: String,
        metadata: Value,
    },
}

/// Bounded queue plus worker task draining side effects
pub struct SideEffectQueue {
    tx: mpsc::Sender<SideEffect>,
    shutdown: CancellationToken,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SideEffectQueue {
    /// Spawn the worker and return the queue handle
    pub fn start(
        emitter: Arc<dyn EventEmitter>,
        notifier: Arc<dyn NotificationDispatcher>,
        capacity: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<SideEffect>(capacity);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    effect = rx.recv() => match effect {
                        Some(effect) => process(&*emitter, &*notifier, effect).await,
                        None => break,
                    },
                }
            }
        });

        Self {
            tx,
            shutdown,
            worker: parking_lot::Mutex::new(Some(worker)),
        }
    }

    /// Hand off a side effect without blocking
    ///
    /// A full queue drops the effect with a warning: delivery is
    /// best-effort and must never stall the request path.
    pub fn submit(&self, effect: SideEffect) {
        if let Err(e) = self.tx.try_send(effect) {
            match e {
                mpsc::error::TrySendError::Full(effect) => {
                    tracing::warn!(?effect, "side-effect queue full, dropping effect");
                }
                mpsc::error::TrySendError::Closed(effect) => {
                    tracing::warn!(?effect, "side-effect queue closed, dropping effect");
                }
            }
        }
    }

    /// Stop the worker; queued effects not yet processed are dropped
    pub async fn close(&self) {
        self.shutdown.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// Deliver one effect, isolating failures
async fn process(
    emitter: &dyn EventEmitter,
    notifier: &dyn NotificationDispatcher,
    effect: SideEffect,
) {
    let result = match effect {
        SideEffect::OrderCreated { tenant, summary } => {
            emitter.emit_order_created(&tenant, summary).await
        }
        SideEffect::OrderStatusChanged { tenant, order } => {
            emitter.emit_order_status_changed(&tenant, &order).await
        }
        SideEffect::Notification {
            recipients,
            title,
            body,
            metadata,
        } => notifier.notify(&recipients, &title, &body, metadata).await,
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "side-effect delivery failed");
    }
}

/// Real-time event message carried on the broadcast channel
#[derive(Debug, Clone)]
pub enum OrderEventMessage {
    Created {
        tenant: TenantId,
        summary: OrderSummary,
    },
    StatusChanged {
        tenant: TenantId,
        order: Box<Order>,
    },
}

/// Event emitter backed by a tokio broadcast channel
///
/// Transport adapters (websocket, SSE) subscribe and forward messages
/// to connected clients. Having no active subscriber is not a failure.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    tx: broadcast::Sender<OrderEventMessage>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEventMessage> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEmitter {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventEmitter for BroadcastEmitter {
    async fn emit_order_created(
        &self,
        tenant: &TenantId,
        summary: OrderSummary,
    ) -> Result<(), DispatchError> {
        if self
            .tx
            .send(OrderEventMessage::Created {
                tenant: tenant.clone(),
                summary,
            })
            .is_err()
        {
            tracing::debug!("order created event had no active receivers");
        }
        Ok(())
    }

    async fn emit_order_status_changed(
        &self,
        tenant: &TenantId,
        order: &Order,
    ) -> Result<(), DispatchError> {
        if self
            .tx
            .send(OrderEventMessage::StatusChanged {
                tenant: tenant.clone(),
                order: Box::new(order.clone()),
            })
            .is_err()
        {
            tracing::debug!("status changed event had no active receivers");
        }
        Ok(())
    }
}

/// Notification dispatcher that only logs
///
/// Stand-in wherever no push provider is wired up.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn notify(
        &self,
        recipients: &[String],
        title: &str,
        _body: &str,
        _metadata: Value,
    ) -> Result<(), DispatchError> {
        tracing::info!(recipients = recipients.len(), title, "notification dispatched");
        Ok(())
    }
}
