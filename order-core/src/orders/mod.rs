//! Order lifecycle
//!
//! - [`number`]: per-tenant-per-day human-readable order numbers
//! - [`state_machine`]: the status transition graph and its side effects
//! - [`service`]: the transaction coordinator (create, update, modify, reads)
//! - [`bulk`]: batched status changes and deletions

pub mod bulk;
pub mod number;
pub mod service;
pub mod state_machine;

pub use number::OrderNumberGenerator;
pub use service::{DashboardSummary, OrderService};
