//! Domain models

pub mod customer;
pub mod order;
pub mod table;

pub use customer::GuestSession;
pub use order::{
    BulkDeleteOutcome, BulkUpdateOutcome, CreateOrderInput, ItemAddon, ItemCustomization, Order,
    OrderItem, OrderItemInput, OrderStatus, OrderSummary, StatusEntry,
};
pub use table::Table;
