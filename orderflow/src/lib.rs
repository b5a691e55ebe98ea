//! `OrderFlow` - order lifecycle and inventory-reservation workflow engine
//!
//! This library turns a cart of items into a durable order while guaranteeing
//! that stock is never oversold, that money totals are computed consistently,
//! and that order status transitions follow a strict state machine with
//! compensating actions (stock restoration on cancel, sales-count increment
//! on completion).
//!
//! The engine is backend-independent: all reads and writes go through the
//! [`store::OrderStore`] port, and every workflow step that touches stock runs
//! inside a single [`store::OrderTransaction`] boundary with all-or-nothing
//! visibility. The `orderflow-memory` crate provides an in-memory store for
//! testing and development; `orderflow-postgres` provides a durable store
//! backed by `PostgreSQL`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod order;
pub mod query;
pub mod status;
pub mod store;
pub mod types;
pub mod workflow;

pub use errors::{StoreError, StoreResult, WorkflowError, WorkflowResult};
pub use order::{
    CreateOrderRequest, Order, OrderItem, OrderLine, OrderView, Product, ProductStatus,
    ShippingInfo,
};
pub use query::{
    DateRange, OrderQuery, OrderStatistics, OrderSummary, Page, PageRequest, SortBy, SortOrder,
};
pub use status::OrderStatus;
pub use store::{OrderStore, OrderTransaction};
pub use types::{
    AddressId, Money, OrderId, OrderItemId, OrderNumber, ProductId, ProductName, Quantity,
    Timestamp, UserId,
};
pub use workflow::{OrderWorkflow, Requester};
