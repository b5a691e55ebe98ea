//! Storage ports consumed by the workflow engine.
//!
//! [`OrderStore`] is the backend-independent capability interface injected
//! into [`crate::workflow::OrderWorkflow`] at construction, enabling
//! substitution by test doubles. It covers both external collaborators of the
//! engine: the order repository (order and order-item rows) and the inventory
//! store (product records with conditional stock mutation).
//!
//! Writes only happen inside an [`OrderTransaction`]. A transaction is the
//! explicit atomic unit of one workflow step: it spans the order write, the
//! order-item writes, and all stock mutations, and none of its changes are
//! observable to other operations until [`OrderTransaction::commit`] returns.
//! Dropping a transaction without committing rolls everything back.

use crate::errors::StoreResult;
use crate::order::{Order, OrderItem, Product};
use crate::query::{DateRange, OrderQuery, OrderStatistics, OrderSummary, Page};
use crate::status::OrderStatus;
use crate::types::{OrderId, OrderNumber, ProductId, Quantity, UserId};
use async_trait::async_trait;

/// Durable storage for orders and products.
///
/// Read operations never observe uncommitted transaction state and never
/// return soft-deleted orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Opens a new atomic unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn OrderTransaction>>;

    /// Looks up an order by identifier.
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Looks up an order by its unique order number.
    async fn find_by_order_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>>;

    /// Returns the item snapshots belonging to an order.
    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>>;

    /// Returns one page of order summaries matching the query, optionally
    /// scoped to a single owner.
    async fn list_orders(
        &self,
        owner: Option<UserId>,
        query: &OrderQuery,
    ) -> StoreResult<Page<OrderSummary>>;

    /// Aggregates order counts per status and total transaction amount over
    /// an optional creation-date window.
    async fn statistics(&self, range: &DateRange) -> StoreResult<OrderStatistics>;
}

/// An in-progress atomic unit spanning the order repository and the
/// inventory store.
///
/// All mutation and every read that feeds a mutation go through the
/// transaction so the workflow step observes one consistent snapshot.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Fetches a product record, or `None` if it does not exist.
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Conditionally decrements a product's stock.
    ///
    /// Succeeds only if `stock >= quantity` at the moment of the decrement;
    /// this is a single compare-and-update at the storage layer, never a
    /// read-then-write pair, so concurrent reservations of the same product
    /// serialize here. Returns `false` when stock was insufficient or the
    /// product does not exist.
    async fn decrement_stock(&mut self, id: ProductId, quantity: Quantity) -> StoreResult<bool>;

    /// Unconditionally increments a product's stock (cancellation
    /// compensation). Returns `false` when the product does not exist.
    async fn increment_stock(&mut self, id: ProductId, quantity: Quantity) -> StoreResult<bool>;

    /// Increments a product's cumulative sales counter (completion
    /// side-effect). Returns `false` when the product does not exist.
    async fn increment_sales_count(
        &mut self,
        id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<bool>;

    /// Inserts a new order row.
    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;

    /// Inserts a new order-item snapshot.
    async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()>;

    /// Looks up an order inside the transaction.
    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Returns an order's item snapshots inside the transaction.
    async fn order_items(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderItem>>;

    /// Writes a new status (and optionally new remarks) onto an order,
    /// touching its update timestamp.
    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        remarks: Option<&str>,
    ) -> StoreResult<()>;

    /// Marks an order soft-deleted. The row is kept but becomes invisible to
    /// every read path.
    async fn soft_delete_order(&mut self, id: OrderId) -> StoreResult<()>;

    /// Commits the transaction, making all of its changes visible at once.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
