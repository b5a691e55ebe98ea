//! In-memory store adapter for the `OrderFlow` workflow engine.
//!
//! This crate provides an in-memory implementation of the `OrderStore` port
//! from the `orderflow` crate, useful for testing and development scenarios
//! where persistence is not required.
//!
//! Transactions stage their changes on a copy of the store state while
//! holding the store's single async lock; commit swaps the staged state in,
//! and dropping a transaction without committing discards it. Holding the
//! lock for the lifetime of the transaction serializes all units of work,
//! which gives the same all-or-nothing visibility and conditional-decrement
//! behavior as a serializable database transaction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use orderflow::{
    DateRange, Order, OrderId, OrderItem, OrderNumber, OrderQuery, OrderStatistics, OrderStatus,
    OrderStore, OrderSummary, OrderTransaction, Page, Product, ProductId, Quantity, SortBy,
    SortOrder, StoreError, StoreResult, UserId,
};

/// An order row together with its soft-delete flag.
#[derive(Debug, Clone)]
struct StoredOrder {
    order: Order,
    deleted: bool,
}

/// The whole store state. Cloned wholesale when a transaction begins.
#[derive(Debug, Clone, Default)]
struct StoreState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, StoredOrder>,
    items: HashMap<OrderId, Vec<OrderItem>>,
}

impl StoreState {
    fn live_order(&self, id: OrderId) -> Option<&Order> {
        self.orders
            .get(&id)
            .filter(|stored| !stored.deleted)
            .map(|stored| &stored.order)
    }

    fn matches(&self, stored: &StoredOrder, owner: Option<UserId>, query: &OrderQuery) -> bool {
        if stored.deleted {
            return false;
        }
        let order = &stored.order;
        if owner.is_some_and(|user_id| order.user_id != user_id) {
            return false;
        }
        if let Some(fragment) = &query.order_number {
            if !order.order_number.as_ref().contains(fragment.as_str()) {
                return false;
            }
        }
        if query.status.is_some_and(|status| order.status != status) {
            return false;
        }
        query.created.contains(order.created_at)
    }
}

/// Thread-safe in-memory order store for testing and development.
///
/// Cloning is cheap and clones share the same state, so a test can hand one
/// clone to the workflow engine and keep another for seeding products and
/// asserting on stock.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product record. Test seeding helper.
    pub async fn insert_product(&self, product: Product) {
        let mut state = self.state.lock().await;
        state.products.insert(product.id, product);
    }

    /// Returns a copy of a product's current committed record.
    pub async fn product_snapshot(&self, id: ProductId) -> Option<Product> {
        let state = self.state.lock().await;
        state.products.get(&id).cloned()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn begin(&self) -> StoreResult<Box<dyn OrderTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        debug!("transaction started");
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.live_order(id).cloned())
    }

    async fn find_by_order_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .filter(|stored| !stored.deleted)
            .map(|stored| &stored.order)
            .find(|order| &order.order_number == number)
            .cloned())
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let state = self.state.lock().await;
        Ok(state.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn list_orders(
        &self,
        owner: Option<UserId>,
        query: &OrderQuery,
    ) -> StoreResult<Page<OrderSummary>> {
        let state = self.state.lock().await;

        let mut matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|stored| state.matches(stored, owner, query))
            .map(|stored| &stored.order)
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::TotalAmount => a.total_amount.cmp(&b.total_amount),
                SortBy::Status => a.status.code().cmp(&b.status.code()),
            };
            let ordering = match query.sort_order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            // Tie-break on id so pagination over equal sort keys is stable.
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let records: Vec<OrderSummary> = matching
            .into_iter()
            .skip(offset)
            .take(query.page.size() as usize)
            .map(|order| OrderSummary {
                id: order.id,
                order_number: order.order_number.clone(),
                user_id: order.user_id,
                total_amount: order.total_amount,
                status: order.status,
                created_at: order.created_at,
            })
            .collect();

        Ok(Page::new(records, total, query.page))
    }

    async fn statistics(&self, range: &DateRange) -> StoreResult<OrderStatistics> {
        let state = self.state.lock().await;

        let mut stats = OrderStatistics::default();
        for stored in state.orders.values() {
            if stored.deleted || !range.contains(stored.order.created_at) {
                continue;
            }
            stats.total_orders += 1;
            match stored.order.status {
                OrderStatus::PendingPayment => stats.pending_payment += 1,
                OrderStatus::Paid => stats.paid += 1,
                OrderStatus::Shipped => stats.shipped += 1,
                OrderStatus::Completed => stats.completed += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
            if OrderStatistics::counts_toward_revenue(stored.order.status) {
                stats.total_amount += stored.order.total_amount.amount();
            }
        }
        Ok(stats)
    }
}

/// A transaction over the in-memory store.
///
/// Holds the store lock for its whole lifetime, so transactions serialize;
/// all mutation happens on `staged` and becomes visible only on commit.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    staged: StoreState,
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: Quantity) -> StoreResult<bool> {
        Ok(self.staged.products.get_mut(&id).is_some_and(|product| {
            if product.stock >= quantity.value() {
                product.stock -= quantity.value();
                true
            } else {
                false
            }
        }))
    }

    async fn increment_stock(&mut self, id: ProductId, quantity: Quantity) -> StoreResult<bool> {
        match self.staged.products.get_mut(&id) {
            Some(product) => {
                product.stock = product.stock.checked_add(quantity.value()).ok_or_else(|| {
                    StoreError::Inconsistent(format!("stock overflow for product {id}"))
                })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_sales_count(
        &mut self,
        id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<bool> {
        match self.staged.products.get_mut(&id) {
            Some(product) => {
                product.sales_count += u64::from(quantity.value());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        if self.staged.orders.contains_key(&order.id) {
            return Err(StoreError::Query(format!(
                "duplicate order id {}",
                order.id
            )));
        }
        if self
            .staged
            .orders
            .values()
            .any(|stored| stored.order.order_number == order.order_number)
        {
            return Err(StoreError::Query(format!(
                "duplicate order number {}",
                order.order_number
            )));
        }
        self.staged.orders.insert(
            order.id,
            StoredOrder {
                order: order.clone(),
                deleted: false,
            },
        );
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
        if !self.staged.orders.contains_key(&item.order_id) {
            return Err(StoreError::Query(format!(
                "order item references missing order {}",
                item.order_id
            )));
        }
        self.staged
            .items
            .entry(item.order_id)
            .or_default()
            .push(item.clone());
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.staged.live_order(id).cloned())
    }

    async fn order_items(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        Ok(self.staged.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        remarks: Option<&str>,
    ) -> StoreResult<()> {
        let stored = self
            .staged
            .orders
            .get_mut(&id)
            .filter(|stored| !stored.deleted)
            .ok_or_else(|| StoreError::Query(format!("no such order {id}")))?;

        stored.order.status = status;
        if let Some(remarks) = remarks {
            stored.order.remarks = Some(remarks.to_string());
        }
        stored.order.updated_at = orderflow::Timestamp::now();
        Ok(())
    }

    async fn soft_delete_order(&mut self, id: OrderId) -> StoreResult<()> {
        let stored = self
            .staged
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::Query(format!("no such order {id}")))?;
        stored.deleted = true;
        stored.order.updated_at = orderflow::Timestamp::now();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        debug!("transaction committed");
        Ok(())
    }
}
