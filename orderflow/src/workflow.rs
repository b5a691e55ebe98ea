//! The order workflow engine.
//!
//! [`OrderWorkflow`] orchestrates order creation, status transition
//! validation, cancellation compensation, and completion side-effects over an
//! injected [`OrderStore`]. Every operation is a short-lived unit of work:
//! it fails fast on the first violated precondition, and every step that
//! touches stock runs inside one [`OrderTransaction`] so no partial state is
//! ever observable.

use crate::errors::{StoreError, WorkflowError, WorkflowResult};
use crate::order::{CreateOrderRequest, Order, OrderItem, OrderView};
use crate::query::{DateRange, OrderQuery, OrderStatistics, OrderSummary, Page};
use crate::status::OrderStatus;
use crate::store::{OrderStore, OrderTransaction};
use crate::types::{Money, OrderId, OrderNumber, Timestamp, UserId};
use tracing::{info, instrument, warn};

/// The identity on whose behalf a read is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    /// A buyer; reads are restricted to orders they own.
    User(UserId),
    /// A privileged caller (back office); ownership checks are skipped.
    Privileged,
}

/// Orchestrates the order lifecycle over a storage backend.
///
/// The engine holds no state of its own; all durable state lives behind the
/// [`OrderStore`] port, which makes the engine trivially substitutable over
/// an in-memory double in tests and a real database in production.
pub struct OrderWorkflow<S> {
    store: S,
}

impl<S: OrderStore> OrderWorkflow<S> {
    /// Creates a workflow engine over the given store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Creates a new order from a validated request.
    ///
    /// For each line the product is read exactly once; that read backs the
    /// availability check, the price used for the subtotal, and the frozen
    /// snapshot, so the total and the snapshots can never disagree. Stock is
    /// reserved through conditional decrements inside the same transaction as
    /// the order and item writes: if any line cannot be reserved the
    /// transaction is dropped un-committed and every prior decrement in this
    /// request is rolled back.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        request: CreateOrderRequest,
    ) -> WorkflowResult<OrderId> {
        let mut txn = self.store.begin().await?;

        let order_id = OrderId::generate();
        let mut total_amount = Money::zero();
        let mut items: Vec<OrderItem> = Vec::with_capacity(request.lines().len());

        for line in request.lines() {
            let product = txn
                .product(line.product_id)
                .await?
                .filter(|product| product.is_available())
                .ok_or(WorkflowError::ProductUnavailable(line.product_id))?;

            if product.stock < line.quantity.value() {
                warn!(
                    product_id = %product.id,
                    requested = line.quantity.value(),
                    available = product.stock,
                    "rejecting order line: insufficient stock"
                );
                return Err(WorkflowError::InsufficientStock {
                    product: product.id,
                    requested: line.quantity.value(),
                });
            }

            let item = OrderItem::snapshot(order_id, &product, line.quantity)?;
            total_amount = total_amount.checked_add(item.subtotal)?;
            items.push(item);
        }

        let now = Timestamp::now();
        let order = Order {
            id: order_id,
            order_number: OrderNumber::generate(),
            user_id,
            total_amount,
            status: OrderStatus::PendingPayment,
            shipping: request.shipping,
            remarks: request.remarks,
            created_at: now,
            updated_at: now,
        };
        txn.insert_order(&order).await?;

        for item in &items {
            // The decrement re-checks stock at the storage layer; a race that
            // emptied the shelf since the read above fails the whole request.
            if !txn.decrement_stock(item.product_id, item.quantity).await? {
                warn!(
                    order_id = %order_id,
                    product_id = %item.product_id,
                    requested = item.quantity.value(),
                    "aborting order creation: stock reservation failed"
                );
                return Err(WorkflowError::InsufficientStock {
                    product: item.product_id,
                    requested: item.quantity.value(),
                });
            }
            txn.insert_order_item(item).await?;
        }

        txn.commit().await?;

        info!(
            order_id = %order_id,
            order_number = %order.order_number,
            total = %order.total_amount,
            lines = items.len(),
            "order created"
        );
        Ok(order_id)
    }

    /// Returns an order together with its item snapshots.
    ///
    /// A [`Requester::User`] may only see orders they own.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn order_detail(
        &self,
        order_id: OrderId,
        requester: Requester,
    ) -> WorkflowResult<OrderView> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(WorkflowError::NotFound(order_id))?;

        if let Requester::User(user_id) = requester {
            if order.user_id != user_id {
                return Err(WorkflowError::Forbidden {
                    user: user_id,
                    order: order_id,
                });
            }
        }

        let items = self.store.order_items(order_id).await?;
        Ok(OrderView { order, items })
    }

    /// Lists one page of a user's own orders.
    pub async fn list_user_orders(
        &self,
        user_id: UserId,
        query: &OrderQuery,
    ) -> WorkflowResult<Page<OrderSummary>> {
        Ok(self.store.list_orders(Some(user_id), query).await?)
    }

    /// Lists one page of all orders. Privileged.
    pub async fn list_all_orders(&self, query: &OrderQuery) -> WorkflowResult<Page<OrderSummary>> {
        Ok(self.store.list_orders(None, query).await?)
    }

    /// Applies a status transition requested by a privileged caller (payment
    /// confirmed, shipment dispatched), optionally updating remarks.
    ///
    /// The transition must be in the legal-transition table; anything else
    /// fails with [`WorkflowError::IllegalStatusTransition`] carrying the
    /// offending pair. This operation performs no compensation; cancellation
    /// and confirmation have their own operations.
    #[instrument(skip(self, remarks), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        remarks: Option<String>,
    ) -> WorkflowResult<()> {
        let mut txn = self.store.begin().await?;

        let order = Self::require_order(&mut txn, order_id).await?;
        Self::require_transition(&order, new_status)?;

        txn.update_order_status(order_id, new_status, remarks.as_deref())
            .await?;
        txn.commit().await?;

        info!(order_id = %order_id, from = %order.status, to = %new_status, "order status updated");
        Ok(())
    }

    /// Cancels an order, restoring every line's reserved stock.
    ///
    /// Only the owning user may cancel, and only while the order is still
    /// pending payment or paid. The per-item stock increments and the status
    /// write are one atomic unit: if any increment fails, nothing is
    /// committed and the inconsistency is surfaced rather than swallowed.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> WorkflowResult<()> {
        let mut txn = self.store.begin().await?;

        let order = Self::require_order(&mut txn, order_id).await?;
        Self::require_owner(&order, user_id)?;
        Self::require_transition(&order, OrderStatus::Cancelled)?;

        for item in txn.order_items(order_id).await? {
            if !txn.increment_stock(item.product_id, item.quantity).await? {
                return Err(StoreError::Inconsistent(format!(
                    "stock restoration matched no product row for {}",
                    item.product_id
                ))
                .into());
            }
        }

        txn.update_order_status(order_id, OrderStatus::Cancelled, None)
            .await?;
        txn.commit().await?;

        info!(order_id = %order_id, "order cancelled, stock restored");
        Ok(())
    }

    /// Confirms receipt of a shipped order, completing it.
    ///
    /// Only the owning user may confirm, and only while the order is shipped.
    /// Each product's cumulative sales counter is incremented by the ordered
    /// quantity in the same atomic unit as the status write.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn confirm_order(&self, order_id: OrderId, user_id: UserId) -> WorkflowResult<()> {
        let mut txn = self.store.begin().await?;

        let order = Self::require_order(&mut txn, order_id).await?;
        Self::require_owner(&order, user_id)?;
        Self::require_transition(&order, OrderStatus::Completed)?;

        for item in txn.order_items(order_id).await? {
            if !txn
                .increment_sales_count(item.product_id, item.quantity)
                .await?
            {
                return Err(StoreError::Inconsistent(format!(
                    "sales-count update matched no product row for {}",
                    item.product_id
                ))
                .into());
            }
        }

        txn.update_order_status(order_id, OrderStatus::Completed, None)
            .await?;
        txn.commit().await?;

        info!(order_id = %order_id, "order completed, sales counted");
        Ok(())
    }

    /// Soft-deletes an order. Privileged.
    ///
    /// The row is kept for audit but disappears from every read path. Orders
    /// are never physically deleted.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: OrderId) -> WorkflowResult<()> {
        let mut txn = self.store.begin().await?;
        Self::require_order(&mut txn, order_id).await?;
        txn.soft_delete_order(order_id).await?;
        txn.commit().await?;

        info!(order_id = %order_id, "order soft-deleted");
        Ok(())
    }

    /// Aggregates order counts and transaction volume over an optional
    /// creation-date window.
    pub async fn statistics(&self, range: &DateRange) -> WorkflowResult<OrderStatistics> {
        Ok(self.store.statistics(range).await?)
    }

    async fn require_order(
        txn: &mut Box<dyn OrderTransaction>,
        order_id: OrderId,
    ) -> WorkflowResult<Order> {
        txn.find_order(order_id)
            .await?
            .ok_or(WorkflowError::NotFound(order_id))
    }

    fn require_owner(order: &Order, user_id: UserId) -> WorkflowResult<()> {
        if order.user_id == user_id {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden {
                user: user_id,
                order: order.id,
            })
        }
    }

    fn require_transition(order: &Order, to: OrderStatus) -> WorkflowResult<()> {
        if order.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(WorkflowError::IllegalStatusTransition {
                from: order.status,
                to,
            })
        }
    }
}
