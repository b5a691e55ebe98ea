//! Order, order-item, and product records.
//!
//! An [`Order`] is created once in `PendingPayment` status and only ever
//! changes through validated status transitions; its [`OrderItem`]s are an
//! immutable audit snapshot of the products as they were priced at creation
//! time. A catalog change after creation never alters a stored order.

use crate::errors::{WorkflowError, WorkflowResult};
use crate::status::OrderStatus;
use crate::types::{
    AddressId, Money, OrderId, OrderItemId, OrderNumber, ProductId, ProductName, Quantity,
    Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

/// Availability status of a product in the inventory collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Listed and orderable.
    Active,
    /// Delisted; orders against it are rejected.
    Inactive,
}

/// A product record as seen through the inventory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: ProductName,
    /// Current unit price.
    pub price: Money,
    /// Main product image, if any.
    pub image: Option<String>,
    /// Units currently in stock. Never negative.
    pub stock: u32,
    /// Whether the product is orderable.
    pub status: ProductStatus,
    /// Cumulative units sold across completed orders.
    pub sales_count: u64,
}

impl Product {
    /// Whether the product can appear on a new order.
    pub const fn is_available(&self) -> bool {
        matches!(self.status, ProductStatus::Active)
    }
}

/// Shipping details snapshotted onto an order at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    /// Reference to the buyer's address-book entry, if one was used.
    pub address_id: Option<AddressId>,
    /// Receiver's name.
    pub receiver_name: String,
    /// Receiver's phone number.
    pub receiver_phone: String,
    /// Full shipping address text.
    pub receiver_address: String,
}

/// A buyer's finalized purchase request with fixed shipping info and a
/// computed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Server-assigned identifier. Immutable.
    pub id: OrderId,
    /// Unique human-readable order number. Immutable.
    pub order_number: OrderNumber,
    /// The buyer who owns this order. Immutable.
    pub user_id: UserId,
    /// Sum of all item subtotals, computed once at creation. Immutable.
    pub total_amount: Money,
    /// Current lifecycle status. Mutable only via validated transitions.
    pub status: OrderStatus,
    /// Shipping snapshot. Immutable after creation.
    pub shipping: ShippingInfo,
    /// Free-form remarks; may be updated alongside a status change.
    pub remarks: Option<String>,
    /// When the order was created.
    pub created_at: Timestamp,
    /// When the order was last modified.
    pub updated_at: Timestamp,
}

/// One line of an order: an immutable snapshot of a product's name, price,
/// and image at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Line identifier.
    pub id: OrderItemId,
    /// The order that owns this line. Never re-parented.
    pub order_id: OrderId,
    /// The product this line was priced from.
    pub product_id: ProductId,
    /// Product name at order time.
    pub product_name: ProductName,
    /// Unit price at order time.
    pub product_price: Money,
    /// Product image at order time.
    pub product_image: Option<String>,
    /// Units ordered.
    pub quantity: Quantity,
    /// `product_price * quantity`, computed at creation.
    pub subtotal: Money,
}

impl OrderItem {
    /// Freezes a product into an order line.
    ///
    /// The snapshot fields are copied from the single product read that also
    /// backed the availability check, so the subtotal and the snapshot can
    /// never disagree.
    pub fn snapshot(
        order_id: OrderId,
        product: &Product,
        quantity: Quantity,
    ) -> WorkflowResult<Self> {
        let subtotal = product.price.multiply_by_quantity(quantity)?;
        Ok(Self {
            id: OrderItemId::generate(),
            order_id,
            product_id: product.id,
            product_name: product.name.clone(),
            product_price: product.price,
            product_image: product.image.clone(),
            quantity,
            subtotal,
        })
    }
}

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product to order.
    pub product_id: ProductId,
    /// How many units to order.
    pub quantity: Quantity,
}

/// A validated request to create an order.
///
/// Construction rejects an empty line list and duplicate product lines, so a
/// request that exists is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    lines: Vec<OrderLine>,
    /// Where to ship the order.
    pub shipping: ShippingInfo,
    /// Optional buyer remarks.
    pub remarks: Option<String>,
}

impl CreateOrderRequest {
    /// Validates and builds a creation request.
    pub fn new(
        lines: Vec<OrderLine>,
        shipping: ShippingInfo,
        remarks: Option<String>,
    ) -> WorkflowResult<Self> {
        if lines.is_empty() {
            return Err(WorkflowError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for line in &lines {
            if !seen.insert(line.product_id) {
                return Err(WorkflowError::Validation(format!(
                    "duplicate order line for product {}",
                    line.product_id
                )));
            }
        }
        Ok(Self {
            lines,
            shipping,
            remarks,
        })
    }

    /// The requested order lines. Never empty.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }
}

/// An order together with its item snapshots, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    /// The order header.
    pub order: Order,
    /// The order's immutable line items.
    pub items: Vec<OrderItem>,
}
