//! Database row mapping.
//!
//! Raw row structs decode with `TryFrom<PgRow>` and then convert into domain
//! types, reporting any value that violates a domain invariant (unknown
//! status code, malformed order number, negative quantity) as
//! `StoreError::Inconsistent`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use orderflow::{
    AddressId, Money, Order, OrderId, OrderItem, OrderItemId, OrderNumber, OrderStatistics,
    OrderStatus, OrderSummary, ProductId, ProductName, ProductStatus, Quantity, ShippingInfo,
    StoreError, StoreResult, Timestamp, UserId,
};

/// Storage code for a product status.
pub(crate) const fn product_status_code(status: ProductStatus) -> i16 {
    match status {
        ProductStatus::Active => 1,
        ProductStatus::Inactive => 0,
    }
}

pub(crate) fn product_status_from_code(code: i16) -> StoreResult<ProductStatus> {
    match code {
        1 => Ok(ProductStatus::Active),
        0 => Ok(ProductStatus::Inactive),
        other => Err(StoreError::Inconsistent(format!(
            "unknown product status code {other}"
        ))),
    }
}

fn order_status_from_code(code: i16) -> StoreResult<OrderStatus> {
    u8::try_from(code)
        .ok()
        .and_then(OrderStatus::from_code)
        .ok_or_else(|| StoreError::Inconsistent(format!("unknown order status code {code}")))
}

fn money_from_decimal(amount: Decimal, column: &str) -> StoreResult<Money> {
    Money::new(amount)
        .map_err(|e| StoreError::Inconsistent(format!("invalid {column} in database: {e}")))
}

/// Database row representing an order.
#[derive(Debug)]
pub(crate) struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    total_amount: Decimal,
    status: i16,
    address_id: Option<Uuid>,
    receiver_name: String,
    receiver_phone: String,
    receiver_address: String,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PgRow> for OrderRow {
    type Error = sqlx::Error;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            user_id: row.try_get("user_id")?,
            total_amount: row.try_get("total_amount")?,
            status: row.try_get("status")?,
            address_id: row.try_get("address_id")?,
            receiver_name: row.try_get("receiver_name")?,
            receiver_phone: row.try_get("receiver_phone")?,
            receiver_address: row.try_get("receiver_address")?,
            remarks: row.try_get("remarks")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl OrderRow {
    pub(crate) fn into_order(self) -> StoreResult<Order> {
        Ok(Order {
            id: OrderId::new(self.id),
            order_number: OrderNumber::try_new(self.order_number)
                .map_err(|e| StoreError::Inconsistent(e.to_string()))?,
            user_id: UserId::new(self.user_id),
            total_amount: money_from_decimal(self.total_amount, "total_amount")?,
            status: order_status_from_code(self.status)?,
            shipping: ShippingInfo {
                address_id: self.address_id.map(AddressId::new),
                receiver_name: self.receiver_name,
                receiver_phone: self.receiver_phone,
                receiver_address: self.receiver_address,
            },
            remarks: self.remarks,
            created_at: Timestamp::new(self.created_at),
            updated_at: Timestamp::new(self.updated_at),
        })
    }
}

/// Database row representing an order item snapshot.
#[derive(Debug)]
pub(crate) struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_price: Decimal,
    product_image: Option<String>,
    quantity: i64,
    subtotal: Decimal,
}

impl TryFrom<PgRow> for OrderItemRow {
    type Error = sqlx::Error;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            product_price: row.try_get("product_price")?,
            product_image: row.try_get("product_image")?,
            quantity: row.try_get("quantity")?,
            subtotal: row.try_get("subtotal")?,
        })
    }
}

impl OrderItemRow {
    pub(crate) fn into_order_item(self) -> StoreResult<OrderItem> {
        let quantity = u32::try_from(self.quantity)
            .ok()
            .and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| {
                StoreError::Inconsistent(format!("invalid quantity {} in database", self.quantity))
            })?;

        Ok(OrderItem {
            id: OrderItemId::new(self.id),
            order_id: OrderId::new(self.order_id),
            product_id: ProductId::new(self.product_id),
            product_name: ProductName::try_new(self.product_name)
                .map_err(|e| StoreError::Inconsistent(e.to_string()))?,
            product_price: money_from_decimal(self.product_price, "product_price")?,
            product_image: self.product_image,
            quantity,
            subtotal: money_from_decimal(self.subtotal, "subtotal")?,
        })
    }
}

/// Database row representing a product record.
#[derive(Debug)]
pub(crate) struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    image: Option<String>,
    stock: i64,
    status: i16,
    sales_count: i64,
}

impl TryFrom<PgRow> for ProductRow {
    type Error = sqlx::Error;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            image: row.try_get("image")?,
            stock: row.try_get("stock")?,
            status: row.try_get("status")?,
            sales_count: row.try_get("sales_count")?,
        })
    }
}

impl ProductRow {
    pub(crate) fn into_product(self) -> StoreResult<orderflow::Product> {
        let stock = u32::try_from(self.stock).map_err(|_| {
            StoreError::Inconsistent(format!("invalid stock {} in database", self.stock))
        })?;
        let sales_count = u64::try_from(self.sales_count).map_err(|_| {
            StoreError::Inconsistent(format!(
                "invalid sales_count {} in database",
                self.sales_count
            ))
        })?;

        Ok(orderflow::Product {
            id: ProductId::new(self.id),
            name: ProductName::try_new(self.name)
                .map_err(|e| StoreError::Inconsistent(e.to_string()))?,
            price: money_from_decimal(self.price, "price")?,
            image: self.image,
            stock,
            status: product_status_from_code(self.status)?,
            sales_count,
        })
    }
}

/// Database row for one order-listing entry.
#[derive(Debug)]
pub(crate) struct SummaryRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    total_amount: Decimal,
    status: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<PgRow> for SummaryRow {
    type Error = sqlx::Error;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            user_id: row.try_get("user_id")?,
            total_amount: row.try_get("total_amount")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl SummaryRow {
    pub(crate) fn into_summary(self) -> StoreResult<OrderSummary> {
        Ok(OrderSummary {
            id: OrderId::new(self.id),
            order_number: OrderNumber::try_new(self.order_number)
                .map_err(|e| StoreError::Inconsistent(e.to_string()))?,
            user_id: UserId::new(self.user_id),
            total_amount: money_from_decimal(self.total_amount, "total_amount")?,
            status: order_status_from_code(self.status)?,
            created_at: Timestamp::new(self.created_at),
        })
    }
}

/// Decodes the single-row statistics aggregate.
///
/// The revenue sum stays a raw `Decimal`; it is an aggregate over many
/// orders and is not subject to the per-order amount cap.
pub(crate) fn statistics_from_row(row: &PgRow) -> StoreResult<OrderStatistics> {
    let count = |column: &str| -> StoreResult<u64> {
        let value: i64 = row.try_get(column).map_err(crate::map_sqlx_error)?;
        Ok(value.unsigned_abs())
    };

    let total_amount: Decimal = row
        .try_get("total_amount")
        .map_err(crate::map_sqlx_error)?;

    Ok(OrderStatistics {
        total_orders: count("total_orders")?,
        pending_payment: count("pending_payment")?,
        paid: count("paid")?,
        shipped: count("shipped")?,
        completed: count("completed")?,
        cancelled: count("cancelled")?,
        total_amount,
    })
}
