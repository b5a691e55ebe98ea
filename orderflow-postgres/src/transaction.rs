//! The transaction half of the adapter: one `sqlx` transaction per workflow
//! step. Dropping the wrapper without committing lets `sqlx` roll the
//! database transaction back, which is exactly the all-or-nothing contract of
//! the `OrderTransaction` port.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use orderflow::{
    Order, OrderId, OrderItem, OrderStatus, OrderTransaction, Product, ProductId, Quantity,
    StoreError, StoreResult,
};

use crate::map_sqlx_error;
use crate::rows::{OrderItemRow, OrderRow, ProductRow};

pub(crate) struct PgOrderTransaction {
    txn: Transaction<'static, Postgres>,
}

impl PgOrderTransaction {
    pub(crate) const fn new(txn: Transaction<'static, Postgres>) -> Self {
        Self { txn }
    }
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(*id.as_ref())
            .fetch_optional(&mut *self.txn)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| {
            ProductRow::try_from(row)
                .map_err(map_sqlx_error)?
                .into_product()
        })
        .transpose()
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: Quantity) -> StoreResult<bool> {
        // The compare-and-update is the sole concurrency-control primitive:
        // it either reserves the stock or matches no row, never both.
        let result =
            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
                .bind(*id.as_ref())
                .bind(i64::from(quantity.value()))
                .execute(&mut *self.txn)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_stock(&mut self, id: ProductId, quantity: Quantity) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(*id.as_ref())
            .bind(i64::from(quantity.value()))
            .execute(&mut *self.txn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_sales_count(
        &mut self,
        id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE products SET sales_count = sales_count + $2 WHERE id = $1")
                .bind(*id.as_ref())
                .bind(i64::from(quantity.value()))
                .execute(&mut *self.txn)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO orders (id, order_number, user_id, total_amount, status, address_id,
                                  receiver_name, receiver_phone, receiver_address, remarks,
                                  created_at, updated_at, is_deleted)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, FALSE)",
        )
        .bind(*order.id.as_ref())
        .bind(order.order_number.as_ref())
        .bind(*order.user_id.as_ref())
        .bind(order.total_amount.amount())
        .bind(i16::from(order.status.code()))
        .bind(order.shipping.address_id.map(|id| *id.as_ref()))
        .bind(&order.shipping.receiver_name)
        .bind(&order.shipping.receiver_phone)
        .bind(&order.shipping.receiver_address)
        .bind(order.remarks.as_deref())
        .bind(order.created_at.into_datetime())
        .bind(order.updated_at.into_datetime())
        .execute(&mut *self.txn)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO order_items (id, order_id, product_id, product_name, product_price,
                                       product_image, quantity, subtotal)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(*item.id.as_ref())
        .bind(*item.order_id.as_ref())
        .bind(*item.product_id.as_ref())
        .bind(item.product_name.as_ref())
        .bind(item.product_price.amount())
        .bind(item.product_image.as_deref())
        .bind(i64::from(item.quantity.value()))
        .bind(item.subtotal.amount())
        .execute(&mut *self.txn)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1 AND is_deleted = FALSE")
            .bind(*id.as_ref())
            .fetch_optional(&mut *self.txn)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| OrderRow::try_from(row).map_err(map_sqlx_error)?.into_order())
            .transpose()
    }

    async fn order_items(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query("SELECT * FROM order_items WHERE order_id = $1")
            .bind(*order_id.as_ref())
            .fetch_all(&mut *self.txn)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                OrderItemRow::try_from(row)
                    .map_err(map_sqlx_error)?
                    .into_order_item()
            })
            .collect()
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        remarks: Option<&str>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r"UPDATE orders SET status = $2, remarks = COALESCE($3, remarks), updated_at = NOW()
              WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(*id.as_ref())
        .bind(i16::from(status.code()))
        .bind(remarks)
        .execute(&mut *self.txn)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Query(format!("no such order {id}")));
        }
        Ok(())
    }

    async fn soft_delete_order(&mut self, id: OrderId) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE orders SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
                .bind(*id.as_ref())
                .execute(&mut *self.txn)
                .await
                .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Query(format!("no such order {id}")));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.txn
            .commit()
            .await
            .map_err(|e| StoreError::TransactionRollback(e.to_string()))?;
        debug!("postgres transaction committed");
        Ok(())
    }
}
