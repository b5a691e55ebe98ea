//! `PostgreSQL` store adapter for the `OrderFlow` workflow engine.
//!
//! Implements the `OrderStore` port over a `sqlx` connection pool. Every
//! workflow step runs inside a real database transaction, and the stock
//! reservation is a single conditional `UPDATE ... WHERE stock >= $q`
//! compare-and-update, so concurrent reservations of the same product
//! serialize at the database and stock can never go negative.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
mod transaction;

use std::time::Duration;

use async_trait::async_trait;
use nutype::nutype;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, QueryBuilder, Row};
use tracing::{info, instrument};

use orderflow::{
    DateRange, Order, OrderId, OrderItem, OrderNumber, OrderQuery, OrderStatistics, OrderStore,
    OrderSummary, OrderTransaction, Page, Product, SortBy, SortOrder, StoreError, StoreResult,
    UserId,
};

use rows::{statistics_from_row, OrderItemRow, OrderRow, SummaryRow};
use transaction::PgOrderTransaction;

/// Maximum number of database connections in the pool.
///
/// Must be at least 1, enforced by using `NonZeroU32` as the underlying type.
#[nutype(derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRef, Into))]
pub struct MaxConnections(std::num::NonZeroU32);

/// Configuration for the `PostgresOrderStore` connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Maximum number of connections in the pool (default: 10).
    pub max_connections: MaxConnections,
    /// Timeout for acquiring a connection from the pool (default: 30s).
    pub acquire_timeout: Duration,
    /// Idle timeout for connections in the pool (default: 10 minutes).
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        const DEFAULT_MAX_CONNECTIONS: std::num::NonZeroU32 =
            match std::num::NonZeroU32::new(10) {
                Some(v) => v,
                None => unreachable!(),
            };

        Self {
            max_connections: MaxConnections::new(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// `PostgreSQL`-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: Pool<Postgres>,
}

impl PostgresOrderStore {
    /// Connects to the database and builds the store.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, config: PostgresConfig) -> StoreResult<Self> {
        let max_connections: std::num::NonZeroU32 = config.max_connections.into();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.get())
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(max_connections = %config.max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    /// Creates the orders, order_items, and products tables if they do not
    /// exist.
    pub async fn initialize_schema(&self) -> StoreResult<()> {
        let statements = [
            r"CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                price NUMERIC(12,2) NOT NULL CHECK (price >= 0),
                image TEXT,
                stock BIGINT NOT NULL CHECK (stock >= 0),
                status SMALLINT NOT NULL,
                sales_count BIGINT NOT NULL DEFAULT 0
            )",
            r"CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                order_number TEXT NOT NULL UNIQUE,
                user_id UUID NOT NULL,
                total_amount NUMERIC(12,2) NOT NULL CHECK (total_amount >= 0),
                status SMALLINT NOT NULL,
                address_id UUID,
                receiver_name TEXT NOT NULL,
                receiver_phone TEXT NOT NULL,
                receiver_address TEXT NOT NULL,
                remarks TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE
            )",
            r"CREATE TABLE IF NOT EXISTS order_items (
                id UUID PRIMARY KEY,
                order_id UUID NOT NULL REFERENCES orders(id),
                product_id UUID NOT NULL,
                product_name TEXT NOT NULL,
                product_price NUMERIC(12,2) NOT NULL,
                product_image TEXT,
                quantity BIGINT NOT NULL CHECK (quantity > 0),
                subtotal NUMERIC(12,2) NOT NULL
            )",
            r"CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders (user_id)",
            r"CREATE INDEX IF NOT EXISTS idx_orders_status ON orders (status)",
            r"CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders (created_at)",
            r"CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items (order_id)",
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        info!("postgres schema initialized");
        Ok(())
    }

    /// Inserts or replaces a product record. Seeding helper for tests and
    /// development; in production the inventory collaborator owns this table.
    pub async fn upsert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r"INSERT INTO products (id, name, price, image, stock, status, sales_count)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                image = EXCLUDED.image,
                stock = EXCLUDED.stock,
                status = EXCLUDED.status,
                sales_count = EXCLUDED.sales_count",
        )
        .bind(*product.id.as_ref())
        .bind(product.name.as_ref())
        .bind(product.price.amount())
        .bind(product.image.as_deref())
        .bind(i64::from(product.stock))
        .bind(rows::product_status_code(product.status))
        .bind(i64::try_from(product.sales_count).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    fn push_list_filters(
        builder: &mut QueryBuilder<'_, Postgres>,
        owner: Option<UserId>,
        query: &OrderQuery,
    ) {
        if let Some(user_id) = owner {
            builder.push(" AND user_id = ");
            builder.push_bind(*user_id.as_ref());
        }
        if let Some(fragment) = &query.order_number {
            builder.push(" AND order_number LIKE ");
            builder.push_bind(format!("%{}%", escape_like_fragment(fragment)));
            builder.push(r" ESCAPE '\'");
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(i16::from(status.code()));
        }
        if let Some(start) = query.created.start {
            builder.push(" AND created_at >= ");
            builder.push_bind(start.into_datetime());
        }
        if let Some(end) = query.created.end {
            builder.push(" AND created_at <= ");
            builder.push_bind(end.into_datetime());
        }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn begin(&self) -> StoreResult<Box<dyn OrderTransaction>> {
        let txn = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(PgOrderTransaction::new(txn)))
    }

    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(
            "SELECT * FROM orders WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(*id.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| OrderRow::try_from(row).map_err(map_sqlx_error)?.into_order())
            .transpose()
    }

    async fn find_by_order_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>> {
        let row = sqlx::query(
            "SELECT * FROM orders WHERE order_number = $1 AND is_deleted = FALSE",
        )
        .bind(number.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| OrderRow::try_from(row).map_err(map_sqlx_error)?.into_order())
            .transpose()
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query("SELECT * FROM order_items WHERE order_id = $1")
            .bind(*order_id.as_ref())
            .fetch_all(&self.pool)
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

    async fn list_orders(
        &self,
        owner: Option<UserId>,
        query: &OrderQuery,
    ) -> StoreResult<Page<OrderSummary>> {
        let mut count_builder =
            QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE is_deleted = FALSE");
        Self::push_list_filters(&mut count_builder, owner, query);
        let total: i64 = count_builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .try_get(0)
            .map_err(map_sqlx_error)?;

        let mut builder = QueryBuilder::new(
            "SELECT id, order_number, user_id, total_amount, status, created_at \
             FROM orders WHERE is_deleted = FALSE",
        );
        Self::push_list_filters(&mut builder, owner, query);

        let sort_column = match query.sort_by {
            SortBy::CreatedAt => "created_at",
            SortBy::TotalAmount => "total_amount",
            SortBy::Status => "status",
        };
        let direction = match query.sort_order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        // Secondary id key keeps pagination stable when sort keys tie.
        builder.push(format!(" ORDER BY {sort_column} {direction}, id ASC"));
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(query.page.size()));
        builder.push(" OFFSET ");
        builder.push_bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let records = rows
            .into_iter()
            .map(|row| {
                SummaryRow::try_from(row)
                    .map_err(map_sqlx_error)?
                    .into_summary()
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page::new(records, total.unsigned_abs(), query.page))
    }

    async fn statistics(&self, range: &DateRange) -> StoreResult<OrderStatistics> {
        let mut builder = QueryBuilder::new(
            "SELECT COUNT(*) AS total_orders, \
             COUNT(*) FILTER (WHERE status = 1) AS pending_payment, \
             COUNT(*) FILTER (WHERE status = 2) AS paid, \
             COUNT(*) FILTER (WHERE status = 3) AS shipped, \
             COUNT(*) FILTER (WHERE status = 4) AS completed, \
             COUNT(*) FILTER (WHERE status = 5) AS cancelled, \
             COALESCE(SUM(total_amount) FILTER (WHERE status IN (2, 3, 4)), 0) AS total_amount \
             FROM orders WHERE is_deleted = FALSE",
        );
        if let Some(start) = range.start {
            builder.push(" AND created_at >= ");
            builder.push_bind(start.into_datetime());
        }
        if let Some(end) = range.end {
            builder.push(" AND created_at <= ");
            builder.push_bind(end.into_datetime());
        }

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        statistics_from_row(&row)
    }
}

/// Escapes `LIKE` metacharacters so a search fragment matches literally,
/// the same substring semantics as the in-memory adapter.
fn escape_like_fragment(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Maps a sqlx error onto the backend-independent store error.
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(Duration::from_secs(30)),
        sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
        sqlx::Error::Tls(e) => StoreError::Connection(e.to_string()),
        sqlx::Error::Configuration(e) => StoreError::Connection(e.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Inconsistent(error.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}
