//! Error types for `OrderFlow`.
//!
//! Two layers, converted in one direction only:
//!
//! - [`WorkflowError`]: business-level failures returned by the workflow
//!   engine. Structured results with a kind and human-readable detail; the
//!   surrounding transport layer maps these to responses.
//! - [`StoreError`]: persistence-level failures reported by a store adapter.
//!   These surface through the engine as [`WorkflowError::Persistence`].
//!
//! Every workflow operation fails fast on the first violated precondition and
//! commits no partial side effects on any failure path; the transaction
//! boundary guarantees rollback.

use crate::status::OrderStatus;
use crate::types::{MoneyError, OrderId, ProductId, QuantityError, UserId};
use thiserror::Error;

/// Result alias for workflow engine operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Result alias for store adapter operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures returned by workflow engine operations.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// The requested order does not exist (or is soft-deleted).
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The requesting user does not own the order.
    #[error("user {user} has no access to order {order}")]
    Forbidden {
        /// The requesting user.
        user: UserId,
        /// The order the user tried to act on.
        order: OrderId,
    },

    /// The requested quantity exceeds the product's available stock.
    #[error("insufficient stock for product {product}: requested {requested}")]
    InsufficientStock {
        /// The product that ran out.
        product: ProductId,
        /// The quantity that was requested.
        requested: u32,
    },

    /// The product is missing from the catalog or not in active status.
    #[error("product {0} is unavailable")]
    ProductUnavailable(ProductId),

    /// The requested status transition is not in the legal-transition table.
    #[error("illegal status transition: {from} -> {to}")]
    IllegalStatusTransition {
        /// The order's current status.
        from: OrderStatus,
        /// The requested target status.
        to: OrderStatus,
    },

    /// A storage write or transaction failed; nothing was committed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// The request was malformed (empty item list, bad amounts, ...).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<MoneyError> for WorkflowError {
    fn from(err: MoneyError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<QuantityError> for WorkflowError {
    fn from(err: QuantityError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Failures reported by a store adapter.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The connection to the backing store failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A read or write statement failed.
    #[error("query failed: {0}")]
    Query(String),

    /// A transaction could not be committed and was rolled back.
    #[error("transaction rolled back: {0}")]
    TransactionRollback(String),

    /// Stored data violated a domain invariant (unknown status code,
    /// negative stock, a compensation increment that matched no row).
    #[error("inconsistent stored data: {0}")]
    Inconsistent(String),

    /// The operation exceeded the storage layer's own timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn workflow_errors_carry_readable_detail() {
        let order = OrderId::new(Uuid::now_v7());
        let err = WorkflowError::NotFound(order);
        assert!(err.to_string().contains(&order.to_string()));

        let err = WorkflowError::IllegalStatusTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Paid,
        };
        assert_eq!(
            err.to_string(),
            "illegal status transition: completed -> paid"
        );
    }

    #[test]
    fn store_errors_convert_to_persistence_failures() {
        let err: WorkflowError = StoreError::Query("insert failed".to_string()).into();
        assert!(matches!(err, WorkflowError::Persistence(_)));
        assert!(err.to_string().contains("insert failed"));
    }

    #[test]
    fn value_type_errors_convert_to_validation() {
        let err: WorkflowError = crate::types::Quantity::new(0).unwrap_err().into();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }
}
