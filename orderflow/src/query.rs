//! Read-side query types: filtering, sorting, pagination, and statistics.
//!
//! These are consumed by [`crate::store::OrderStore`] list and aggregate
//! operations. They are read-only and side-effect-free; the adapters translate
//! them into whatever the backing store understands.

use crate::errors::WorkflowError;
use crate::status::OrderStatus;
use crate::types::{Money, OrderId, OrderNumber, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sort key for order listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Creation time (the default).
    #[default]
    CreatedAt,
    /// Order total.
    TotalAmount,
    /// Status code.
    Status,
}

/// Sort direction for order listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first (the default; newest orders first).
    #[default]
    Descending,
}

/// An optional, half-open-or-closed creation-date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound.
    pub start: Option<Timestamp>,
    /// Inclusive upper bound.
    pub end: Option<Timestamp>,
}

impl DateRange {
    /// The unbounded range.
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Whether a timestamp falls inside the window.
    pub fn contains(&self, at: Timestamp) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

/// Pagination parameters. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Default page size, matching the original listing behavior.
    pub const DEFAULT_SIZE: u32 = 10;

    /// Creates a page request, rejecting zero pages and zero sizes.
    pub fn new(page: u32, size: u32) -> Result<Self, WorkflowError> {
        if page == 0 {
            return Err(WorkflowError::Validation(
                "page numbers start at 1".to_string(),
            ));
        }
        if size == 0 {
            return Err(WorkflowError::Validation(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(Self { page, size })
    }

    /// The 1-based page number.
    pub const fn page(self) -> u32 {
        self.page
    }

    /// The page size.
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Number of rows to skip before this page.
    pub const fn offset(self) -> u64 {
        (self.page as u64 - 1) * self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: Self::DEFAULT_SIZE,
        }
    }
}

/// Filter, sort, and pagination parameters for order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuery {
    /// Substring match against the order number.
    pub order_number: Option<String>,
    /// Exact status match.
    pub status: Option<OrderStatus>,
    /// Creation-date window.
    pub created: DateRange,
    /// Sort key.
    pub sort_by: SortBy,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Page to return.
    pub page: PageRequest,
}

impl OrderQuery {
    /// A query returning the first page, newest first, unfiltered.
    pub fn unfiltered() -> Self {
        Self::default()
    }

    /// Restricts the query to one status.
    #[must_use]
    pub const fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts the query to order numbers containing the given text.
    #[must_use]
    pub fn with_order_number(mut self, fragment: impl Into<String>) -> Self {
        self.order_number = Some(fragment.into());
        self
    }

    /// Restricts the query to a creation-date window.
    #[must_use]
    pub const fn with_created(mut self, created: DateRange) -> Self {
        self.created = created;
        self
    }

    /// Sets the sort key and direction.
    #[must_use]
    pub const fn sorted(mut self, by: SortBy, order: SortOrder) -> Self {
        self.sort_by = by;
        self.sort_order = order;
        self
    }

    /// Sets the page to return.
    #[must_use]
    pub const fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// One page of results with the totals needed to render paging controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The rows on this page.
    pub records: Vec<T>,
    /// Total rows matching the filter, across all pages.
    pub total: u64,
    /// The 1-based page number that was requested.
    pub page: u32,
    /// The page size that was requested.
    pub size: u32,
    /// Total number of pages: `ceil(total / size)`.
    pub pages: u64,
}

impl<T> Page<T> {
    /// Assembles a page, deriving the page count from the total.
    pub fn new(records: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            records,
            total,
            page: request.page(),
            size: request.size(),
            pages: total.div_ceil(u64::from(request.size())),
        }
    }
}

/// A single row of an order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Order identifier.
    pub id: OrderId,
    /// Order number.
    pub order_number: OrderNumber,
    /// Owning buyer.
    pub user_id: UserId,
    /// Order total.
    pub total_amount: Money,
    /// Current status.
    pub status: OrderStatus,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Aggregate order counts and transaction volume.
///
/// `total_amount` sums orders in statuses {Paid, Shipped, Completed} only;
/// unpaid and cancelled orders contribute nothing to transaction volume.
/// The sum is a raw [`Decimal`], not a [`Money`]: the per-order amount cap
/// bounds one order, and a window of valid orders may total far beyond it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatistics {
    /// All orders in the window.
    pub total_orders: u64,
    /// Orders awaiting payment.
    pub pending_payment: u64,
    /// Orders paid but not shipped.
    pub paid: u64,
    /// Orders shipped but not confirmed.
    pub shipped: u64,
    /// Completed orders.
    pub completed: u64,
    /// Cancelled orders.
    pub cancelled: u64,
    /// Total transaction amount over paid, shipped, and completed orders.
    pub total_amount: Decimal,
}

impl OrderStatistics {
    /// Whether a status contributes to `total_amount`.
    pub const fn counts_toward_revenue(status: OrderStatus) -> bool {
        matches!(
            status,
            OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Completed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    #[test]
    fn page_request_rejects_zero_page_and_size() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, 1).is_ok());
    }

    #[test]
    fn page_request_offset_skips_prior_pages() {
        let request = PageRequest::new(3, 10).unwrap();
        assert_eq!(request.offset(), 20);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn page_count_is_ceiling_of_total_over_size() {
        let request = PageRequest::new(1, 10).unwrap();
        assert_eq!(Page::<u8>::new(vec![], 0, request).pages, 0);
        assert_eq!(Page::<u8>::new(vec![], 1, request).pages, 1);
        assert_eq!(Page::<u8>::new(vec![], 10, request).pages, 1);
        assert_eq!(Page::<u8>::new(vec![], 11, request).pages, 2);
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let start = Timestamp::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let end = Timestamp::new(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap());
        let range = DateRange {
            start: Some(start),
            end: Some(end),
        };

        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(Timestamp::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        )));
        assert!(DateRange::unbounded().contains(start));
    }

    #[test]
    fn only_paid_shipped_completed_count_toward_revenue() {
        assert!(!OrderStatistics::counts_toward_revenue(
            OrderStatus::PendingPayment
        ));
        assert!(OrderStatistics::counts_toward_revenue(OrderStatus::Paid));
        assert!(OrderStatistics::counts_toward_revenue(OrderStatus::Shipped));
        assert!(OrderStatistics::counts_toward_revenue(
            OrderStatus::Completed
        ));
        assert!(!OrderStatistics::counts_toward_revenue(
            OrderStatus::Cancelled
        ));
    }

    proptest! {
        #[test]
        fn prop_page_count_covers_every_row(total in 0u64..10_000, size in 1u32..100) {
            let request = PageRequest::new(1, size).unwrap();
            let page = Page::<u8>::new(vec![], total, request);
            // Enough pages to hold every row, and not one more than needed.
            prop_assert!(page.pages * u64::from(size) >= total);
            prop_assert!(page.pages.saturating_sub(1) * u64::from(size) < total || total == 0);
        }
    }
}
