//! Listing filters, sorting, pagination, and the statistics aggregate.

use chrono::{Duration, Utc};
use orderflow::{
    CreateOrderRequest, DateRange, OrderId, OrderLine, OrderQuery, OrderStatistics, OrderStatus,
    OrderWorkflow, PageRequest, Product, SortBy, SortOrder, Timestamp, UserId,
};
use orderflow_integration_tests::{buyer, engine, product, qty, shipping};
use orderflow_memory::InMemoryOrderStore;
use rust_decimal::Decimal;

async fn place_order(
    workflow: &OrderWorkflow<InMemoryOrderStore>,
    user: UserId,
    item: &Product,
    quantity: u32,
) -> OrderId {
    let request = CreateOrderRequest::new(
        vec![OrderLine {
            product_id: item.id,
            quantity: qty(quantity),
        }],
        shipping(),
        None,
    )
    .unwrap();
    workflow.create_order(user, request).await.unwrap()
}

#[tokio::test]
async fn listings_are_scoped_to_the_requesting_user() {
    let (workflow, store) = engine();
    let item = product(1_000, 100);
    store.insert_product(item.clone()).await;

    let alice = buyer();
    let bob = buyer();
    place_order(&workflow, alice, &item, 1).await;
    place_order(&workflow, alice, &item, 2).await;
    place_order(&workflow, bob, &item, 3).await;

    let alices = workflow
        .list_user_orders(alice, &OrderQuery::unfiltered())
        .await
        .unwrap();
    assert_eq!(alices.total, 2);
    assert!(alices.records.iter().all(|summary| summary.user_id == alice));

    let everyone = workflow
        .list_all_orders(&OrderQuery::unfiltered())
        .await
        .unwrap();
    assert_eq!(everyone.total, 3);
}

#[tokio::test]
async fn status_and_order_number_filters_narrow_the_listing() {
    let (workflow, store) = engine();
    let item = product(1_000, 100);
    store.insert_product(item.clone()).await;

    let user = buyer();
    let paid = place_order(&workflow, user, &item, 1).await;
    place_order(&workflow, user, &item, 1).await;
    workflow
        .update_status(paid, OrderStatus::Paid, None)
        .await
        .unwrap();

    let page = workflow
        .list_all_orders(&OrderQuery::unfiltered().with_status(OrderStatus::Paid))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].id, paid);

    // Every generated number starts with the same prefix; a full number
    // matches only itself.
    let number = page.records[0].order_number.clone();
    let by_prefix = workflow
        .list_all_orders(&OrderQuery::unfiltered().with_order_number("ORD-"))
        .await
        .unwrap();
    assert_eq!(by_prefix.total, 2);

    let exact = workflow
        .list_all_orders(&OrderQuery::unfiltered().with_order_number(number.as_ref()))
        .await
        .unwrap();
    assert_eq!(exact.total, 1);
    assert_eq!(exact.records[0].id, paid);

    let none = workflow
        .list_all_orders(&OrderQuery::unfiltered().with_order_number("NO-SUCH-ORDER"))
        .await
        .unwrap();
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn sorting_by_total_amount_orders_both_directions() {
    let (workflow, store) = engine();
    let cheap = product(100, 100);
    let dear = product(10_000, 100);
    store.insert_product(cheap.clone()).await;
    store.insert_product(dear.clone()).await;

    let user = buyer();
    place_order(&workflow, user, &cheap, 1).await; // $1.00
    place_order(&workflow, user, &dear, 1).await; // $100.00
    place_order(&workflow, user, &cheap, 5).await; // $5.00

    let ascending = workflow
        .list_all_orders(
            &OrderQuery::unfiltered().sorted(SortBy::TotalAmount, SortOrder::Ascending),
        )
        .await
        .unwrap();
    let totals: Vec<u64> = ascending
        .records
        .iter()
        .map(|summary| summary.total_amount.to_cents())
        .collect();
    assert_eq!(totals, vec![100, 500, 10_000]);

    let descending = workflow
        .list_all_orders(
            &OrderQuery::unfiltered().sorted(SortBy::TotalAmount, SortOrder::Descending),
        )
        .await
        .unwrap();
    let totals: Vec<u64> = descending
        .records
        .iter()
        .map(|summary| summary.total_amount.to_cents())
        .collect();
    assert_eq!(totals, vec![10_000, 500, 100]);
}

#[tokio::test]
async fn pagination_splits_the_listing_and_reports_page_counts() {
    let (workflow, store) = engine();
    let item = product(1_000, 100);
    store.insert_product(item.clone()).await;

    let user = buyer();
    for _ in 0..5 {
        place_order(&workflow, user, &item, 1).await;
    }

    let query = OrderQuery::unfiltered().with_page(PageRequest::new(1, 2).unwrap());
    let first = workflow.list_all_orders(&query).await.unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.pages, 3);
    assert_eq!(first.records.len(), 2);

    let query = OrderQuery::unfiltered().with_page(PageRequest::new(3, 2).unwrap());
    let last = workflow.list_all_orders(&query).await.unwrap();
    assert_eq!(last.records.len(), 1);

    let query = OrderQuery::unfiltered().with_page(PageRequest::new(4, 2).unwrap());
    let beyond = workflow.list_all_orders(&query).await.unwrap();
    assert!(beyond.records.is_empty());
    assert_eq!(beyond.total, 5);
}

#[tokio::test]
async fn pagination_neither_skips_nor_repeats_rows_when_sort_keys_tie() {
    let (workflow, store) = engine();
    let item = product(1_000, 100);
    store.insert_product(item.clone()).await;

    // Identical totals make every row tie on the sort key.
    let user = buyer();
    for _ in 0..6 {
        place_order(&workflow, user, &item, 1).await;
    }

    let mut seen = std::collections::HashSet::new();
    for page in 1..=3 {
        let query = OrderQuery::unfiltered()
            .sorted(SortBy::TotalAmount, SortOrder::Descending)
            .with_page(PageRequest::new(page, 2).unwrap());
        let result = workflow.list_all_orders(&query).await.unwrap();
        assert_eq!(result.records.len(), 2);
        for summary in result.records {
            assert!(seen.insert(summary.id), "row repeated across pages");
        }
    }
    assert_eq!(seen.len(), 6);
}

#[tokio::test]
async fn statistics_count_by_status_and_sum_revenue_over_paid_states_only() {
    let (workflow, store) = engine();
    let item = product(1_000, 100);
    store.insert_product(item.clone()).await;

    let user = buyer();
    // One order left pending, one paid, one shipped, one completed, one cancelled.
    place_order(&workflow, user, &item, 1).await;

    let paid = place_order(&workflow, user, &item, 2).await;
    workflow
        .update_status(paid, OrderStatus::Paid, None)
        .await
        .unwrap();

    let shipped = place_order(&workflow, user, &item, 3).await;
    workflow
        .update_status(shipped, OrderStatus::Paid, None)
        .await
        .unwrap();
    workflow
        .update_status(shipped, OrderStatus::Shipped, None)
        .await
        .unwrap();

    let completed = place_order(&workflow, user, &item, 4).await;
    workflow
        .update_status(completed, OrderStatus::Paid, None)
        .await
        .unwrap();
    workflow
        .update_status(completed, OrderStatus::Shipped, None)
        .await
        .unwrap();
    workflow.confirm_order(completed, user).await.unwrap();

    let cancelled = place_order(&workflow, user, &item, 5).await;
    workflow.cancel_order(cancelled, user).await.unwrap();

    let stats = workflow.statistics(&DateRange::unbounded()).await.unwrap();
    assert_eq!(stats.total_orders, 5);
    assert_eq!(stats.pending_payment, 1);
    assert_eq!(stats.paid, 1);
    assert_eq!(stats.shipped, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.cancelled, 1);

    // Revenue is 2 + 3 + 4 units at $10.00; pending and cancelled orders
    // contribute nothing.
    assert_eq!(stats.total_amount, Decimal::new(9_000, 2));
}

#[tokio::test]
async fn statistics_revenue_may_exceed_the_per_order_amount_cap() {
    let (workflow, store) = engine();
    // A single order may carry at most $100M; two near-cap orders push the
    // aggregate past it, and the read must still succeed.
    let item = product(6_000_000_000, 100);
    store.insert_product(item.clone()).await;

    let user = buyer();
    for _ in 0..2 {
        let order_id = place_order(&workflow, user, &item, 1).await;
        workflow
            .update_status(order_id, OrderStatus::Paid, None)
            .await
            .unwrap();
    }

    let stats = workflow.statistics(&DateRange::unbounded()).await.unwrap();
    assert_eq!(stats.paid, 2);
    assert_eq!(stats.total_amount, Decimal::new(120_000_000, 0));
}

#[tokio::test]
async fn statistics_honor_the_date_window() {
    let (workflow, store) = engine();
    let item = product(1_000, 100);
    store.insert_product(item.clone()).await;

    let user = buyer();
    place_order(&workflow, user, &item, 1).await;

    let now = Utc::now();
    let surrounding = DateRange {
        start: Some(Timestamp::new(now - Duration::hours(1))),
        end: Some(Timestamp::new(now + Duration::hours(1))),
    };
    let stats = workflow.statistics(&surrounding).await.unwrap();
    assert_eq!(stats.total_orders, 1);

    let long_ago = DateRange {
        start: Some(Timestamp::new(now - Duration::days(30))),
        end: Some(Timestamp::new(now - Duration::days(29))),
    };
    let stats = workflow.statistics(&long_ago).await.unwrap();
    assert_eq!(stats, OrderStatistics::default());
}

#[tokio::test]
async fn cancelled_statistics_still_exclude_soft_deleted_orders() {
    let (workflow, store) = engine();
    let item = product(1_000, 100);
    store.insert_product(item.clone()).await;

    let user = buyer();
    place_order(&workflow, user, &item, 1).await;
    let deleted = place_order(&workflow, user, &item, 1).await;
    workflow.delete_order(deleted).await.unwrap();

    let stats = workflow.statistics(&DateRange::unbounded()).await.unwrap();
    assert_eq!(stats.total_orders, 1);
}
