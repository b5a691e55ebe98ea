//! Status transitions, cancellation compensation, confirmation side-effects,
//! and soft deletion over the full order lifecycle.

use orderflow::{
    CreateOrderRequest, OrderId, OrderLine, OrderStatus, OrderWorkflow, Product, Requester, UserId,
    WorkflowError,
};
use orderflow_integration_tests::{buyer, engine, product, qty, shipping};
use orderflow_memory::InMemoryOrderStore;

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
async fn happy_path_walks_pending_paid_shipped_completed() {
    let (workflow, store) = engine();
    let item = product(2_500, 10);
    store.insert_product(item.clone()).await;

    let user = buyer();
    let order_id = place_order(&workflow, user, &item, 2).await;

    workflow
        .update_status(order_id, OrderStatus::Paid, Some("payment received".to_string()))
        .await
        .unwrap();
    workflow
        .update_status(order_id, OrderStatus::Shipped, None)
        .await
        .unwrap();
    workflow.confirm_order(order_id, user).await.unwrap();

    let view = workflow
        .order_detail(order_id, Requester::User(user))
        .await
        .unwrap();
    assert_eq!(view.order.status, OrderStatus::Completed);

    // Sales were counted exactly once; stock stays reserved.
    let after = store.product_snapshot(item.id).await.unwrap();
    assert_eq!(after.sales_count, 2);
    assert_eq!(after.stock, 8);
}

#[tokio::test]
async fn remarks_are_updated_alongside_a_transition() {
    let (workflow, store) = engine();
    let item = product(1_000, 5);
    store.insert_product(item.clone()).await;

    let user = buyer();
    let order_id = place_order(&workflow, user, &item, 1).await;

    workflow
        .update_status(order_id, OrderStatus::Paid, Some("paid via card".to_string()))
        .await
        .unwrap();

    let view = workflow
        .order_detail(order_id, Requester::User(user))
        .await
        .unwrap();
    assert_eq!(view.order.remarks.as_deref(), Some("paid via card"));

    // A transition without remarks keeps the existing ones.
    workflow
        .update_status(order_id, OrderStatus::Shipped, None)
        .await
        .unwrap();
    let view = workflow
        .order_detail(order_id, Requester::User(user))
        .await
        .unwrap();
    assert_eq!(view.order.remarks.as_deref(), Some("paid via card"));
}

#[tokio::test]
async fn illegal_transitions_carry_the_offending_pair() {
    let (workflow, store) = engine();
    let item = product(1_000, 5);
    store.insert_product(item.clone()).await;

    let order_id = place_order(&workflow, buyer(), &item, 1).await;

    // Pending payment cannot jump straight to shipped.
    let err = workflow
        .update_status(order_id, OrderStatus::Shipped, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::IllegalStatusTransition {
            from: OrderStatus::PendingPayment,
            to: OrderStatus::Shipped,
        }
    ));
}

#[tokio::test]
async fn cancel_restores_stock_exactly_once() {
    let (workflow, store) = engine();
    let item = product(1_000, 10);
    store.insert_product(item.clone()).await;

    let user = buyer();
    let order_id = place_order(&workflow, user, &item, 4).await;
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 6);

    workflow.cancel_order(order_id, user).await.unwrap();
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 10);

    let view = workflow
        .order_detail(order_id, Requester::User(user))
        .await
        .unwrap();
    assert_eq!(view.order.status, OrderStatus::Cancelled);

    // Cancelled is terminal; a second cancel must not restore again.
    let err = workflow.cancel_order(order_id, user).await.unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalStatusTransition { .. }));
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 10);
}

#[tokio::test]
async fn paid_orders_can_still_be_cancelled_shipped_cannot() {
    let (workflow, store) = engine();
    let item = product(1_000, 10);
    store.insert_product(item.clone()).await;

    let user = buyer();
    let paid = place_order(&workflow, user, &item, 1).await;
    workflow
        .update_status(paid, OrderStatus::Paid, None)
        .await
        .unwrap();
    workflow.cancel_order(paid, user).await.unwrap();

    let shipped = place_order(&workflow, user, &item, 1).await;
    workflow
        .update_status(shipped, OrderStatus::Paid, None)
        .await
        .unwrap();
    workflow
        .update_status(shipped, OrderStatus::Shipped, None)
        .await
        .unwrap();
    let err = workflow.cancel_order(shipped, user).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::IllegalStatusTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        }
    ));
}

#[tokio::test]
async fn only_the_owner_may_cancel_or_confirm() {
    let (workflow, store) = engine();
    let item = product(1_000, 10);
    store.insert_product(item.clone()).await;

    let owner = buyer();
    let stranger = buyer();
    let order_id = place_order(&workflow, owner, &item, 1).await;

    let err = workflow.cancel_order(order_id, stranger).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Forbidden { user, order } if user == stranger && order == order_id
    ));

    workflow
        .update_status(order_id, OrderStatus::Paid, None)
        .await
        .unwrap();
    workflow
        .update_status(order_id, OrderStatus::Shipped, None)
        .await
        .unwrap();
    let err = workflow.confirm_order(order_id, stranger).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden { .. }));

    // Ownership failures leave the order untouched.
    let view = workflow
        .order_detail(order_id, Requester::User(owner))
        .await
        .unwrap();
    assert_eq!(view.order.status, OrderStatus::Shipped);
}

#[tokio::test]
async fn confirm_requires_a_shipped_order_and_counts_sales_once() {
    let (workflow, store) = engine();
    let item = product(1_000, 10);
    store.insert_product(item.clone()).await;

    let user = buyer();
    let order_id = place_order(&workflow, user, &item, 3).await;

    // Cannot confirm before shipment.
    let err = workflow.confirm_order(order_id, user).await.unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalStatusTransition { .. }));
    assert_eq!(store.product_snapshot(item.id).await.unwrap().sales_count, 0);

    workflow
        .update_status(order_id, OrderStatus::Paid, None)
        .await
        .unwrap();
    workflow
        .update_status(order_id, OrderStatus::Shipped, None)
        .await
        .unwrap();
    workflow.confirm_order(order_id, user).await.unwrap();
    assert_eq!(store.product_snapshot(item.id).await.unwrap().sales_count, 3);

    // Completed is terminal; re-confirming must not double-count.
    let err = workflow.confirm_order(order_id, user).await.unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalStatusTransition { .. }));
    assert_eq!(store.product_snapshot(item.id).await.unwrap().sales_count, 3);
}

#[tokio::test]
async fn soft_deleted_orders_vanish_from_reads_but_keep_their_stock_effects() {
    let (workflow, store) = engine();
    let item = product(1_000, 10);
    store.insert_product(item.clone()).await;

    let user = buyer();
    let order_id = place_order(&workflow, user, &item, 2).await;
    workflow.delete_order(order_id).await.unwrap();

    let err = workflow
        .order_detail(order_id, Requester::Privileged)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound(id) if id == order_id));

    let page = workflow
        .list_user_orders(user, &orderflow::OrderQuery::unfiltered())
        .await
        .unwrap();
    assert_eq!(page.total, 0);

    // Deletion hides the order without touching inventory.
    assert_eq!(store.product_snapshot(item.id).await.unwrap().stock, 8);

    // Deleting a vanished order reports not-found.
    let err = workflow.delete_order(order_id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound(_)));
}
