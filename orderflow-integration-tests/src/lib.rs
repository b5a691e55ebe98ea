//! Shared fixtures for the `OrderFlow` integration tests.
//!
//! The tests themselves live in `tests/` and drive the workflow engine
//! against the in-memory store, which honors the same transactional contract
//! as the postgres adapter.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use orderflow::{
    Money, OrderWorkflow, Product, ProductId, ProductName, ProductStatus, Quantity, ShippingInfo,
    UserId,
};
use orderflow_memory::InMemoryOrderStore;
use uuid::Uuid;

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call from every
/// test; installation happens once.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// A workflow engine over a fresh in-memory store, plus a handle to that
/// store for seeding and assertions.
pub fn engine() -> (OrderWorkflow<InMemoryOrderStore>, InMemoryOrderStore) {
    let store = InMemoryOrderStore::new();
    (OrderWorkflow::new(store.clone()), store)
}

/// A fresh buyer identity.
pub fn buyer() -> UserId {
    UserId::new(Uuid::now_v7())
}

/// An active product with the given unit price (in cents) and stock.
pub fn product(cents: u64, stock: u32) -> Product {
    Product {
        id: ProductId::new(Uuid::now_v7()),
        name: ProductName::try_new("Espresso Grinder").unwrap(),
        price: Money::from_cents(cents).unwrap(),
        image: Some("grinder.jpg".to_string()),
        stock,
        status: ProductStatus::Active,
        sales_count: 0,
    }
}

/// A plain shipping snapshot.
pub fn shipping() -> ShippingInfo {
    ShippingInfo {
        address_id: None,
        receiver_name: "Alex Doe".to_string(),
        receiver_phone: "555-0100".to_string(),
        receiver_address: "1 Main St, Springfield".to_string(),
    }
}

/// A single-line quantity.
pub fn qty(value: u32) -> Quantity {
    Quantity::new(value).unwrap()
}
