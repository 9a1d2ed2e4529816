//! Test support: an in-memory store and seeding helpers.

mod memory_store;

pub use memory_store::{MemoryStore, MemoryTx, TxCounters};

use shop_schemas::{CartLine, CartSnapshot, NewOrder, NewProduct, OrderId, ProductId};

/// Seed one product with `stock` units.
pub async fn seed_product(store: &MemoryStore, name: &str, stock: i64) -> ProductId {
    store.insert_product(NewProduct::new(name, 10.0, stock)).await
}

/// Seed a pending order whose cart holds `(product_id, quantity)` lines.
pub async fn seed_order(store: &MemoryStore, lines: &[(ProductId, i64)]) -> OrderId {
    let cart: CartSnapshot = lines
        .iter()
        .map(|&(pid, qty)| CartLine::new(pid, qty))
        .collect::<Vec<_>>()
        .into();
    store.insert_order(NewOrder::with_cart(cart)).await
}

/// Seed an order with an arbitrary prebuilt cart (lines without ids, etc).
pub async fn seed_order_with_cart(store: &MemoryStore, cart: CartSnapshot) -> OrderId {
    store.insert_order(NewOrder::with_cart(cart)).await
}
