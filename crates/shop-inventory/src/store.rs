//! Storage seam for the transition engine.
//!
//! The engine never holds a global connection. It is handed an
//! [`InventoryStore`] at construction and does all of its mutation through a
//! [`StoreTx`]: one transaction per transition, committed or rolled back as a
//! whole.
//!
//! # Contract for implementors
//!
//! - `lock_order` must take an exclusive per-order lock that is held until
//!   `commit` / `rollback` (or drop). Two transactions locking the same order
//!   must serialize.
//! - `lock_stock` must likewise lock the product row before the caller's
//!   read-modify-write.
//! - Writes are invisible to other transactions until `commit`.
//! - Dropping a transaction without committing discards every write.
//! - `write_stock` must reject negative values.

use anyhow::Result;
use async_trait::async_trait;
use shop_schemas::{OrderId, OrderRecord, ProductId};

#[async_trait]
pub trait InventoryStore: Send + Sync {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx>;

    /// Non-locking read of a single order.
    async fn fetch_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Non-locking read of all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>>;

    /// Current stock of a product, `None` if the product does not exist.
    async fn fetch_stock(&self, product_id: ProductId) -> Result<Option<i64>>;
}

#[async_trait]
pub trait StoreTx: Send {
    /// Lock the order row for the life of the transaction and read it.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    async fn write_status(&mut self, id: OrderId, status: &str) -> Result<()>;

    /// Compare-and-swap on the order's inventory marker.
    ///
    /// Returns `true` if this call set the marker, `false` if it was already
    /// set (inventory was applied by an earlier transition).
    async fn claim_inventory_marker(&mut self, id: OrderId) -> Result<bool>;

    /// Lock the product row and read its stock. `None` if the product is gone.
    async fn lock_stock(&mut self, product_id: ProductId) -> Result<Option<i64>>;

    async fn write_stock(&mut self, product_id: ProductId, stock: i64) -> Result<()>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}
