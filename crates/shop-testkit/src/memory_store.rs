//! In-memory `InventoryStore` with serializable transactions.
//!
//! A transaction holds the store-wide async mutex from `begin` until commit,
//! rollback or drop, and stages every write in a private copy of the tables.
//! Commit swaps the copy in; anything else discards it. Every transaction is
//! serialized, a superset of the per-row locking the Postgres store does.
//!
//! Faults can be injected to exercise rollback paths.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use shop_inventory::{InventoryStore, StoreTx};
use shop_schemas::{NewOrder, NewProduct, OrderId, OrderRecord, ProductId, ProductRecord};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: BTreeMap<OrderId, OrderRecord>,
    products: BTreeMap<ProductId, ProductRecord>,
    next_order_id: OrderId,
    next_product_id: ProductId,
}

/// Faults applied to transactions begun after they are set.
#[derive(Debug, Clone, Default)]
struct FaultPlan {
    fail_stock_write_for: Option<ProductId>,
    fail_commit: bool,
    stock_write_delay: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxCounters {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<AsyncMutex<Tables>>,
    faults: Arc<Mutex<FaultPlan>>,
    counters: Arc<Mutex<TxCounters>>,
    stock_locks: Arc<Mutex<Vec<ProductId>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Seeding / inspection (outside any transaction)
    // ---------------------------------------------------------------------

    pub async fn insert_product(&self, p: NewProduct) -> ProductId {
        let mut t = self.tables.lock().await;
        t.next_product_id += 1;
        let id = t.next_product_id;
        t.products.insert(
            id,
            ProductRecord {
                id,
                name: p.name,
                price: p.price,
                stock: p.stock.max(0),
            },
        );
        id
    }

    pub async fn insert_order(&self, o: NewOrder) -> OrderId {
        let mut t = self.tables.lock().await;
        t.next_order_id += 1;
        let id = t.next_order_id;
        t.orders.insert(
            id,
            OrderRecord {
                id,
                customer_name: o.customer_name,
                email: o.email,
                phone: o.phone,
                address: o.address,
                total: o.total,
                status: Some(o.status.unwrap_or_else(|| shop_schemas::STATUS_PENDING.to_string())),
                cart: o.cart,
                created_at: Utc::now(),
                inventory_applied_at: None,
            },
        );
        id
    }

    /// Overwrite an order's stored status directly, bypassing the engine
    /// (legacy rows, `None` for rows that predate the status column).
    pub async fn force_status(&self, id: OrderId, status: Option<&str>) {
        if let Some(o) = self.tables.lock().await.orders.get_mut(&id) {
            o.status = status.map(str::to_string);
        }
    }

    /// Remove a product from the catalog (cart snapshots keep referencing it).
    pub async fn delete_product(&self, id: ProductId) -> bool {
        self.tables.lock().await.products.remove(&id).is_some()
    }

    pub async fn product(&self, id: ProductId) -> Option<ProductRecord> {
        self.tables.lock().await.products.get(&id).cloned()
    }

    pub async fn order(&self, id: OrderId) -> Option<OrderRecord> {
        self.tables.lock().await.orders.get(&id).cloned()
    }

    pub async fn stock(&self, id: ProductId) -> Option<i64> {
        self.product(id).await.map(|p| p.stock)
    }

    /// Snapshot of every product's stock, keyed by id.
    pub async fn stock_levels(&self) -> BTreeMap<ProductId, i64> {
        self.tables
            .lock()
            .await
            .products
            .iter()
            .map(|(id, p)| (*id, p.stock))
            .collect()
    }

    pub fn counters(&self) -> TxCounters {
        *lock_sync(&self.counters)
    }

    /// Product ids passed to `lock_stock` since the last call, in call order.
    pub fn take_stock_lock_order(&self) -> Vec<ProductId> {
        std::mem::take(&mut *lock_sync(&self.stock_locks))
    }

    // ---------------------------------------------------------------------
    // Fault injection
    // ---------------------------------------------------------------------

    pub fn fail_stock_write_for(&self, product_id: ProductId) {
        lock_sync(&self.faults).fail_stock_write_for = Some(product_id);
    }

    pub fn fail_commit(&self) {
        lock_sync(&self.faults).fail_commit = true;
    }

    /// Sleep before every stock write, to widen race and cancellation windows.
    pub fn delay_stock_writes(&self, delay: Duration) {
        lock_sync(&self.faults).stock_write_delay = Some(delay);
    }

    pub fn clear_faults(&self) {
        *lock_sync(&self.faults) = FaultPlan::default();
    }

    fn bump(&self, f: impl FnOnce(&mut TxCounters)) {
        f(&mut lock_sync(&self.counters));
    }
}

fn lock_sync<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Poison is ignored.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl InventoryStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let work = guard.clone();
        let faults = lock_sync(&self.faults).clone();
        self.bump(|c| c.begun += 1);
        Ok(MemoryTx {
            guard,
            work,
            faults,
            store: self.clone(),
        })
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.order(id).await)
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let t = self.tables.lock().await;
        let mut out: Vec<OrderRecord> = t.orders.values().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn fetch_stock(&self, product_id: ProductId) -> Result<Option<i64>> {
        Ok(self.stock(product_id).await)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
    faults: FaultPlan,
    store: MemoryStore,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn write_status(&mut self, id: OrderId, status: &str) -> Result<()> {
        let order = self
            .work
            .orders
            .get_mut(&id)
            .ok_or_else(|| anyhow!("write_status: order {id} does not exist"))?;
        order.status = Some(status.to_string());
        Ok(())
    }

    async fn claim_inventory_marker(&mut self, id: OrderId) -> Result<bool> {
        let order = self
            .work
            .orders
            .get_mut(&id)
            .ok_or_else(|| anyhow!("claim_inventory_marker: order {id} does not exist"))?;
        if order.inventory_applied_at.is_some() {
            return Ok(false);
        }
        order.inventory_applied_at = Some(Utc::now());
        Ok(true)
    }

    async fn lock_stock(&mut self, product_id: ProductId) -> Result<Option<i64>> {
        lock_sync(&self.store.stock_locks).push(product_id);
        Ok(self.work.products.get(&product_id).map(|p| p.stock))
    }

    async fn write_stock(&mut self, product_id: ProductId, stock: i64) -> Result<()> {
        if let Some(delay) = self.faults.stock_write_delay {
            tokio::time::sleep(delay).await;
        }
        if self.faults.fail_stock_write_for == Some(product_id) {
            bail!("injected stock write failure for product {product_id}");
        }
        if stock < 0 {
            bail!("stock must be non-negative (product {product_id}, value {stock})");
        }
        let product = self
            .work
            .products
            .get_mut(&product_id)
            .ok_or_else(|| anyhow!("write_stock: product {product_id} does not exist"))?;
        product.stock = stock;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let MemoryTx {
            mut guard,
            work,
            faults,
            store,
        } = self;
        if faults.fail_commit {
            store.bump(|c| c.rolled_back += 1);
            bail!("injected commit failure");
        }
        *guard = work;
        store.bump(|c| c.committed += 1);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.store.bump(|c| c.rolled_back += 1);
        Ok(())
    }
}
