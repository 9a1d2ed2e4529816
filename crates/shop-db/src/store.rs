//! `InventoryStore` over a Postgres pool.
//!
//! Every engine transaction is one SQL transaction. Orders and products are
//! locked with `select ... for update`, so two transitions of the same order
//! serialize on the order row, and two orders sharing a product serialize on
//! the product row. The inventory marker is claimed with a conditional
//! update whose row count says whether this transaction won.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_inventory::{InventoryStore, StoreTx};
use shop_schemas::{CartSnapshot, OrderId, OrderRecord, ProductId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

const ORDER_COLUMNS: &str = "id, customer_name, email, phone, address, total, cart, status, created_at, inventory_applied_at";

fn order_from_row(row: &PgRow) -> Result<OrderRecord> {
    let cart_text: Option<String> = row.try_get("cart")?;
    Ok(OrderRecord {
        id: row.try_get("id")?,
        customer_name: row.try_get("customer_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        total: row.try_get("total")?,
        status: row.try_get("status")?,
        cart: CartSnapshot::parse_lenient(cart_text.as_deref()),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        inventory_applied_at: row.try_get("inventory_applied_at")?,
    })
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        let tx = self.pool.begin().await.context("begin transaction failed")?;
        Ok(PgTx { tx })
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let sql = format!("select {ORDER_COLUMNS} from orders where id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("fetch_order failed")?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let sql = format!("select {ORDER_COLUMNS} from orders order by created_at desc, id desc");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("list_orders failed")?;
        rows.iter().map(order_from_row).collect()
    }

    async fn fetch_stock(&self, product_id: ProductId) -> Result<Option<i64>> {
        let row = sqlx::query_as::<_, (i64,)>("select stock from products where id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .context("fetch_stock failed")?;
        Ok(row.map(|(s,)| s))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let sql = format!("select {ORDER_COLUMNS} from orders where id = $1 for update");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("lock_order failed")?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn write_status(&mut self, id: OrderId, status: &str) -> Result<()> {
        let res = sqlx::query("update orders set status = $2 where id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await
            .context("write_status failed")?;
        if res.rows_affected() != 1 {
            bail!("write_status: order {id} not updated");
        }
        Ok(())
    }

    async fn claim_inventory_marker(&mut self, id: OrderId) -> Result<bool> {
        let res = sqlx::query(
            r#"
            update orders
               set inventory_applied_at = now()
             where id = $1
               and inventory_applied_at is null
            "#,
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .context("claim_inventory_marker failed")?;
        let claimed = res.rows_affected() == 1;
        debug!(order_id = id, claimed, "inventory marker claim");
        Ok(claimed)
    }

    async fn lock_stock(&mut self, product_id: ProductId) -> Result<Option<i64>> {
        let row = sqlx::query_as::<_, (i64,)>("select stock from products where id = $1 for update")
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("lock_stock failed")?;
        Ok(row.map(|(s,)| s))
    }

    async fn write_stock(&mut self, product_id: ProductId, stock: i64) -> Result<()> {
        if stock < 0 {
            bail!("refusing negative stock {stock} for product {product_id}");
        }
        let res = sqlx::query("update products set stock = $2 where id = $1")
            .bind(product_id)
            .bind(stock)
            .execute(&mut *self.tx)
            .await
            .context("write_stock failed")?;
        if res.rows_affected() != 1 {
            bail!("write_stock: product {product_id} not updated");
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("commit failed")
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.context("rollback failed")
    }
}
