//! Postgres persistence for orders and products.
//!
//! Pool bootstrap, embedded migrations, seeding helpers and [`PgStore`], the
//! production implementation of the transition engine's store seam.

use anyhow::{Context, Result};
use shop_schemas::{NewOrder, NewProduct, OrderId, ProductId, ProductRecord, STATUS_PENDING};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod store;

pub use store::{PgStore, PgTx};

pub const ENV_DB_URL: &str = "SHOP_DATABASE_URL";

/// Connect to Postgres using SHOP_DATABASE_URL.
pub async fn connect_from_env(max_connections: u32) -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, max_connections).await
}

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

pub async fn insert_product(pool: &PgPool, p: &NewProduct) -> Result<ProductId> {
    let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into products (name, price, stock)
        values ($1, $2, $3)
        returning id
        "#,
    )
    .bind(&p.name)
    .bind(p.price)
    .bind(p.stock)
    .fetch_one(pool)
    .await
    .context("insert_product failed")?;
    Ok(id)
}

pub async fn fetch_product(pool: &PgPool, id: ProductId) -> Result<Option<ProductRecord>> {
    let row = sqlx::query_as::<_, (i64, String, f64, i64)>(
        "select id, name, price, stock from products where id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("fetch_product failed")?;

    Ok(row.map(|(id, name, price, stock)| ProductRecord {
        id,
        name,
        price,
        stock,
    }))
}

/// Insert an order as checkout would: cart serialized to its stored JSON text.
pub async fn insert_order(pool: &PgPool, o: &NewOrder) -> Result<OrderId> {
    let cart_text = o.cart.to_storage_text();
    insert_order_row(pool, o, Some(cart_text.as_str())).await
}

/// Insert an order with the cart column set to arbitrary text (or NULL),
/// for rows written by older checkout code.
pub async fn insert_order_raw_cart(pool: &PgPool, o: &NewOrder, cart_text: Option<&str>) -> Result<OrderId> {
    insert_order_row(pool, o, cart_text).await
}

async fn insert_order_row(pool: &PgPool, o: &NewOrder, cart_text: Option<&str>) -> Result<OrderId> {
    let status = o.status.as_deref().unwrap_or(STATUS_PENDING);
    let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into orders (customer_name, email, phone, address, total, cart, status)
        values ($1, $2, $3, $4, $5, $6, $7)
        returning id
        "#,
    )
    .bind(&o.customer_name)
    .bind(&o.email)
    .bind(&o.phone)
    .bind(&o.address)
    .bind(o.total)
    .bind(cart_text)
    .bind(status)
    .fetch_one(pool)
    .await
    .context("insert_order failed")?;
    Ok(id)
}
