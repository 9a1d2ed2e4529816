//! shop-schemas
//!
//! Typed representations of the persisted order and product rows shared by
//! the inventory engine, the stores and the daemon. No I/O lives here.

mod cart;
mod status;

pub use cart::{CartLine, CartSnapshot};
pub use status::{
    normalize_status, OrderStatus, STATUS_COMPLETED, STATUS_PENDING, STATUS_SHIPPED,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OrderId = i64;
pub type ProductId = i64;

/// A persisted order row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub total: Option<f64>,
    /// Raw status text as last written. `None` on rows created before the
    /// column existed.
    pub status: Option<String>,
    pub cart: CartSnapshot,
    pub created_at: DateTime<Utc>,
    /// Set in the same transaction that decremented stock for this order.
    pub inventory_applied_at: Option<DateTime<Utc>>,
}

impl OrderRecord {
    pub fn current_status(&self) -> OrderStatus {
        OrderStatus::from_stored(self.status.as_deref())
    }

    /// Stored status text, or `pendiente` when unset.
    pub fn status_or_default(&self) -> &str {
        match self.status.as_deref() {
            Some(s) if !normalize_status(s).is_empty() => s,
            _ => STATUS_PENDING,
        }
    }
}

/// Checkout payload for creating an order row.
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub total: Option<f64>,
    pub cart: CartSnapshot,
    /// Defaults to `pendiente` when `None`.
    pub status: Option<String>,
}

impl NewOrder {
    pub fn with_cart(cart: impl Into<CartSnapshot>) -> Self {
        Self {
            cart: cart.into(),
            ..Self::default()
        }
    }
}

/// A persisted product row. `stock` is never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: f64, stock: i64) -> Self {
        Self {
            name: name.into(),
            price,
            stock,
        }
    }
}
