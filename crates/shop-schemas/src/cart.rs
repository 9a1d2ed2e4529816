//! Cart snapshot: the product/quantity lines frozen onto an order at checkout.
//!
//! The snapshot is history, not a live view of the catalog. It is persisted as
//! a JSON text column and is parsed leniently: anything that is not a
//! JSON array decodes to an empty cart, and malformed lines decode to lines the
//! inventory adjuster will skip.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ProductId;

/// One line of a cart snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// `None` when the stored line had no usable product reference.
    pub product_id: Option<ProductId>,
    pub name: Option<String>,
    pub quantity: i64,
    pub unit_price: Option<f64>,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id: Some(product_id),
            name: None,
            quantity,
            unit_price: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_unit_price(mut self, price: f64) -> Self {
        self.unit_price = Some(price);
        self
    }

    /// Decode one stored line. Never fails; unusable fields become `None` / 0.
    ///
    /// Product id is read from `_id`, then `id`, then `productId` (checkout
    /// payloads have used all three). Quantity accepts integers, floats
    /// (truncated toward zero) and numeric strings.
    pub fn from_json_value(v: &Value) -> Self {
        let Some(obj) = v.as_object() else {
            return Self {
                product_id: None,
                name: None,
                quantity: 0,
                unit_price: None,
            };
        };

        let product_id = ["_id", "id", "productId"]
            .iter()
            .filter_map(|k| obj.get(*k))
            .find(|v| !v.is_null())
            .and_then(parse_product_id);

        Self {
            product_id,
            name: obj.get("name").and_then(Value::as_str).map(str::to_string),
            quantity: obj.get("quantity").map(parse_quantity).unwrap_or(0),
            unit_price: obj
                .get("price")
                .or_else(|| obj.get("unitPrice"))
                .and_then(parse_f64),
        }
    }

    fn to_storage_value(&self) -> Value {
        json!({
            "id": self.product_id,
            "name": self.name,
            "quantity": self.quantity,
            "price": self.unit_price,
        })
    }
}

/// Ordered, immutable list of cart lines captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot(Vec<CartLine>);

impl CartSnapshot {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self(lines)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the stored text column. Absent, blank, non-JSON and non-array
    /// input all yield an empty cart.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(v) => Self::from_json_value(&v),
            Err(_) => Self::default(),
        }
    }

    pub fn from_json_value(v: &Value) -> Self {
        match v {
            Value::Array(items) => Self(items.iter().map(CartLine::from_json_value).collect()),
            // Some legacy rows double-encoded the cart as a JSON string.
            Value::String(inner) => Self::parse_lenient(Some(inner)),
            _ => Self::default(),
        }
    }

    /// Text form written to the `cart` column at checkout.
    pub fn to_storage_text(&self) -> String {
        Value::Array(self.0.iter().map(CartLine::to_storage_value).collect()).to_string()
    }
}

impl From<Vec<CartLine>> for CartSnapshot {
    fn from(lines: Vec<CartLine>) -> Self {
        Self(lines)
    }
}

fn parse_product_id(v: &Value) -> Option<ProductId> {
    let id = match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (id > 0).then_some(id)
}

fn parse_quantity(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn parse_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
