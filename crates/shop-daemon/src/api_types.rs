//! Request and response types for the shop-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_schemas::{CartLine, OrderId, OrderRecord};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// /v1/orders
// ---------------------------------------------------------------------------

/// An order as the admin panel sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub total: Option<f64>,
    /// Stored status, `pendiente` when unset.
    pub status: String,
    pub cart: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub inventory_applied_at: Option<DateTime<Utc>>,
}

impl From<OrderRecord> for OrderView {
    fn from(o: OrderRecord) -> Self {
        let status = o.status_or_default().to_string();
        Self {
            id: o.id,
            customer_name: o.customer_name,
            email: o.email,
            phone: o.phone,
            address: o.address,
            total: o.total,
            status,
            cart: o.cart.lines().to_vec(),
            created_at: o.created_at,
            inventory_applied_at: o.inventory_applied_at,
        }
    }
}

// ---------------------------------------------------------------------------
// PUT /v1/orders/:id/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub message: String,
    pub status: String,
    pub inventory_adjusted: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every 4xx/5xx from the order routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Body of a 401 from the admin gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthErrorResponse {
    /// "TOKEN_MISSING" | "TOKEN_EXPIRED" | "TOKEN_INVALID"
    pub code: String,
    pub message: String,
}
