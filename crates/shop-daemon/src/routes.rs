//! Axum router and all HTTP handlers for shop-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! the CORS and trace layers.  Tests compose the bare router directly.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use shop_inventory::InventoryStore;
use shop_schemas::OrderId;

use crate::{
    api_types::{HealthResponse, OrderView, StatusUpdateRequest, StatusUpdateResponse},
    auth::require_admin,
    error::ApiError,
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Order routes sit behind the admin gate; health does not.
pub fn build_router<S: InventoryStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let admin = Router::new()
        .route("/v1/orders", get(list_orders::<S>))
        .route("/v1/orders/:id", get(get_order::<S>))
        .route("/v1/orders/:id/status", put(update_status::<S>))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_admin::<S>,
        ));

    Router::new()
        .route("/v1/health", get(health::<S>))
        .merge(admin)
        .with_state(state)
}

/// Strict: the whole segment must be a positive integer ("12abc" and "1.5"
/// are rejected, not truncated).
fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    match raw.trim().parse::<OrderId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest("order id must be a positive integer")),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health<S: InventoryStore + 'static>(
    State(st): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.clone(),
            version: st.build.version.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/orders
// ---------------------------------------------------------------------------

pub(crate) async fn list_orders<S: InventoryStore + 'static>(
    State(st): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = st.store().list_orders().await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

// ---------------------------------------------------------------------------
// GET /v1/orders/:id
// ---------------------------------------------------------------------------

pub(crate) async fn get_order<S: InventoryStore + 'static>(
    State(st): State<Arc<AppState<S>>>,
    Path(raw_id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let id = parse_order_id(&raw_id)?;
    let order = st.store().fetch_order(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(OrderView::from(order)))
}

// ---------------------------------------------------------------------------
// PUT /v1/orders/:id/status
// ---------------------------------------------------------------------------

/// Change an order's status. Entering `completado` for the first time also
/// decrements stock for the order's cart, in the same transaction.
///
/// The transition runs on its own task, so a client that disconnects
/// mid-request does not abandon a half-applied change.
pub(crate) async fn update_status<S: InventoryStore + 'static>(
    State(st): State<Arc<AppState<S>>>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = parse_order_id(&raw_id)?;

    let StatusUpdateRequest { status } = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("body must be a JSON object with a string status"))?;

    let outcome = Arc::clone(&st.service)
        .transition_status_detached(id, status)
        .await?;

    let message = if outcome.inventory_adjusted {
        "status updated and stock decremented"
    } else {
        "status updated"
    };

    Ok((
        StatusCode::OK,
        Json(StatusUpdateResponse {
            success: true,
            message: message.to_string(),
            status: outcome.status_applied,
            inventory_adjusted: outcome.inventory_adjusted,
        }),
    )
        .into_response())
}
