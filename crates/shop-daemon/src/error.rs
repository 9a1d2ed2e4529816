//! HTTP error mapping for the order routes.
//!
//! Clients only ever see generic text. The full error chain goes to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shop_inventory::TransitionError;
use tracing::error;

use crate::api_types::ErrorResponse;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    NotFound,
    /// Stock could not be updated; status and stock were rolled back.
    AdjustmentFailed(anyhow::Error),
    Internal(anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AdjustmentFailed(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Validation(msg) => ApiError::BadRequest(msg),
            TransitionError::NotFound(_) => ApiError::NotFound,
            err @ TransitionError::AdjustmentFailure { .. } => ApiError::AdjustmentFailed(anyhow::Error::new(err)),
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::BadRequest(msg) => (*msg).to_string(),
            ApiError::NotFound => "order not found".to_string(),
            ApiError::AdjustmentFailed(err) => {
                error!(error = ?err, "inventory adjustment failed");
                "could not update inventory; order left unchanged".to_string()
            }
            ApiError::Internal(err) => {
                error!(error = ?err, "request failed");
                "internal error".to_string()
            }
        };
        (
            status,
            Json(ErrorResponse {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
