//! Admin gate: `Authorization: Bearer <jwt>`, HS256.
//!
//! Rejections are 401 with a machine-readable code and a `WWW-Authenticate`
//! challenge:
//!
//! | condition              | code            |
//! |------------------------|-----------------|
//! | header absent / empty  | `TOKEN_MISSING` |
//! | signature ok, expired  | `TOKEN_EXPIRED` |
//! | anything else          | `TOKEN_INVALID` |
//!
//! CORS preflights pass through untouched.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::warn;

use crate::{api_types::AuthErrorResponse, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    Missing,
    Expired,
    Invalid,
}

impl AuthRejection {
    pub fn code(self) -> &'static str {
        match self {
            AuthRejection::Missing => "TOKEN_MISSING",
            AuthRejection::Expired => "TOKEN_EXPIRED",
            AuthRejection::Invalid => "TOKEN_INVALID",
        }
    }

    fn challenge(self) -> &'static str {
        match self {
            AuthRejection::Missing => r#"Bearer realm="admin", error="invalid_request""#,
            AuthRejection::Expired => {
                r#"Bearer realm="admin", error="invalid_token", error_description="expired""#
            }
            AuthRejection::Invalid => r#"Bearer realm="admin", error="invalid_token""#,
        }
    }

    fn message(self) -> &'static str {
        match self {
            AuthRejection::Missing => "token not provided",
            AuthRejection::Expired => "token expired",
            AuthRejection::Invalid => "token invalid",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let mut resp = (
            StatusCode::UNAUTHORIZED,
            Json(AuthErrorResponse {
                code: self.code().to_string(),
                message: self.message().to_string(),
            }),
        )
            .into_response();
        resp.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(self.challenge()));
        resp
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    let raw = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Verify `token` against `secret`.
pub fn verify_admin_token(token: &str, secret: &str) -> Result<Value, AuthRejection> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    jsonwebtoken::decode::<Value>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => AuthRejection::Expired,
            _ => AuthRejection::Invalid,
        })
}

pub async fn require_admin<S: Send + Sync + 'static>(
    State(st): State<Arc<AppState<S>>>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    let Some(token) = bearer_token(&req) else {
        return AuthRejection::Missing.into_response();
    };

    let Some(secret) = st.jwt_secret.as_deref() else {
        warn!("admin request rejected: no JWT secret configured");
        return AuthRejection::Invalid.into_response();
    };

    match verify_admin_token(token, secret) {
        Ok(_) => next.run(req).await,
        Err(rejection) => {
            warn!(code = rejection.code(), uri = %req.uri(), "admin request rejected");
            rejection.into_response()
        }
    }
}
