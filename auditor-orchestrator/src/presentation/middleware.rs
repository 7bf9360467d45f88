//! HTTP middleware and error mapping

use std::time::Instant;

use axum::{
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::domain::OwnerId;
use crate::presentation::models::ErrorResponse;

/// Header carrying the identity of the calling principal
pub const OWNER_HEADER: &str = "x-owner-id";

/// Build a JSON error response
pub fn error_response(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> Response {
    let error_response = ErrorResponse {
        code: code.to_string(),
        message: message.into(),
        details,
        request_id: Uuid::new_v4(),
        timestamp: Utc::now(),
    };
    (status, Json(error_response)).into_response()
}

/// Owner of the request, taken from the `X-Owner-Id` header
///
/// Authentication happens in front of this service; the header is trusted.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Owner(OwnerId::new(value)))
            .ok_or_else(|| {
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Missing X-Owner-Id header",
                    None,
                )
            })
    }
}

/// Request logging middleware
pub async fn logging_middleware(request: Request<axum::body::Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "Processing request"
    );

    let response = next.run(request).await;
    let duration = start_time.elapsed();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}
