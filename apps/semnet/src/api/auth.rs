//! # Authentication
//!
//! Optional bearer-key authentication for the semnet HTTP API.
//!
//! - `SEMNET_API_KEY`: if set, every route except `/health` requires
//!   `Authorization: Bearer <key>` (a bare `<key>` is accepted too).

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

/// Routes reachable without a key.
const PUBLIC_PATHS: &[&str] = &["/health"];

/// `SEMNET_API_KEY`, if set and non-empty.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("SEMNET_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Constant-time key comparison. Both sides are zero-padded to the longer
/// length so the comparison time does not depend on where they differ.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let len = provided.len().max(expected.len());
    let mut left = vec![0u8; len];
    let mut right = vec![0u8; len];
    left[..provided.len()].copy_from_slice(provided);
    right[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = left.ct_eq(&right).into();
    bytes_match && provided.len() == expected.len()
}

fn unauthorized(reason: &'static str) -> Response {
    tracing::warn!(event = "auth_failure", reason, "Authentication failed");
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Unauthorized".to_string(),
        }),
    )
        .into_response()
}

/// Reject requests without the configured key.
pub async fn api_key_auth_middleware(request: Request<Body>, next: Next) -> Response {
    let Some(expected) = get_api_key_from_env() else {
        return next.run(request).await;
    };

    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    match provided {
        Some(key) if keys_match(key, &expected) => next.run(request).await,
        Some(_) => unauthorized("invalid_api_key"),
        None => unauthorized("missing_authorization_header"),
    }
}
