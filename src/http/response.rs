//! Responses the guard produces itself.
//!
//! # Design Decisions
//! - Rejection bodies are JSON with `Content-Type: application/json`
//! - Admin redirects carry a relative `Location`
//! - Upstream failures map to 502, upstream timeouts to 504

use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// `403` for a vote from a flagged client.
pub fn vote_forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "success": false,
            "error": "forbidden5",
            "reason": "proxy_detected",
            "canVote": false,
        })),
    )
        .into_response()
}

/// `403` for an API request without a usable session. The freshly issued
/// cookie rides along so the next request succeeds.
pub fn session_rejected(error: &str, set_cookie: HeaderValue) -> Response {
    let mut response = (StatusCode::FORBIDDEN, Json(json!({ "error": error }))).into_response();
    response.headers_mut().append(SET_COOKIE, set_cookie);
    response
}

pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => internal_error(),
    }
}

pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal error" })),
    )
        .into_response()
}

pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}

pub fn gateway_timeout() -> Response {
    (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
}
