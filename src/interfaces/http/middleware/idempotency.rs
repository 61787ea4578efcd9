//! Idempotency middleware
//!
//! Deduplicates retries of the money-moving POST endpoints. A missing
//! `Idempotency-Key` gets a synthesised `auto-<uuid>` so the internal
//! flow still benefits. Replays return the stored response byte for
//! byte; a key reuse with a different body is a 409.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{IdempotencyRecord, RepositoryProvider};

const HEADER_NAME: &str = "idempotency-key";
const BODY_LIMIT: usize = 64 * 1024;

/// (method, path) pairs the middleware guards.
const TARGET_PATHS: [(&str, &str); 4] = [
    ("POST", "/api/v1/charging/start"),
    ("POST", "/api/v1/charging/stop"),
    ("POST", "/api/v1/balance/topup-qr"),
    ("POST", "/api/v1/balance/topup-card"),
];

#[derive(Clone)]
pub struct IdempotencyState {
    pub repos: Arc<dyn RepositoryProvider>,
}

pub async fn idempotency_middleware(
    State(state): State<IdempotencyState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();

    if !TARGET_PATHS.contains(&(method.as_str(), path.as_str())) {
        return next.run(request).await;
    }

    let key = request
        .headers()
        .get(HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("auto-{}", Uuid::new_v4()));

    // Buffer the body for hashing, then hand it back downstream.
    let (parts, body) = request.into_parts();
    let body_bytes = match to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({"success": false, "error": "invalid_request", "message": "Body too large"})),
            )
                .into_response();
        }
    };
    let body_hash = hash_body(&body_bytes);

    match state.repos.idempotency().find(&key).await {
        Ok(Some(record)) => {
            if !record.matches(&method, &path, &body_hash) {
                warn!(key = key.as_str(), "Idempotency-Key conflict");
                return (
                    StatusCode::CONFLICT,
                    Json(json!({
                        "success": false,
                        "error": "invalid_request",
                        "message": "Idempotency-Key conflict",
                    })),
                )
                    .into_response();
            }

            info!(key = key.as_str(), "Replaying stored idempotent response");
            let status =
                StatusCode::from_u16(record.status_code).unwrap_or(StatusCode::OK);
            let mut response = (status, Json(record.response_body)).into_response();
            echo_key(&mut response, &key);
            return response;
        }
        Ok(None) => {}
        Err(e) => {
            // Degrade to pass-through; refusing the request over a lookup
            // failure would block legitimate charging.
            error!(key = key.as_str(), error = %e, "Idempotency lookup failed");
        }
    }

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (mut response_parts, response_body) = response.into_parts();
    let response_bytes = match to_bytes(response_body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(key = key.as_str(), error = %e, "Failed to buffer response");
            return Response::from_parts(response_parts, Body::empty());
        }
    };

    if let Ok(response_json) = serde_json::from_slice::<Value>(&response_bytes) {
        let record = IdempotencyRecord {
            key: key.clone(),
            method,
            path,
            body_hash,
            response_body: response_json,
            status_code: response_parts.status.as_u16(),
            created_at: Utc::now(),
        };
        if let Err(e) = state.repos.idempotency().insert(record).await {
            error!(key = key.as_str(), error = %e, "Failed to persist idempotency record");
        }
    }

    if let Ok(value) = HeaderValue::from_str(&key) {
        response_parts.headers.insert(HEADER_NAME, value);
    }

    Response::from_parts(response_parts, Body::from(response_bytes))
}

fn echo_key(response: &mut Response, key: &str) {
    if let Ok(value) = HeaderValue::from_str(key) {
        response.headers_mut().insert(HEADER_NAME, value);
    }
}

/// SHA-256 of the canonical JSON body. `serde_json` object maps are
/// sorted by key, so parse-then-serialize yields a canonical form;
/// non-JSON bodies hash as empty.
fn hash_body(bytes: &[u8]) -> String {
    let canonical = serde_json::from_slice::<Value>(bytes)
        .ok()
        .and_then(|value| serde_json::to_string(&value).ok())
        .unwrap_or_else(|| "{}".to_string());

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_does_not_change_hash() {
        let a = hash_body(br#"{"station_id":"ST-1","connector_id":1}"#);
        let b = hash_body(br#"{"connector_id":1,"station_id":"ST-1"}"#);
        assert_eq!(a, b);
    }

    #[test]
    fn whitespace_does_not_change_hash() {
        let a = hash_body(br#"{"a": 1}"#);
        let b = hash_body(br#"{ "a" : 1 }"#);
        assert_eq!(a, b);
    }

    #[test]
    fn different_bodies_differ() {
        let a = hash_body(br#"{"amount_som": 100}"#);
        let b = hash_body(br#"{"amount_som": 200}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_and_invalid_bodies_hash_as_empty_object() {
        assert_eq!(hash_body(b""), hash_body(b"not json"));
        assert_eq!(hash_body(b"{}"), hash_body(b""));
    }
}
