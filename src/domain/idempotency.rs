//! Idempotency record for mutating POST endpoints.

use chrono::{DateTime, Utc};

/// Stored request/response pair keyed by the `Idempotency-Key` header.
/// Records are purged after 24 hours.
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub key: String,
    pub method: String,
    pub path: String,
    /// SHA-256 of the canonical-JSON request body, hex-encoded.
    pub body_hash: String,
    pub response_body: serde_json::Value,
    pub status_code: u16,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// A replay matches only when method, path and body all agree.
    pub fn matches(&self, method: &str, path: &str, body_hash: &str) -> bool {
        self.method == method && self.path == path && self.body_hash == body_hash
    }
}
