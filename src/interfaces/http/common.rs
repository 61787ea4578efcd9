//! Shared response shapes
//!
//! Every reply carries `success`; failures add a stable `error` code and
//! a human message. Fixed-point money converts to JSON numbers here, at
//! the edge — never earlier.

use axum::http::StatusCode;
use axum::Json;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::domain::DomainError;

/// A successful reply; `data` keys are merged beside `success`.
pub fn ok_response(data: Value) -> Json<Value> {
    let mut body = json!({ "success": true });
    if let (Some(object), Some(extra)) = (body.as_object_mut(), data.as_object()) {
        for (key, value) in extra {
            object.insert(key.clone(), value.clone());
        }
    }
    Json(body)
}

/// Map a domain error onto (status, body).
pub fn error_response(err: &DomainError) -> (StatusCode, Json<Value>) {
    let status = match err {
        DomainError::ClientNotFound(_)
        | DomainError::StationNotFound(_)
        | DomainError::ConnectorNotFound(_)
        | DomainError::SessionNotFound(_) => StatusCode::NOT_FOUND,

        DomainError::SessionAlreadyActive
        | DomainError::ConnectorOccupied(_)
        | DomainError::Conflict(_)
        | DomainError::StationOffline { .. }
        | DomainError::StationNeverConnected(_) => StatusCode::CONFLICT,

        DomainError::AccountDeletionPending | DomainError::AccountBlocked => {
            StatusCode::FORBIDDEN
        }

        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

        DomainError::InsufficientBalance { .. }
        | DomainError::AmountExceedsBalance { .. }
        | DomainError::ZeroBalance { .. }
        | DomainError::Validation(_) => StatusCode::BAD_REQUEST,

        DomainError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut body = json!({
        "success": false,
        "error": err.code(),
        "message": err.to_string(),
    });

    // Balance failures carry enough detail for the mobile UX.
    if let Some(object) = body.as_object_mut() {
        match err {
            DomainError::InsufficientBalance { balance, required } => {
                object.insert("current_balance".into(), money(*balance));
                object.insert("required_amount".into(), money(*required));
            }
            DomainError::AmountExceedsBalance { balance, requested } => {
                object.insert("current_balance".into(), money(*balance));
                object.insert("requested_amount".into(), money(*requested));
            }
            DomainError::ZeroBalance { balance } => {
                object.insert("current_balance".into(), money(*balance));
            }
            _ => {}
        }
    }

    (status, Json(body))
}

/// Decimal → JSON number at the HTTP edge.
pub fn money(amount: Decimal) -> Value {
    json!(amount.to_f64().unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_exceeds_balance_carries_details() {
        let err = DomainError::AmountExceedsBalance {
            balance: Decimal::from(50),
            requested: Decimal::from(200),
        };
        let (status, Json(body)) = error_response(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "amount_exceeds_balance");
        assert_eq!(body["current_balance"], 50.0);
        assert_eq!(body["requested_amount"], 200.0);
    }

    #[test]
    fn session_conflict_maps_to_409() {
        let (status, Json(body)) = error_response(&DomainError::SessionAlreadyActive);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "session_already_active");
    }

    #[test]
    fn ok_response_merges_data() {
        let Json(body) = ok_response(json!({"session_id": "abc"}));
        assert_eq!(body["success"], true);
        assert_eq!(body["session_id"], "abc");
    }
}
