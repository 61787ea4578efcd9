//! Authorize handler
//!
//! The idTag is the client's phone; the local authorisation table is
//! seeded when a mobile session starts.

use chrono::Utc;
use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::{error, info};

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    let req: AuthorizeRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                error = %e,
                "Failed to parse Authorize"
            );
            return response(AuthorizationStatus::Invalid);
        }
    };

    let status = match handler
        .repos
        .ocpp_transactions()
        .find_authorization(&req.id_tag)
        .await
    {
        Ok(Some(auth)) => {
            let now = Utc::now();
            if auth.is_accepted_at(now) {
                AuthorizationStatus::Accepted
            } else if auth.is_expired_at(now) {
                AuthorizationStatus::Expired
            } else {
                AuthorizationStatus::Invalid
            }
        }
        Ok(None) => AuthorizationStatus::Invalid,
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                id_tag = req.id_tag.as_str(),
                error = %e,
                "Authorization lookup failed"
            );
            AuthorizationStatus::Invalid
        }
    };

    info!(
        station_id = handler.station_id.as_str(),
        id_tag = req.id_tag.as_str(),
        status = ?status,
        "Authorize"
    );

    response(status)
}

fn response(status: AuthorizationStatus) -> Value {
    let response = AuthorizeResponse {
        id_tag_info: IdTagInfo {
            status,
            expiry_date: None,
            parent_id_tag: None,
        },
    };
    serde_json::to_value(&response).unwrap_or_default()
}
