//! DiagnosticsStatusNotification handler

use rust_ocpp::v1_6::messages::diagnostics_status_notification::{
    DiagnosticsStatusNotificationRequest, DiagnosticsStatusNotificationResponse,
};
use serde_json::Value;
use tracing::{error, info};

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    match serde_json::from_value::<DiagnosticsStatusNotificationRequest>(payload.clone()) {
        Ok(req) => info!(
            station_id = handler.station_id.as_str(),
            status = ?req.status,
            "DiagnosticsStatusNotification"
        ),
        Err(e) => error!(
            station_id = handler.station_id.as_str(),
            error = %e,
            "Failed to parse DiagnosticsStatusNotification"
        ),
    }

    serde_json::to_value(DiagnosticsStatusNotificationResponse {}).unwrap_or_default()
}
