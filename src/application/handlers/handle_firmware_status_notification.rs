//! FirmwareStatusNotification handler

use rust_ocpp::v1_6::messages::firmware_status_notification::{
    FirmwareStatusNotificationRequest, FirmwareStatusNotificationResponse,
};
use serde_json::Value;
use tracing::{error, info};

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    match serde_json::from_value::<FirmwareStatusNotificationRequest>(payload.clone()) {
        Ok(req) => info!(
            station_id = handler.station_id.as_str(),
            status = ?req.status,
            "FirmwareStatusNotification"
        ),
        Err(e) => error!(
            station_id = handler.station_id.as_str(),
            error = %e,
            "Failed to parse FirmwareStatusNotification"
        ),
    }

    serde_json::to_value(FirmwareStatusNotificationResponse {}).unwrap_or_default()
}
