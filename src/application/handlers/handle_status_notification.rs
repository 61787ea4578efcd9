//! StatusNotification handler

use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use rust_ocpp::v1_6::types::{ChargePointErrorCode, ChargePointStatus};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::domain::ConnectorStatus;

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    let req: StatusNotificationRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                error = %e,
                "Failed to parse StatusNotification"
            );
            return empty_response();
        }
    };

    info!(
        station_id = handler.station_id.as_str(),
        connector_id = req.connector_id,
        status = ?req.status,
        error_code = ?req.error_code,
        "StatusNotification"
    );

    let status = map_status(&req.status);
    let error_code = format!("{:?}", req.error_code);
    let has_error = !matches!(req.error_code, ChargePointErrorCode::NoError);

    if has_error {
        warn!(
            station_id = handler.station_id.as_str(),
            connector_id = req.connector_id,
            error_code = error_code.as_str(),
            info = ?req.info,
            vendor_error_code = ?req.vendor_error_code,
            "🚨 Connector reported an error"
        );
    }

    // connectorId 0 addresses the whole charge point; there is no
    // connector row to update, but listeners still get the event.
    if let Err(e) = handler
        .tracker
        .on_connector_status(
            &handler.station_id,
            req.connector_id,
            status,
            Some(error_code.as_str()),
        )
        .await
    {
        error!(
            station_id = handler.station_id.as_str(),
            connector_id = req.connector_id,
            error = %e,
            "Connector status persistence failed"
        );
    }

    if has_error {
        handler.tracker.clone().spawn_error_diagnostics(
            handler.command_sender.clone(),
            handler.station_id.clone(),
            req.connector_id,
            error_code,
        );
    }

    empty_response()
}

/// OCPP connector statuses collapse onto the internal four-state set.
fn map_status(status: &ChargePointStatus) -> ConnectorStatus {
    match status {
        ChargePointStatus::Available => ConnectorStatus::Available,
        ChargePointStatus::Preparing
        | ChargePointStatus::Charging
        | ChargePointStatus::SuspendedEV
        | ChargePointStatus::SuspendedEVSE
        | ChargePointStatus::Finishing
        | ChargePointStatus::Reserved => ConnectorStatus::Occupied,
        ChargePointStatus::Unavailable => ConnectorStatus::Unavailable,
        ChargePointStatus::Faulted => ConnectorStatus::Faulted,
    }
}

fn empty_response() -> Value {
    serde_json::to_value(StatusNotificationResponse {}).unwrap_or_default()
}
