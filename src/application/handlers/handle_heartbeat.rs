//! Heartbeat handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::Value;
use tracing::{debug, error};

use super::OcppHandler;

pub async fn handle(handler: &OcppHandler, _payload: &Value) -> Value {
    debug!(station_id = handler.station_id.as_str(), "Heartbeat");

    handler.tracker.refresh(&handler.station_id);

    if let Err(e) = handler
        .repos
        .stations()
        .record_heartbeat(&handler.station_id, Utc::now())
        .await
    {
        error!(
            station_id = handler.station_id.as_str(),
            error = %e,
            "Heartbeat persistence failed"
        );
    }

    let response = HeartbeatResponse {
        current_time: Utc::now(),
    };

    serde_json::to_value(&response).unwrap_or_default()
}
