//! BootNotification handler
//!
//! Replies inside the OCPP timeout; everything slow (config seeding,
//! reconciliation of sessions the rebooted station forgot) runs as a
//! follow-up task.

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::{error, info};

use super::OcppHandler;

const HEARTBEAT_INTERVAL_SECS: u32 = 300;
const METER_VALUE_SAMPLE_INTERVAL_SECS: &str = "60";

pub async fn handle(handler: &OcppHandler, payload: &Value) -> Value {
    let req: BootNotificationRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                station_id = handler.station_id.as_str(),
                error = %e,
                "Failed to parse BootNotification"
            );
            // Still accept: a rebooting station must not be locked out by
            // a malformed vendor string.
            return accepted_response();
        }
    };

    info!(
        station_id = handler.station_id.as_str(),
        vendor = req.charge_point_vendor.as_str(),
        model = req.charge_point_model.as_str(),
        firmware = ?req.firmware_version,
        "BootNotification"
    );

    handler.tracker.mark_online(&handler.station_id);

    // Slow work escapes the reply path.
    let repos = handler.repos.clone();
    let engine = handler.engine.clone();
    let tracker = handler.tracker.clone();
    let in_flight = handler.in_flight.clone();
    let station_id = handler.station_id.clone();
    let firmware_version = req.firmware_version.clone();

    tokio::spawn(async move {
        if let Err(e) = repos
            .stations()
            .record_boot(&station_id, firmware_version.as_deref())
            .await
        {
            error!(station_id = station_id.as_str(), error = %e, "record_boot failed");
        }

        let heartbeat_interval = HEARTBEAT_INTERVAL_SECS.to_string();
        for (key, value) in [
            ("HeartbeatInterval", heartbeat_interval.as_str()),
            ("MeterValueSampleInterval", METER_VALUE_SAMPLE_INTERVAL_SECS),
        ] {
            if let Err(e) = repos
                .stations()
                .set_config_value(&station_id, key, value, true)
                .await
            {
                error!(
                    station_id = station_id.as_str(),
                    key,
                    error = %e,
                    "Config seeding failed"
                );
            }
        }

        // The station lost its state: orphaned reservations must be
        // refunded before the client notices.
        let _token = in_flight.enter();
        match engine.reconcile_station(&station_id).await {
            Ok((0, 0)) => {}
            Ok((failed, settled)) => info!(
                station_id = station_id.as_str(),
                failed, settled, "Boot reconciliation done"
            ),
            Err(e) => error!(
                station_id = station_id.as_str(),
                error = %e,
                "Boot reconciliation failed"
            ),
        }

        tracker.broadcast_station_presence(&station_id, true).await;
    });

    accepted_response()
}

fn accepted_response() -> Value {
    let response = BootNotificationResponse {
        current_time: Utc::now(),
        interval: HEARTBEAT_INTERVAL_SECS,
        status: RegistrationStatus::Accepted,
    };
    serde_json::to_value(&response).unwrap_or_default()
}
