//! OCPP 1.6 inbound message handling
//!
//! One `OcppHandler` per connected station. Calls dispatch to the
//! per-action handlers; CallResult/CallError frames are routed back to
//! the command sender that is awaiting them. A handler failure never
//! propagates to the station: parse errors and internal errors degrade
//! to a safe default CallResult so the charger is not confused.

mod handle_authorize;
mod handle_boot_notification;
mod handle_data_transfer;
mod handle_diagnostics_status_notification;
mod handle_firmware_status_notification;
mod handle_heartbeat;
mod handle_meter_values;
mod handle_start_transaction;
mod handle_status_notification;
mod handle_stop_transaction;

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::application::availability::AvailabilityTracker;
use crate::application::bus::SharedMessageBus;
use crate::application::charging::ChargingEngine;
use crate::application::commands::SharedCommandSender;
use crate::domain::RepositoryProvider;
use crate::support::ocpp_frame::OcppFrame;
use crate::support::shutdown::InFlightGuard;

/// Actions this central system handles when a station calls them.
const STATION_ACTIONS: &[&str] = &[
    "BootNotification",
    "Heartbeat",
    "StatusNotification",
    "Authorize",
    "StartTransaction",
    "StopTransaction",
    "MeterValues",
    "DataTransfer",
    "DiagnosticsStatusNotification",
    "FirmwareStatusNotification",
];

/// Central-system actions; a station echoing one inbound is acknowledged
/// with an empty payload.
const CENTRAL_ACTIONS: &[&str] = &[
    "GetConfiguration",
    "ChangeConfiguration",
    "Reset",
    "UnlockConnector",
    "ChangeAvailability",
    "ClearCache",
    "GetDiagnostics",
    "UpdateFirmware",
    "TriggerMessage",
    "SendLocalList",
    "GetLocalListVersion",
];

/// Per-station handler for OCPP 1.6 messages.
pub struct OcppHandler {
    pub station_id: String,
    pub repos: Arc<dyn RepositoryProvider>,
    pub engine: Arc<ChargingEngine>,
    pub tracker: Arc<AvailabilityTracker>,
    pub bus: SharedMessageBus,
    pub command_sender: SharedCommandSender,
    pub in_flight: InFlightGuard,
}

impl OcppHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        station_id: impl Into<String>,
        repos: Arc<dyn RepositoryProvider>,
        engine: Arc<ChargingEngine>,
        tracker: Arc<AvailabilityTracker>,
        bus: SharedMessageBus,
        command_sender: SharedCommandSender,
        in_flight: InFlightGuard,
    ) -> Self {
        Self {
            station_id: station_id.into(),
            repos,
            engine,
            tracker,
            bus,
            command_sender,
            in_flight,
        }
    }

    /// Handle one inbound text frame; returns the reply to send, if any.
    pub async fn handle(&self, text: &str) -> Option<String> {
        let frame = match OcppFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    station_id = self.station_id.as_str(),
                    error = %e,
                    "Strict parse failed, trying lenient parser"
                );
                match OcppFrame::parse_lenient(text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!(
                            station_id = self.station_id.as_str(),
                            error = %e,
                            raw = text,
                            "Failed to parse OCPP frame"
                        );
                        return None;
                    }
                }
            }
        };

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => Some(self.handle_call(unique_id, &action, payload).await),
            OcppFrame::CallResult { unique_id, payload } => {
                self.command_sender
                    .handle_response(&self.station_id, &unique_id, payload);
                None
            }
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                self.command_sender.handle_error(
                    &self.station_id,
                    &unique_id,
                    &error_code,
                    &error_description,
                );
                None
            }
        }
    }

    async fn handle_call(&self, unique_id: String, action: &str, payload: Value) -> String {
        metrics::counter!("ocpp_calls_total", "action" => action.to_string()).increment(1);

        if STATION_ACTIONS.contains(&action) {
            let result = self.dispatch(action, &payload).await;
            return OcppFrame::CallResult {
                unique_id,
                payload: result,
            }
            .serialize();
        }

        if CENTRAL_ACTIONS.contains(&action) {
            info!(
                station_id = self.station_id.as_str(),
                action, "Acknowledging inbound central-system action"
            );
            return OcppFrame::CallResult {
                unique_id,
                payload: serde_json::json!({}),
            }
            .serialize();
        }

        warn!(
            station_id = self.station_id.as_str(),
            action, "Unknown action"
        );
        OcppFrame::error_response(
            unique_id,
            "NotImplemented",
            format!("Action {action} is not implemented"),
        )
        .serialize()
    }

    async fn dispatch(&self, action: &str, payload: &Value) -> Value {
        match action {
            "BootNotification" => handle_boot_notification::handle(self, payload).await,
            "Heartbeat" => handle_heartbeat::handle(self, payload).await,
            "StatusNotification" => handle_status_notification::handle(self, payload).await,
            "Authorize" => handle_authorize::handle(self, payload).await,
            "StartTransaction" => handle_start_transaction::handle(self, payload).await,
            "StopTransaction" => handle_stop_transaction::handle(self, payload).await,
            "MeterValues" => handle_meter_values::handle(self, payload).await,
            "DataTransfer" => handle_data_transfer::handle(self, payload).await,
            "DiagnosticsStatusNotification" => {
                handle_diagnostics_status_notification::handle(self, payload).await
            }
            "FirmwareStatusNotification" => {
                handle_firmware_status_notification::handle(self, payload).await
            }
            // Unreachable: dispatch is guarded by STATION_ACTIONS
            _ => serde_json::json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tables_are_disjoint() {
        for action in STATION_ACTIONS {
            assert!(!CENTRAL_ACTIONS.contains(action), "{action} in both tables");
        }
    }
}
