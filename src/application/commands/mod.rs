//! Command sender for Central System → Station communication
//!
//! One outbound OCPP Call at a time per socket: a per-station guard keeps
//! the next Call queued until the previous CallResult arrived or timed
//! out. Replies are correlated by the OCPP message id.

pub mod change_availability;
pub mod change_configuration;
pub mod clear_cache;
pub mod dispatcher;
pub mod get_configuration;
pub mod get_diagnostics;
pub mod remote_start;
pub mod remote_stop;
pub mod reset;
pub mod trigger_message;
pub mod unlock_connector;
pub mod update_firmware;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::session::SharedSessionRegistry;
use crate::support::ocpp_frame::OcppFrame;

pub use change_availability::{change_availability, Availability};
pub use change_configuration::change_configuration;
pub use clear_cache::clear_cache;
pub use dispatcher::run_command_loop;
pub use get_configuration::get_configuration;
pub use get_diagnostics::get_diagnostics;
pub use remote_start::remote_start_transaction;
pub use remote_stop::remote_stop_transaction;
pub use reset::{reset, ResetKind};
pub use trigger_message::trigger_message;
pub use unlock_connector::unlock_connector;
pub use update_firmware::update_firmware;

/// Outbound Call deadline (OCPP nominal).
const RESPONSE_TIMEOUT_SECS: u64 = 30;

struct PendingRequest {
    action_name: String,
    response_sender: oneshot::Sender<Result<Value, CommandError>>,
}

#[derive(Debug, Clone)]
pub enum CommandError {
    NotConnected(String),
    SendFailed(String),
    Timeout,
    InvalidResponse(String),
    CallError { code: String, description: String },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected(id) => write!(f, "Station not connected: {}", id),
            Self::SendFailed(msg) => write!(f, "Failed to send: {}", msg),
            Self::Timeout => write!(f, "Response timeout"),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            Self::CallError { code, description } => {
                write!(f, "CallError {}: {}", code, description)
            }
        }
    }
}

impl std::error::Error for CommandError {}

/// Outcome of a generic status-bearing command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Accepted,
    Rejected,
    Scheduled,
    NotSupported,
    Other(String),
}

impl CommandStatus {
    pub fn from_payload(payload: &Value) -> Self {
        match payload.get("status").and_then(Value::as_str) {
            Some("Accepted") => Self::Accepted,
            Some("Rejected") => Self::Rejected,
            Some("Scheduled") => Self::Scheduled,
            Some("NotSupported") => Self::NotSupported,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other(String::new()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted | Self::Scheduled)
    }
}

/// A command travelling over the bus on `cmd:<station_id>`.
///
/// Serialized with the OCPP action name as the `action` tag, matching
/// what HTTP workers publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum StationCommand {
    RemoteStartTransaction {
        connector_id: u32,
        id_tag: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit_value: Option<f64>,
    },
    RemoteStopTransaction {
        transaction_id: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Reset {
        #[serde(rename = "type")]
        reset_type: String,
    },
    UnlockConnector {
        connector_id: u32,
    },
    ChangeAvailability {
        connector_id: u32,
        #[serde(rename = "type")]
        availability_type: String,
    },
    ChangeConfiguration {
        key: String,
        value: String,
    },
    GetConfiguration {
        #[serde(skip_serializing_if = "Option::is_none")]
        keys: Option<Vec<String>>,
    },
    ClearCache,
    TriggerMessage {
        requested_message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        connector_id: Option<u32>,
    },
    GetDiagnostics {
        location: String,
    },
    UpdateFirmware {
        location: String,
        retrieve_date: DateTime<Utc>,
    },
}

/// Sends OCPP commands to stations through the session registry.
pub struct CommandSender {
    session_registry: SharedSessionRegistry,
    pending_requests: DashMap<(String, String), PendingRequest>,
    /// One outbound Call in flight per station.
    call_guards: DashMap<String, Arc<Mutex<()>>>,
    message_counter: AtomicU64,
}

impl CommandSender {
    pub fn new(session_registry: SharedSessionRegistry) -> Self {
        Self {
            session_registry,
            pending_requests: DashMap::new(),
            call_guards: DashMap::new(),
            message_counter: AtomicU64::new(1),
        }
    }

    fn generate_message_id(&self) -> String {
        let id = self.message_counter.fetch_add(1, Ordering::SeqCst);
        format!("CS-{}", id)
    }

    fn call_guard(&self, station_id: &str) -> Arc<Mutex<()>> {
        self.call_guards
            .entry(station_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Send an OCPP command and wait for the CallResult payload.
    ///
    /// `action` is the OCPP action name (e.g. "RemoteStopTransaction").
    pub async fn send_command(
        &self,
        station_id: &str,
        action: &str,
        payload: Value,
    ) -> Result<Value, CommandError> {
        let guard = self.call_guard(station_id);
        let _serialised = guard.lock().await;

        let message_id = self.generate_message_id();

        let frame = OcppFrame::Call {
            unique_id: message_id.clone(),
            action: action.to_string(),
            payload,
        };
        let json = frame.serialize();

        let (tx, rx) = oneshot::channel();

        let key = (station_id.to_string(), message_id.clone());
        self.pending_requests.insert(
            key.clone(),
            PendingRequest {
                action_name: action.to_string(),
                response_sender: tx,
            },
        );

        info!(
            station_id,
            action,
            message_id = message_id.as_str(),
            "Sending command"
        );

        if let Err(e) = self.session_registry.send_to(station_id, json) {
            self.pending_requests.remove(&key);
            return Err(CommandError::NotConnected(e));
        }

        match timeout(Duration::from_secs(RESPONSE_TIMEOUT_SECS), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.pending_requests.remove(&key);
                Err(CommandError::InvalidResponse("Channel closed".to_string()))
            }
            Err(_) => {
                self.pending_requests.remove(&key);
                warn!(
                    station_id,
                    action,
                    message_id = message_id.as_str(),
                    "Command timed out"
                );
                Err(CommandError::Timeout)
            }
        }
    }

    /// Route an inbound CallResult to the waiting command.
    pub fn handle_response(&self, station_id: &str, message_id: &str, payload: Value) {
        let key = (station_id.to_string(), message_id.to_string());
        if let Some((_, pending)) = self.pending_requests.remove(&key) {
            info!(
                station_id,
                action = pending.action_name.as_str(),
                message_id,
                "Received response"
            );
            let _ = pending.response_sender.send(Ok(payload));
        } else {
            warn!(station_id, message_id, "Response for unknown request");
        }
    }

    /// Route an inbound CallError to the waiting command.
    pub fn handle_error(
        &self,
        station_id: &str,
        message_id: &str,
        error_code: &str,
        error_description: &str,
    ) {
        let key = (station_id.to_string(), message_id.to_string());
        if let Some((_, pending)) = self.pending_requests.remove(&key) {
            warn!(
                station_id,
                action = pending.action_name.as_str(),
                message_id,
                error_code,
                error_description,
                "Received error"
            );
            let _ = pending.response_sender.send(Err(CommandError::CallError {
                code: error_code.to_string(),
                description: error_description.to_string(),
            }));
        }
    }

    /// Drop pending state for a disconnected station.
    pub fn cleanup_station(&self, station_id: &str) {
        self.pending_requests.retain(|key, _| key.0 != station_id);
        self.call_guards.remove(station_id);
    }
}

pub type SharedCommandSender = Arc<CommandSender>;

pub fn create_command_sender(session_registry: SharedSessionRegistry) -> SharedCommandSender {
    Arc::new(CommandSender::new(session_registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_command_wire_format() {
        let cmd = StationCommand::RemoteStartTransaction {
            connector_id: 1,
            id_tag: "996555123456".to_string(),
            session_id: None,
            limit_type: Some("energy".to_string()),
            limit_value: Some(10.0),
        };
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["action"], "RemoteStartTransaction");
        assert_eq!(value["connector_id"], 1);
        assert_eq!(value["id_tag"], "996555123456");

        let parsed: StationCommand = serde_json::from_value(value).unwrap();
        assert!(matches!(
            parsed,
            StationCommand::RemoteStartTransaction { connector_id: 1, .. }
        ));
    }

    #[test]
    fn command_status_from_payload() {
        let accepted = serde_json::json!({"status": "Accepted"});
        assert!(CommandStatus::from_payload(&accepted).is_accepted());

        let rejected = serde_json::json!({"status": "Rejected"});
        assert_eq!(CommandStatus::from_payload(&rejected), CommandStatus::Rejected);

        let empty = serde_json::json!({});
        assert!(!CommandStatus::from_payload(&empty).is_accepted());
    }

    #[tokio::test]
    async fn command_fails_fast_when_not_connected() {
        let registry = crate::application::session::SessionRegistry::shared();
        let sender = CommandSender::new(registry);
        let result = sender
            .send_command("ST-GONE", "ClearCache", serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(CommandError::NotConnected(_))));
    }

    #[tokio::test]
    async fn response_correlation_by_message_id() {
        let registry = crate::application::session::SessionRegistry::shared();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        registry.register("ST-1", tx);

        let sender = Arc::new(CommandSender::new(registry));
        let sender_clone = sender.clone();

        let task = tokio::spawn(async move {
            sender_clone
                .send_command("ST-1", "ClearCache", serde_json::json!({}))
                .await
        });

        // Pull the outbound frame, extract the message id and reply.
        let raw = rx.recv().await.unwrap();
        let frame = crate::support::ocpp_frame::OcppFrame::parse(&raw).unwrap();
        let message_id = frame.unique_id().to_string();
        sender.handle_response("ST-1", &message_id, serde_json::json!({"status": "Accepted"}));

        let payload = task.await.unwrap().unwrap();
        assert_eq!(payload["status"], "Accepted");
    }
}
