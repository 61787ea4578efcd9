//! TriggerMessage command

use log::info;

use super::{CommandError, CommandStatus, SharedCommandSender};

pub async fn trigger_message(
    command_sender: &SharedCommandSender,
    station_id: &str,
    requested_message: &str,
    connector_id: Option<u32>,
) -> Result<CommandStatus, CommandError> {
    info!(
        "[{}] TriggerMessage - {} (connector: {:?})",
        station_id, requested_message, connector_id
    );

    let mut payload = serde_json::json!({ "requestedMessage": requested_message });
    if let Some(id) = connector_id {
        payload["connectorId"] = serde_json::json!(id);
    }

    let result = command_sender
        .send_command(station_id, "TriggerMessage", payload)
        .await?;

    Ok(CommandStatus::from_payload(&result))
}
