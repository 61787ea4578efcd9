//! UnlockConnector command

use log::info;

use super::{CommandError, CommandStatus, SharedCommandSender};

pub async fn unlock_connector(
    command_sender: &SharedCommandSender,
    station_id: &str,
    connector_id: u32,
) -> Result<CommandStatus, CommandError> {
    info!("[{}] UnlockConnector - connector: {}", station_id, connector_id);

    let payload = serde_json::json!({ "connectorId": connector_id });

    let result = command_sender
        .send_command(station_id, "UnlockConnector", payload)
        .await?;

    Ok(CommandStatus::from_payload(&result))
}
