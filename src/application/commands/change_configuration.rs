//! ChangeConfiguration command

use log::info;

use super::{CommandError, CommandStatus, SharedCommandSender};

pub async fn change_configuration(
    command_sender: &SharedCommandSender,
    station_id: &str,
    key: &str,
    value: &str,
) -> Result<CommandStatus, CommandError> {
    info!("[{}] ChangeConfiguration - {}={}", station_id, key, value);

    let payload = serde_json::json!({ "key": key, "value": value });

    let result = command_sender
        .send_command(station_id, "ChangeConfiguration", payload)
        .await?;

    Ok(CommandStatus::from_payload(&result))
}
