//! ClearCache command

use log::info;

use super::{CommandError, CommandStatus, SharedCommandSender};

pub async fn clear_cache(
    command_sender: &SharedCommandSender,
    station_id: &str,
) -> Result<CommandStatus, CommandError> {
    info!("[{}] ClearCache", station_id);

    let result = command_sender
        .send_command(station_id, "ClearCache", serde_json::json!({}))
        .await?;

    Ok(CommandStatus::from_payload(&result))
}
