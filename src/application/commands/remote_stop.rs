//! RemoteStopTransaction command

use log::info;

use super::{CommandError, CommandStatus, SharedCommandSender};

/// Ask a station to stop the transaction it reported at start.
pub async fn remote_stop_transaction(
    command_sender: &SharedCommandSender,
    station_id: &str,
    transaction_id: i32,
) -> Result<CommandStatus, CommandError> {
    info!(
        "[{}] RemoteStopTransaction - transactionId: {}",
        station_id, transaction_id
    );

    let payload = serde_json::json!({
        "transactionId": transaction_id,
    });

    let result = command_sender
        .send_command(station_id, "RemoteStopTransaction", payload)
        .await?;

    Ok(CommandStatus::from_payload(&result))
}
