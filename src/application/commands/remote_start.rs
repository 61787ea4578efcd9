//! RemoteStartTransaction command

use log::info;

use super::{CommandError, CommandStatus, SharedCommandSender};

/// Ask a station to start charging on a connector. `id_tag` is the
/// client's normalised phone number.
pub async fn remote_start_transaction(
    command_sender: &SharedCommandSender,
    station_id: &str,
    connector_id: u32,
    id_tag: &str,
) -> Result<CommandStatus, CommandError> {
    info!(
        "[{}] RemoteStartTransaction - idTag: {}, connector: {}",
        station_id, id_tag, connector_id
    );

    let payload = serde_json::json!({
        "connectorId": connector_id,
        "idTag": id_tag,
    });

    let result = command_sender
        .send_command(station_id, "RemoteStartTransaction", payload)
        .await?;

    Ok(CommandStatus::from_payload(&result))
}
