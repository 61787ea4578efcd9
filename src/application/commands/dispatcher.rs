//! Bus → OCPP command dispatcher
//!
//! Each station actor runs exactly one copy of this loop: it is the sole
//! consumer of its `cmd:<station_id>` topic and translates bus commands
//! into outbound OCPP Calls on the socket it owns. The task is aborted by
//! the actor on disconnect.

use tracing::{error, info, warn};

use crate::application::bus::{topics, SharedMessageBus};

use super::{
    change_availability, change_configuration, clear_cache, get_configuration, get_diagnostics,
    remote_start_transaction, remote_stop_transaction, reset, trigger_message, unlock_connector,
    update_firmware, Availability, ResetKind, SharedCommandSender, StationCommand,
};

pub async fn run_command_loop(
    station_id: String,
    bus: SharedMessageBus,
    command_sender: SharedCommandSender,
) {
    let mut subscriber = bus.subscribe(&topics::cmd(&station_id));
    bus.mark_subscription_ready(&station_id);
    info!(station_id = station_id.as_str(), "Command loop subscribed");

    while let Some(payload) = subscriber.recv().await {
        let command: StationCommand = match serde_json::from_value(payload.clone()) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!(
                    station_id = station_id.as_str(),
                    error = %e,
                    payload = %payload,
                    "Dropping malformed bus command"
                );
                continue;
            }
        };

        if let Err(e) = execute(&station_id, &command_sender, command).await {
            error!(
                station_id = station_id.as_str(),
                error = %e,
                "Command execution failed"
            );
        }
    }

    info!(station_id = station_id.as_str(), "Command loop finished");
}

async fn execute(
    station_id: &str,
    sender: &SharedCommandSender,
    command: StationCommand,
) -> Result<(), super::CommandError> {
    match command {
        StationCommand::RemoteStartTransaction {
            connector_id,
            id_tag,
            session_id,
            ..
        } => {
            // Limits travel on the session row; the station only needs
            // the connector and the idTag.
            let status = remote_start_transaction(sender, station_id, connector_id, &id_tag).await?;
            info!(
                station_id,
                connector_id,
                ?session_id,
                status = ?status,
                "RemoteStartTransaction answered"
            );
        }
        StationCommand::RemoteStopTransaction {
            transaction_id,
            reason,
        } => {
            let status = remote_stop_transaction(sender, station_id, transaction_id).await?;
            info!(
                station_id,
                transaction_id,
                ?reason,
                status = ?status,
                "RemoteStopTransaction answered"
            );
        }
        StationCommand::Reset { reset_type } => {
            reset(sender, station_id, ResetKind::from_str(&reset_type)).await?;
        }
        StationCommand::UnlockConnector { connector_id } => {
            unlock_connector(sender, station_id, connector_id).await?;
        }
        StationCommand::ChangeAvailability {
            connector_id,
            availability_type,
        } => {
            change_availability(
                sender,
                station_id,
                connector_id,
                Availability::from_str(&availability_type),
            )
            .await?;
        }
        StationCommand::ChangeConfiguration { key, value } => {
            change_configuration(sender, station_id, &key, &value).await?;
        }
        StationCommand::GetConfiguration { keys } => {
            let result = get_configuration(sender, station_id, keys.as_deref()).await?;
            info!(
                station_id,
                keys = result.configuration_key.len(),
                unknown = result.unknown_key.len(),
                "GetConfiguration answered"
            );
        }
        StationCommand::ClearCache => {
            clear_cache(sender, station_id).await?;
        }
        StationCommand::TriggerMessage {
            requested_message,
            connector_id,
        } => {
            trigger_message(sender, station_id, &requested_message, connector_id).await?;
        }
        StationCommand::GetDiagnostics { location } => {
            get_diagnostics(sender, station_id, &location).await?;
        }
        StationCommand::UpdateFirmware {
            location,
            retrieve_date,
        } => {
            update_firmware(sender, station_id, &location, retrieve_date).await?;
        }
    }

    Ok(())
}
