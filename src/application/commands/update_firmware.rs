//! UpdateFirmware command

use chrono::{DateTime, Utc};
use log::info;

use super::{CommandError, SharedCommandSender};

pub async fn update_firmware(
    command_sender: &SharedCommandSender,
    station_id: &str,
    location: &str,
    retrieve_date: DateTime<Utc>,
) -> Result<(), CommandError> {
    info!(
        "[{}] UpdateFirmware - location: {}, retrieveDate: {}",
        station_id, location, retrieve_date
    );

    let payload = serde_json::json!({
        "location": location,
        "retrieveDate": retrieve_date.to_rfc3339(),
    });

    // UpdateFirmware.conf carries no payload
    command_sender
        .send_command(station_id, "UpdateFirmware", payload)
        .await?;

    Ok(())
}
