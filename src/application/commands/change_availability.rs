//! ChangeAvailability command

use log::info;

use super::{CommandError, CommandStatus, SharedCommandSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Operative,
    Inoperative,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operative => "Operative",
            Self::Inoperative => "Inoperative",
        }
    }

    pub fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("inoperative") {
            Self::Inoperative
        } else {
            Self::Operative
        }
    }
}

pub async fn change_availability(
    command_sender: &SharedCommandSender,
    station_id: &str,
    connector_id: u32,
    availability: Availability,
) -> Result<CommandStatus, CommandError> {
    info!(
        "[{}] ChangeAvailability - connector: {}, type: {}",
        station_id,
        connector_id,
        availability.as_str()
    );

    let payload = serde_json::json!({
        "connectorId": connector_id,
        "type": availability.as_str(),
    });

    let result = command_sender
        .send_command(station_id, "ChangeAvailability", payload)
        .await?;

    Ok(CommandStatus::from_payload(&result))
}
