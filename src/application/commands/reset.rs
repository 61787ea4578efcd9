//! Reset command

use log::info;

use super::{CommandError, CommandStatus, SharedCommandSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    Soft,
    Hard,
}

impl ResetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "Soft",
            Self::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("hard") {
            Self::Hard
        } else {
            Self::Soft
        }
    }
}

pub async fn reset(
    command_sender: &SharedCommandSender,
    station_id: &str,
    kind: ResetKind,
) -> Result<CommandStatus, CommandError> {
    info!("[{}] Reset - type: {}", station_id, kind.as_str());

    let payload = serde_json::json!({ "type": kind.as_str() });

    let result = command_sender
        .send_command(station_id, "Reset", payload)
        .await?;

    Ok(CommandStatus::from_payload(&result))
}
