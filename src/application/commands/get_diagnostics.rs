//! GetDiagnostics command

use log::info;

use super::{CommandError, SharedCommandSender};

/// Ask the station to upload diagnostics to `location`. Returns the file
/// name the station intends to use, if it reports one.
pub async fn get_diagnostics(
    command_sender: &SharedCommandSender,
    station_id: &str,
    location: &str,
) -> Result<Option<String>, CommandError> {
    info!("[{}] GetDiagnostics - location: {}", station_id, location);

    let payload = serde_json::json!({ "location": location });

    let result = command_sender
        .send_command(station_id, "GetDiagnostics", payload)
        .await?;

    Ok(result
        .get("fileName")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string))
}
