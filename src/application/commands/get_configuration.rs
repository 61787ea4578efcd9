//! GetConfiguration command

use log::info;
use serde::Deserialize;

use super::{CommandError, SharedCommandSender};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationKey {
    pub key: String,
    pub readonly: bool,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationResult {
    #[serde(default)]
    pub configuration_key: Vec<ConfigurationKey>,
    #[serde(default)]
    pub unknown_key: Vec<String>,
}

pub async fn get_configuration(
    command_sender: &SharedCommandSender,
    station_id: &str,
    keys: Option<&[String]>,
) -> Result<ConfigurationResult, CommandError> {
    info!("[{}] GetConfiguration - keys: {:?}", station_id, keys);

    let payload = match keys {
        Some(keys) if !keys.is_empty() => serde_json::json!({ "key": keys }),
        _ => serde_json::json!({}),
    };

    let result = command_sender
        .send_command(station_id, "GetConfiguration", payload)
        .await?;

    serde_json::from_value(result).map_err(|e| CommandError::InvalidResponse(e.to_string()))
}
