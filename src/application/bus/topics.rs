//! Topic name helpers. One place to spell the namespaces.

use uuid::Uuid;

/// Backend → station commands; the station actor is the only consumer.
pub fn cmd(station_id: &str) -> String {
    format!("cmd:{station_id}")
}

pub fn location_updates_all() -> String {
    "location_updates:all".to_string()
}

pub fn location_updates(location_id: Uuid) -> String {
    format!("location_updates:{location_id}")
}

pub fn location_stations(location_id: Uuid) -> String {
    format!("location_stations:{location_id}")
}

pub fn station_updates(station_id: &str) -> String {
    format!("station_updates:{station_id}")
}

pub fn connector_updates(station_id: &str, connector_number: u32) -> String {
    format!("connector_updates:{station_id}:{connector_number}")
}

pub fn client_sessions(client_id: Uuid) -> String {
    format!("client_sessions:{client_id}")
}

pub fn station_sessions(station_id: &str) -> String {
    format!("station_sessions:{station_id}")
}
