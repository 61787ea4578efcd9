//! Availability tracker
//!
//! Owns two views keyed by station id: the online-TTL keys in the bus
//! (expire without Heartbeat) and the persisted per-connector status.
//! Derives the location aggregate and fires error diagnostics when a
//! connector reports a fault.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::bus::{topics, SharedMessageBus};
use crate::application::commands::{get_configuration, get_diagnostics, SharedCommandSender};
use crate::domain::{
    derive_location_status, ConnectorStatus, DomainResult, LocationStatus, RepositoryProvider,
};

/// Cached location aggregates live this long unless invalidated earlier.
const LOCATION_CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(30);
/// Where stations upload diagnostics archives.
const DIAGNOSTICS_UPLOAD_LOCATION: &str = "ftp://diagnostics.evgrid.internal/upload";

pub struct AvailabilityTracker {
    repos: Arc<dyn RepositoryProvider>,
    bus: SharedMessageBus,
}

impl AvailabilityTracker {
    pub fn new(repos: Arc<dyn RepositoryProvider>, bus: SharedMessageBus) -> Self {
        Self { repos, bus }
    }

    // ── Online presence (TTL keys) ─────────────────────────

    pub fn mark_online(&self, station_id: &str) {
        self.bus.register_station_online(station_id);
    }

    pub fn refresh(&self, station_id: &str) {
        self.bus.refresh_station_ttl(station_id);
    }

    pub fn mark_offline(&self, station_id: &str) {
        self.bus.unregister_station(station_id);
    }

    pub fn is_online(&self, station_id: &str) -> bool {
        self.bus.is_station_online(station_id)
    }

    pub fn list_online(&self) -> Vec<String> {
        self.bus.list_online_stations()
    }

    // ── Connector status ───────────────────────────────────

    /// Persist a StatusNotification, invalidate the location aggregate
    /// and broadcast the update.
    pub async fn on_connector_status(
        &self,
        station_id: &str,
        connector_number: u32,
        status: ConnectorStatus,
        error_code: Option<&str>,
    ) -> DomainResult<()> {
        self.repos
            .stations()
            .update_connector_status(station_id, connector_number, status, error_code)
            .await?;

        self.invalidate_location_cache(station_id).await?;

        self.bus.publish(
            &topics::connector_updates(station_id, connector_number),
            serde_json::json!({
                "type": "connector_status",
                "station_id": station_id,
                "connector_id": connector_number,
                "status": status.as_str(),
                "error_code": error_code,
                "timestamp": Utc::now(),
            }),
        );
        self.bus.publish(
            &topics::station_updates(station_id),
            serde_json::json!({
                "type": "connector_status",
                "connector_id": connector_number,
                "status": status.as_str(),
            }),
        );

        Ok(())
    }

    /// Publish the station's online/offline transition to listeners.
    pub async fn broadcast_station_presence(&self, station_id: &str, online: bool) {
        let event_type = if online { "station_online" } else { "station_offline" };
        self.bus.publish(
            &topics::station_updates(station_id),
            serde_json::json!({ "type": event_type, "station_id": station_id }),
        );

        match self.repos.stations().find_by_id(station_id).await {
            Ok(Some(station)) => {
                if let Some(location_id) = station.location_id {
                    let _ = self.invalidate_location_cache(station_id).await;
                    self.bus.publish(
                        &topics::location_updates(location_id),
                        serde_json::json!({ "type": event_type, "station_id": station_id }),
                    );
                    self.bus.publish(
                        &topics::location_updates_all(),
                        serde_json::json!({
                            "type": event_type,
                            "station_id": station_id,
                            "location_id": location_id,
                        }),
                    );
                }
            }
            Ok(None) => {}
            Err(e) => warn!(station_id, error = %e, "Presence broadcast lookup failed"),
        }
    }

    // ── Location aggregate ─────────────────────────────────

    /// Derived view: offline if any station offline, else maintenance if
    /// any in maintenance, else occupied/available/partial from the
    /// connector mix. Cached for 30 s in the bus KV.
    pub async fn location_status(&self, location_id: Uuid) -> DomainResult<LocationStatus> {
        let cache_key = location_cache_key(location_id);
        if let Some(cached) = self.bus.get(&cache_key) {
            return Ok(parse_location_status(&cached));
        }

        let stations = self.repos.stations().list_by_location(location_id).await?;

        let mut available = 0;
        let mut occupied = 0;
        let mut offline = 0;
        let mut maintenance = 0;

        for station in &stations {
            if station.status == crate::domain::StationStatus::Maintenance {
                maintenance += 1;
                continue;
            }
            if !self.is_online(&station.id) {
                offline += 1;
                continue;
            }
            let connectors = self.repos.stations().list_connectors(&station.id).await?;
            let any_available = connectors
                .iter()
                .any(|c| c.status == ConnectorStatus::Available);
            if any_available {
                available += 1;
            } else {
                occupied += 1;
            }
        }

        let status = derive_location_status(available, occupied, offline, maintenance);
        self.bus
            .set_with_ttl(&cache_key, status.as_str(), LOCATION_CACHE_TTL);
        Ok(status)
    }

    async fn invalidate_location_cache(&self, station_id: &str) -> DomainResult<()> {
        if let Some(station) = self.repos.stations().find_by_id(station_id).await? {
            if let Some(location_id) = station.location_id {
                self.bus.delete(&location_cache_key(location_id));
                self.bus.publish(
                    &topics::location_stations(location_id),
                    serde_json::json!({
                        "type": "station_changed",
                        "station_id": station_id,
                    }),
                );
            }
        }
        Ok(())
    }

    // ── Error diagnostics ──────────────────────────────────

    /// On `errorCode != NoError`: pull the station's configuration and
    /// request a diagnostics upload, then tell the affected client.
    /// Everything here is best-effort.
    pub fn spawn_error_diagnostics(
        self: Arc<Self>,
        command_sender: SharedCommandSender,
        station_id: String,
        connector_number: u32,
        error_code: String,
    ) {
        let tracker = self;
        tokio::spawn(async move {
            warn!(
                station_id = station_id.as_str(),
                connector_number,
                error_code = error_code.as_str(),
                "🚨 Connector error, running diagnostics"
            );

            match get_configuration(&command_sender, &station_id, None).await {
                Ok(result) => info!(
                    station_id = station_id.as_str(),
                    keys = result.configuration_key.len(),
                    "Diagnostics: configuration dumped"
                ),
                Err(e) => warn!(
                    station_id = station_id.as_str(),
                    error = %e,
                    "Diagnostics: GetConfiguration failed"
                ),
            }

            if let Err(e) =
                get_diagnostics(&command_sender, &station_id, DIAGNOSTICS_UPLOAD_LOCATION).await
            {
                warn!(
                    station_id = station_id.as_str(),
                    error = %e,
                    "Diagnostics: GetDiagnostics failed"
                );
            }

            if let Err(e) = tracker
                .notify_client_of_error(&station_id, connector_number, &error_code)
                .await
            {
                error!(
                    station_id = station_id.as_str(),
                    error = %e,
                    "Diagnostics: client notification failed"
                );
            }
        });
    }

    async fn notify_client_of_error(
        &self,
        station_id: &str,
        connector_number: u32,
        error_code: &str,
    ) -> DomainResult<()> {
        let session = self
            .repos
            .sessions()
            .find_active_for_connector(station_id, connector_number)
            .await?;

        if let Some(session) = session {
            // The push transport is an external collaborator; it consumes
            // this topic.
            self.bus.publish(
                &topics::client_sessions(session.client_id),
                serde_json::json!({
                    "type": "charging_error",
                    "session_id": session.id,
                    "station_id": station_id,
                    "connector_id": connector_number,
                    "error_code": error_code,
                }),
            );
        }

        Ok(())
    }
}

fn location_cache_key(location_id: Uuid) -> String {
    format!("location:status:{location_id}")
}

fn parse_location_status(s: &str) -> LocationStatus {
    match s {
        "maintenance" => LocationStatus::Maintenance,
        "occupied" => LocationStatus::Occupied,
        "available" => LocationStatus::Available,
        "partial" => LocationStatus::Partial,
        _ => LocationStatus::Offline,
    }
}
