//! Session registry — active station WebSocket connections
//!
//! One entry per connected station. The registry hands messages to the
//! writer task of the owning actor; it never touches the socket itself.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::connection::{Connection, EvictedConnection};

/// Outcome of a registration attempt
pub enum RegisterResult {
    /// Fresh connection — no previous session existed
    New,
    /// Replaced an existing session (old sender was dropped)
    Evicted(EvictedConnection),
}

/// Thread-safe registry of active station sessions
pub struct SessionRegistry {
    sessions: DashMap<String, Connection>,
}

/// Shared, reference-counted session registry
pub type SharedSessionRegistry = Arc<SessionRegistry>;

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn shared() -> SharedSessionRegistry {
        Arc::new(Self::new())
    }

    /// Register a station connection.
    ///
    /// If a session already exists for this station the old sender channel
    /// is dropped, which stops the old writer task; the caller gets
    /// `Evicted` so it can publish a disconnect event.
    pub fn register(
        &self,
        station_id: &str,
        sender: mpsc::UnboundedSender<String>,
    ) -> RegisterResult {
        let evicted = self.sessions.remove(station_id).map(|(_, old)| {
            warn!(
                station_id,
                connected_since = %old.connected_at,
                last_activity = %old.last_activity,
                "Evicting stale session — new connection replaces old"
            );
            EvictedConnection {
                station_id: old.station_id,
                connected_at: old.connected_at,
                last_activity: old.last_activity,
            }
        });

        info!(station_id, "Registering station session");
        self.sessions
            .insert(station_id.to_string(), Connection::new(station_id, sender));

        metrics::gauge!("ocpp_connected_stations").set(self.sessions.len() as f64);

        match evicted {
            Some(ev) => RegisterResult::Evicted(ev),
            None => RegisterResult::New,
        }
    }

    pub fn unregister(&self, station_id: &str) {
        if self.sessions.remove(station_id).is_some() {
            metrics::gauge!("ocpp_connected_stations").set(self.sessions.len() as f64);
            info!(station_id, "Unregistered station session");
        }
    }

    /// Send a raw frame to a station's writer task.
    pub fn send_to(&self, station_id: &str, message: String) -> Result<(), String> {
        match self.sessions.get(station_id) {
            Some(conn) => conn.send(message),
            None => Err(format!("Station {} not connected", station_id)),
        }
    }

    pub fn touch(&self, station_id: &str) {
        if let Some(mut conn) = self.sessions.get_mut(station_id) {
            conn.touch();
        }
    }

    pub fn is_connected(&self, station_id: &str) -> bool {
        self.sessions.contains_key(station_id)
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_send_unregister() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(matches!(registry.register("ST-1", tx), RegisterResult::New));
        assert!(registry.is_connected("ST-1"));

        registry.send_to("ST-1", "[2,\"a\",\"Heartbeat\",{}]".to_string()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "[2,\"a\",\"Heartbeat\",{}]");

        registry.unregister("ST-1");
        assert!(!registry.is_connected("ST-1"));
        assert!(registry.send_to("ST-1", "x".to_string()).is_err());
    }

    #[tokio::test]
    async fn reconnect_evicts_old_sender() {
        let registry = SessionRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        registry.register("ST-1", tx1);
        assert!(matches!(
            registry.register("ST-1", tx2),
            RegisterResult::Evicted(_)
        ));

        // Old receiver sees the channel close; new one gets traffic.
        assert!(rx1.recv().await.is_none());
        registry.send_to("ST-1", "ping".to_string()).unwrap();
        assert_eq!(rx2.recv().await.unwrap(), "ping");
        assert_eq!(registry.count(), 1);
    }
}
