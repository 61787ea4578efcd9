//! One registered station connection.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Live connection state for one station socket.
pub struct Connection {
    pub station_id: String,
    /// Writer-task channel; dropping it stops the old send task.
    sender: mpsc::UnboundedSender<String>,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Connection {
    pub fn new(station_id: &str, sender: mpsc::UnboundedSender<String>) -> Self {
        let now = Utc::now();
        Self {
            station_id: station_id.to_string(),
            sender,
            connected_at: now,
            last_activity: now,
        }
    }

    pub fn send(&self, message: String) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|e| format!("Send channel closed: {}", e))
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// Snapshot of a session that was replaced by a reconnect.
pub struct EvictedConnection {
    pub station_id: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}
