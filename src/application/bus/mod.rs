//! Command / event bus
//!
//! Topic-keyed pub/sub plus a TTL key/value store, decoupling HTTP
//! workers from the single actor that owns a station's socket. The bus
//! is in-process and ephemeral: after a restart the database has enough
//! state to reconcile (BootNotification reconciliation).
//!
//! Topic namespaces:
//! - `cmd:<station_id>` — backend → station, consumed by the actor only
//! - `location_updates:*`, `station_updates:<id>`,
//!   `connector_updates:<station>:<cid>`, `client_sessions:<client>`,
//!   `station_sessions:<station>` — fan-out event streams
//!
//! Messages on one topic are delivered in publish order to each
//! subscriber; there is no cross-topic ordering.

pub mod topics;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Online-TTL for a station key; refreshed on every Heartbeat.
pub const STATION_TTL: Duration = Duration::from_secs(300);
/// How long a publisher waits for the actor's subscription on first connect.
pub const SUBSCRIPTION_TIMEOUT: Duration = Duration::from_secs(5);
/// Pending-session index TTL; outlives the station authorize window.
pub const PENDING_SESSION_TTL: Duration = Duration::from_secs(600);

const TOPIC_CAPACITY: usize = 256;
const STATION_KEY_PREFIX: &str = "ocpp:station:";

/// In-process topic bus + TTL store.
pub struct MessageBus {
    topics: DashMap<String, broadcast::Sender<Value>>,
    kv: DashMap<String, TtlEntry>,
    subscription_ready: DashMap<String, watch::Sender<bool>>,
}

struct TtlEntry {
    value: String,
    expires_at: Instant,
}

pub type SharedMessageBus = Arc<MessageBus>;

pub fn create_message_bus() -> SharedMessageBus {
    Arc::new(MessageBus::new())
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
            kv: DashMap::new(),
            subscription_ready: DashMap::new(),
        }
    }

    // ── Pub/Sub ────────────────────────────────────────────

    /// Fire-and-forget publish; returns the number of live subscribers.
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        metrics::counter!("bus_messages_total").increment(1);
        let sender = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        match sender.send(payload) {
            Ok(count) => {
                debug!(topic, subscribers = count, "Message published");
                count
            }
            Err(_) => {
                debug!(topic, "Message published (no subscribers)");
                0
            }
        }
    }

    /// Blocking-iterator style subscription; yields until the bus drops
    /// the topic or the subscriber is cancelled.
    pub fn subscribe(&self, topic: &str) -> TopicSubscriber {
        let sender = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        TopicSubscriber {
            topic: topic.to_string(),
            receiver: sender.subscribe(),
        }
    }

    // ── Subscription-ready signalling ──────────────────────
    //
    // An HTTP worker publishing a command right after StartCharging must
    // not race the actor's subscribe on first connect.

    pub fn mark_subscription_ready(&self, station_id: &str) {
        let sender = self
            .subscription_ready
            .entry(station_id.to_string())
            .or_insert_with(|| watch::channel(false).0);
        let _ = sender.send(true);
    }

    pub fn clear_subscription(&self, station_id: &str) {
        self.subscription_ready.remove(station_id);
    }

    pub fn is_subscription_ready(&self, station_id: &str) -> bool {
        self.subscription_ready
            .get(station_id)
            .map(|s| *s.borrow())
            .unwrap_or(false)
    }

    /// Wait until the station actor has completed its `cmd:` subscribe.
    /// Returns `false` on timeout — the publisher proceeds anyway (the
    /// station is presumably offline or about to be).
    pub async fn wait_for_subscription(&self, station_id: &str, timeout: Duration) -> bool {
        let mut receiver = {
            let sender = self
                .subscription_ready
                .entry(station_id.to_string())
                .or_insert_with(|| watch::channel(false).0);
            sender.subscribe()
        };

        if *receiver.borrow() {
            return true;
        }

        let result = match tokio::time::timeout(timeout, receiver.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => true,
            _ => {
                warn!(station_id, "Subscription-ready wait timed out");
                false
            }
        };
        result
    }

    // ── TTL key/value store ────────────────────────────────
    //
    // Synchronous surface so OCPP reply-path handlers never block on an
    // async boundary.

    pub fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) {
        self.kv.insert(
            key.to_string(),
            TtlEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let expired = match self.kv.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.kv.remove(key);
        }
        None
    }

    pub fn delete(&self, key: &str) -> Option<String> {
        self.kv.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drop expired entries; called periodically by the cleanup task.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.kv.len();
        self.kv.retain(|_, entry| entry.expires_at > now);
        before - self.kv.len()
    }

    // ── Station online index ───────────────────────────────

    pub fn register_station_online(&self, station_id: &str) {
        self.set_with_ttl(&station_key(station_id), "online", STATION_TTL);
    }

    pub fn refresh_station_ttl(&self, station_id: &str) {
        // A heartbeat from an unregistered station re-registers it.
        self.register_station_online(station_id);
    }

    pub fn unregister_station(&self, station_id: &str) {
        self.delete(&station_key(station_id));
        self.clear_subscription(station_id);
    }

    pub fn is_station_online(&self, station_id: &str) -> bool {
        self.get(&station_key(station_id)).is_some()
    }

    pub fn list_online_stations(&self) -> Vec<String> {
        let now = Instant::now();
        self.kv
            .iter()
            .filter(|entry| entry.key().starts_with(STATION_KEY_PREFIX))
            .filter(|entry| entry.value().expires_at > now)
            .map(|entry| entry.key()[STATION_KEY_PREFIX.len()..].to_string())
            .collect()
    }

    // ── Pending-session index ──────────────────────────────
    //
    // `pending:<station>:<connector>` → charging_session_id, written by
    // StartCharging and popped by the StartTransaction binding.

    pub fn set_pending_session(&self, station_id: &str, connector_number: u32, session_id: &str) {
        self.set_with_ttl(
            &pending_key(station_id, connector_number),
            session_id,
            PENDING_SESSION_TTL,
        );
    }

    pub fn pop_pending_session(&self, station_id: &str, connector_number: u32) -> Option<String> {
        let key = pending_key(station_id, connector_number);
        // get() applies expiry before the destructive delete
        let value = self.get(&key)?;
        self.delete(&key);
        Some(value)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

fn station_key(station_id: &str) -> String {
    format!("{STATION_KEY_PREFIX}{station_id}")
}

fn pending_key(station_id: &str, connector_number: u32) -> String {
    format!("pending:{station_id}:{connector_number}")
}

/// Subscriber handle; tolerates lag by skipping missed messages.
pub struct TopicSubscriber {
    topic: String,
    receiver: broadcast::Receiver<Value>,
}

impl TopicSubscriber {
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(topic = self.topic.as_str(), missed, "Subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let bus = MessageBus::new();
        let mut sub = bus.subscribe("cmd:ST-1");

        for i in 0..5 {
            bus.publish("cmd:ST-1", serde_json::json!({ "seq": i }));
        }

        for i in 0..5 {
            let msg = sub.recv().await.unwrap();
            assert_eq!(msg["seq"], i);
        }
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = MessageBus::new();
        let mut sub = bus.subscribe("cmd:ST-1");
        bus.publish("cmd:ST-2", serde_json::json!({"other": true}));
        bus.publish("cmd:ST-1", serde_json::json!({"mine": true}));
        let msg = sub.recv().await.unwrap();
        assert_eq!(msg["mine"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_keys_expire() {
        let bus = MessageBus::new();
        bus.register_station_online("ST-1");
        assert!(bus.is_station_online("ST-1"));
        assert_eq!(bus.list_online_stations(), vec!["ST-1".to_string()]);

        tokio::time::advance(STATION_TTL + Duration::from_secs(1)).await;
        assert!(!bus.is_station_online("ST-1"));
        assert!(bus.list_online_stations().is_empty());
    }

    #[tokio::test]
    async fn pending_session_pops_once() {
        let bus = MessageBus::new();
        bus.set_pending_session("ST-1", 1, "session-xyz");
        assert_eq!(
            bus.pop_pending_session("ST-1", 1),
            Some("session-xyz".to_string())
        );
        assert_eq!(bus.pop_pending_session("ST-1", 1), None);
    }

    #[tokio::test]
    async fn subscription_ready_signalling() {
        let bus = MessageBus::new();
        assert!(!bus.is_subscription_ready("ST-1"));
        assert!(
            !bus.wait_for_subscription("ST-1", Duration::from_millis(10))
                .await
        );

        bus.mark_subscription_ready("ST-1");
        assert!(bus.is_subscription_ready("ST-1"));
        assert!(bus.wait_for_subscription("ST-1", SUBSCRIPTION_TIMEOUT).await);

        bus.unregister_station("ST-1");
        assert!(!bus.is_subscription_ready("ST-1"));
    }
}
