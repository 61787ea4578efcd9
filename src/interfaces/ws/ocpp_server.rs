//! OCPP 1.6-J WebSocket server
//!
//! Stations connect at `ws://<host>:<port>/ws/{station_id}` or
//! `/ocpp/{station_id}` (both resolve here). Subprotocols accepted in
//! preference order: `ocpp1.6`, `ocpp1.6j`, `ocpp1.6-json`; a client
//! offering none is accepted without one for compatibility.
//!
//! Close codes: 1008 unauthorized / unknown station, 1013 too many
//! connections, 1001 going away on shutdown.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures_util::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::application::availability::AvailabilityTracker;
use crate::application::bus::SharedMessageBus;
use crate::application::charging::ChargingEngine;
use crate::application::commands::SharedCommandSender;
use crate::application::session::SharedSessionRegistry;
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::api_key::{keys_match, verify_api_key};
use crate::support::shutdown::{InFlightGuard, ShutdownSignal};

use super::station_actor::{run_station_actor, ActorDeps};

/// Accepted subprotocols, our preference first.
const SUBPROTOCOLS: [&str; 3] = ["ocpp1.6", "ocpp1.6j", "ocpp1.6-json"];

/// Upper bound on fresh connections per minute across the fleet.
const CONNECTIONS_PER_MINUTE: u32 = 600;

/// OCPP WebSocket server: one actor per accepted station socket.
pub struct OcppServer {
    config: Arc<AppConfig>,
    repos: Arc<dyn RepositoryProvider>,
    registry: SharedSessionRegistry,
    command_sender: SharedCommandSender,
    bus: SharedMessageBus,
    engine: Arc<ChargingEngine>,
    tracker: Arc<AvailabilityTracker>,
    in_flight: InFlightGuard,
    shutdown: Option<ShutdownSignal>,
    accept_window: Arc<AcceptWindow>,
}

/// Sliding one-minute accept counter.
struct AcceptWindow {
    window_start: AtomicU32,
    accepted: AtomicU32,
}

impl AcceptWindow {
    fn new() -> Self {
        Self {
            window_start: AtomicU32::new(0),
            accepted: AtomicU32::new(0),
        }
    }

    fn try_accept(&self) -> bool {
        let minute = (Utc::now().timestamp() / 60) as u32;
        let current = self.window_start.load(Ordering::SeqCst);
        if current != minute {
            self.window_start.store(minute, Ordering::SeqCst);
            self.accepted.store(0, Ordering::SeqCst);
        }
        self.accepted.fetch_add(1, Ordering::SeqCst) < CONNECTIONS_PER_MINUTE
    }
}

impl OcppServer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AppConfig>,
        repos: Arc<dyn RepositoryProvider>,
        registry: SharedSessionRegistry,
        command_sender: SharedCommandSender,
        bus: SharedMessageBus,
        engine: Arc<ChargingEngine>,
        tracker: Arc<AvailabilityTracker>,
        in_flight: InFlightGuard,
    ) -> Self {
        Self {
            config,
            repos,
            registry,
            command_sender,
            bus,
            engine,
            tracker,
            in_flight,
            shutdown: None,
            accept_window: Arc::new(AcceptWindow::new()),
        }
    }

    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.ws_address();
        let listener = TcpListener::bind(&addr).await?;

        info!("🔌 OCPP 1.6-J endpoint started on ws://{}", addr);
        info!(
            "   Stations connect to ws://{}/ws/{{station_id}} or /ocpp/{{station_id}}",
            addr
        );

        loop {
            let accept = listener.accept();
            let result = if let Some(shutdown) = &self.shutdown {
                tokio::select! {
                    result = accept => Some(result),
                    _ = shutdown.notified().wait() => {
                        info!("🛑 OCPP server received shutdown signal");
                        return Ok(());
                    }
                }
            } else {
                Some(accept.await)
            };

            match result {
                Some(Ok((stream, addr))) => self.spawn_connection(stream, addr),
                Some(Err(e)) => error!("Failed to accept connection: {}", e),
                None => return Ok(()),
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let deps = ActorDeps {
            repos: self.repos.clone(),
            registry: self.registry.clone(),
            command_sender: self.command_sender.clone(),
            bus: self.bus.clone(),
            engine: self.engine.clone(),
            tracker: self.tracker.clone(),
            in_flight: self.in_flight.clone(),
            shutdown: self.shutdown.clone(),
        };
        let config = self.config.clone();
        let accept_window = self.accept_window.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, config, accept_window, deps).await {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// What the handshake callback captured.
#[derive(Default)]
struct HandshakeInfo {
    station_id: Option<String>,
    bearer_key: Option<String>,
    query_key: Option<String>,
}

/// Extract the station id from the request path.
/// Accepted: /ws/{id}, /ocpp/{id}, or a bare /{id}.
fn extract_station_id(path: &str) -> Option<String> {
    let path = path.split('?').next().unwrap_or(path);
    let trimmed = path.trim_matches('/');

    for prefix in ["ws/", "ocpp/"] {
        if let Some(id) = trimmed.strip_prefix(prefix) {
            let id = id.trim_matches('/');
            if !id.is_empty() && !id.contains('/') {
                return Some(id.to_string());
            }
        }
    }

    if !trimmed.is_empty() && !trimmed.contains('/') {
        return Some(trimmed.to_string());
    }

    None
}

/// Pick the subprotocol: our preference order against the client's offer.
fn negotiate_subprotocol(offered: &str) -> Option<&'static str> {
    let offers: Vec<&str> = offered.split(',').map(str::trim).collect();
    SUBPROTOCOLS
        .iter()
        .find(|candidate| offers.iter().any(|o| o.eq_ignore_ascii_case(candidate)))
        .copied()
}

fn extract_query_token(uri: &str) -> Option<String> {
    let query = uri.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "token").then(|| value.to_string())
    })
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    config: Arc<AppConfig>,
    accept_window: Arc<AcceptWindow>,
    deps: ActorDeps,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("New connection from: {}", addr);

    let mut handshake = HandshakeInfo::default();

    let mut ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let uri = req.uri().to_string();
            let path = req.uri().path();
            info!("WebSocket handshake from {}, path: {}", addr, path);

            let offered = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            match negotiate_subprotocol(offered) {
                Some(protocol) => {
                    if let Ok(value) = protocol.parse() {
                        response
                            .headers_mut()
                            .insert("Sec-WebSocket-Protocol", value);
                    }
                    info!("Subprotocol negotiated: {}", protocol);
                }
                None if !offered.is_empty() => {
                    warn!("Client offered unsupported subprotocols: {}", offered);
                }
                // No subprotocol offered: accept bare (compatibility path)
                None => {}
            }

            handshake.station_id = extract_station_id(path);
            handshake.bearer_key = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string);
            handshake.query_key = extract_query_token(&uri);

            Ok(response)
        },
    )
    .await?;

    let Some(station_id) = handshake.station_id else {
        warn!("No station id in path, closing");
        close_with(&mut ws_stream, CloseCode::Policy, "Missing station id").await;
        return Ok(());
    };

    if !accept_window.try_accept() {
        warn!(
            station_id = station_id.as_str(),
            "Connection budget exhausted, closing 1013"
        );
        close_with(&mut ws_stream, CloseCode::Again, "Too many connections").await;
        return Ok(());
    }

    // The station must exist and be administratively active.
    let station = match deps.repos.stations().find_by_id(&station_id).await {
        Ok(Some(station)) => station,
        Ok(None) => {
            warn!(station_id = station_id.as_str(), "Unknown station, closing 1008");
            close_with(&mut ws_stream, CloseCode::Policy, "Unknown station").await;
            return Ok(());
        }
        Err(e) => {
            error!(station_id = station_id.as_str(), error = %e, "Station lookup failed");
            close_with(&mut ws_stream, CloseCode::Policy, "Unauthorized").await;
            return Ok(());
        }
    };

    if !station.is_active() {
        warn!(
            station_id = station_id.as_str(),
            "Station administratively inactive, closing 1008"
        );
        close_with(&mut ws_stream, CloseCode::Policy, "Station inactive").await;
        return Ok(());
    }

    if config.verify_station_api_keys {
        let presented = handshake.bearer_key.or(handshake.query_key);
        if !api_key_ok(&config, &station, presented.as_deref()) {
            warn!(
                station_id = station_id.as_str(),
                "API key verification failed, closing 1008"
            );
            close_with(&mut ws_stream, CloseCode::Policy, "Unauthorized").await;
            return Ok(());
        }
    }

    info!(
        station_id = station_id.as_str(),
        remote = %addr,
        "Station authenticated, starting actor"
    );

    run_station_actor(ws_stream, station_id, deps).await;
    Ok(())
}

/// Constant-time key check: the master key (bootstrap) or the station's
/// provisioned key hash.
fn api_key_ok(
    config: &AppConfig,
    station: &crate::domain::Station,
    presented: Option<&str>,
) -> bool {
    let Some(presented) = presented else {
        return false;
    };

    if !config.station_master_api_key.is_empty()
        && keys_match(presented, &config.station_master_api_key)
    {
        return true;
    }

    let Some(stored_hash) = station.api_key_hash.as_deref() else {
        return false;
    };
    if let Some(expires_at) = station.api_key_expires_at {
        if expires_at < Utc::now() {
            return false;
        }
    }
    verify_api_key(presented, stored_hash)
}

async fn close_with(
    ws_stream: &mut tokio_tungstenite::WebSocketStream<TcpStream>,
    code: CloseCode,
    reason: &'static str,
) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    if let Err(e) = ws_stream.send(Message::Close(Some(frame))).await {
        warn!("Failed to send close frame: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_id_from_both_paths() {
        assert_eq!(extract_station_id("/ws/ST-001"), Some("ST-001".to_string()));
        assert_eq!(extract_station_id("/ocpp/ST-001"), Some("ST-001".to_string()));
        assert_eq!(extract_station_id("/ST-001"), Some("ST-001".to_string()));
        assert_eq!(
            extract_station_id("/ws/ST-001?token=abc"),
            Some("ST-001".to_string())
        );
        assert_eq!(extract_station_id("/"), None);
        assert_eq!(extract_station_id("/ws/a/b"), None);
    }

    #[test]
    fn subprotocol_preference_order() {
        assert_eq!(negotiate_subprotocol("ocpp1.6"), Some("ocpp1.6"));
        assert_eq!(negotiate_subprotocol("ocpp1.6j, ocpp1.6"), Some("ocpp1.6"));
        assert_eq!(negotiate_subprotocol("ocpp1.6-json"), Some("ocpp1.6-json"));
        assert_eq!(negotiate_subprotocol("ocpp2.0.1"), None);
        assert_eq!(negotiate_subprotocol(""), None);
    }

    #[test]
    fn query_token_extraction() {
        assert_eq!(
            extract_query_token("/ws/ST-001?token=secret123"),
            Some("secret123".to_string())
        );
        assert_eq!(
            extract_query_token("/ws/ST-001?a=1&token=k"),
            Some("k".to_string())
        );
        assert_eq!(extract_query_token("/ws/ST-001"), None);
    }
}
