//! Per-station connection actor
//!
//! Exactly one actor per connected station. It is the only writer to the
//! station's socket, the sole consumer of `cmd:<station_id>` and the
//! single place the station's OCPP rows are mutated from, so handlers
//! for one station never need a lock.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::application::availability::AvailabilityTracker;
use crate::application::bus::SharedMessageBus;
use crate::application::charging::ChargingEngine;
use crate::application::commands::{run_command_loop, SharedCommandSender};
use crate::application::handlers::OcppHandler;
use crate::application::session::{RegisterResult, SharedSessionRegistry};
use crate::domain::RepositoryProvider;
use crate::support::shutdown::{InFlightGuard, ShutdownSignal};

use std::sync::Arc;

/// Everything an actor needs, bundled so the server can hand it over.
pub struct ActorDeps {
    pub repos: Arc<dyn RepositoryProvider>,
    pub registry: SharedSessionRegistry,
    pub command_sender: SharedCommandSender,
    pub bus: SharedMessageBus,
    pub engine: Arc<ChargingEngine>,
    pub tracker: Arc<AvailabilityTracker>,
    pub in_flight: InFlightGuard,
    pub shutdown: Option<ShutdownSignal>,
}

pub async fn run_station_actor(
    ws_stream: WebSocketStream<TcpStream>,
    station_id: String,
    deps: ActorDeps,
) {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    if let RegisterResult::Evicted(old) = deps.registry.register(&station_id, tx) {
        warn!(
            station_id = station_id.as_str(),
            old_connected_at = %old.connected_at,
            "Replaced a stale connection for this station"
        );
    }

    deps.tracker.mark_online(&station_id);
    {
        let tracker = deps.tracker.clone();
        let id = station_id.clone();
        tokio::spawn(async move { tracker.broadcast_station_presence(&id, true).await });
    }

    let handler = Arc::new(OcppHandler::new(
        station_id.clone(),
        deps.repos.clone(),
        deps.engine.clone(),
        deps.tracker.clone(),
        deps.bus.clone(),
        deps.command_sender.clone(),
        deps.in_flight.clone(),
    ));

    // Writer task: owns the sink; sends a 1001 close on shutdown.
    let writer_shutdown = deps.shutdown.clone();
    let writer_id = station_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let message = if let Some(shutdown) = &writer_shutdown {
                tokio::select! {
                    msg = rx.recv() => msg,
                    _ = shutdown.notified().wait() => {
                        info!(station_id = writer_id.as_str(), "Closing socket: server shutdown");
                        let frame = CloseFrame {
                            code: CloseCode::Away,
                            reason: "Server shutting down".into(),
                        };
                        let _ = ws_sender.send(Message::Close(Some(frame))).await;
                        break;
                    }
                }
            } else {
                rx.recv().await
            };

            match message {
                Some(text) => {
                    debug!(station_id = writer_id.as_str(), "-> {}", text);
                    if let Err(e) = ws_sender.send(Message::Text(text)).await {
                        error!(station_id = writer_id.as_str(), "Send error: {}", e);
                        break;
                    }
                }
                None => break,
            }
        }
    });

    // Sole consumer of this station's command topic.
    let command_task = tokio::spawn(run_command_loop(
        station_id.clone(),
        deps.bus.clone(),
        deps.command_sender.clone(),
    ));

    // Reader loop: inbound frames to the handler, replies back through
    // the registry (which feeds the writer task).
    let registry = deps.registry.clone();
    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(station_id = station_id.as_str(), "<- {}", text);
                registry.touch(&station_id);

                if let Some(response) = handler.handle(&text).await {
                    if let Err(e) = registry.send_to(&station_id, response) {
                        error!(
                            station_id = station_id.as_str(),
                            "Failed to queue response: {}", e
                        );
                        break;
                    }
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                registry.touch(&station_id);
            }
            Ok(Message::Close(frame)) => {
                info!(
                    station_id = station_id.as_str(),
                    ?frame,
                    "Close frame received"
                );
                break;
            }
            Ok(Message::Binary(data)) => {
                warn!(
                    station_id = station_id.as_str(),
                    bytes = data.len(),
                    "Ignoring binary message"
                );
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                error!(station_id = station_id.as_str(), "WebSocket error: {}", e);
                break;
            }
        }
    }

    // Cleanup. Reconnection is driven by the station; no backend backoff.
    command_task.abort();
    send_task.abort();
    deps.registry.unregister(&station_id);
    deps.bus.unregister_station(&station_id);
    deps.command_sender.cleanup_station(&station_id);
    deps.tracker
        .broadcast_station_presence(&station_id, false)
        .await;

    info!(station_id = station_id.as_str(), "Disconnected");
}
