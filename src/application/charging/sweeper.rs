//! Hanging-session sweeper
//!
//! A session the station never closed (power cut mid-charge, lost
//! StopTransaction) would otherwise hold the client's reservation
//! forever. Once an hour, sessions `started` for more than 12 hours are
//! force-stopped through the normal settlement path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::support::shutdown::ShutdownSignal;

use super::engine::ChargingEngine;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);
const MAX_SESSION_HOURS: i64 = 12;

pub struct HangingSessionSweeper {
    engine: Arc<ChargingEngine>,
    interval: Duration,
    max_hours: i64,
}

impl HangingSessionSweeper {
    pub fn new(engine: Arc<ChargingEngine>) -> Self {
        Self {
            engine,
            interval: SWEEP_INTERVAL,
            max_hours: MAX_SESSION_HOURS,
        }
    }

    pub fn with_schedule(mut self, interval: Duration, max_hours: i64) -> Self {
        self.interval = interval;
        self.max_hours = max_hours;
        self
    }

    pub fn start(self, shutdown: ShutdownSignal) {
        tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                max_hours = self.max_hours,
                "Hanging-session sweeper started"
            );
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; skip it so a fresh boot
            // does not race the reconciliation path.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.engine.sweep_hanging_sessions(self.max_hours).await {
                            Ok(0) => {}
                            Ok(swept) => info!(swept, "Hanging sessions settled"),
                            Err(e) => error!(error = %e, "Hanging-session sweep failed"),
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("Hanging-session sweeper shutting down");
                        break;
                    }
                }
            }
        });
    }
}
