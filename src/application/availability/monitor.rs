//! Administrative availability sweeper
//!
//! Runs once a minute: stations whose last heartbeat is older than five
//! minutes flip to `is_available = false` (and back when they recover).
//! Stations that never sent a heartbeat stay unavailable. Transitions
//! publish an owner-facing offline notification on the bus for the
//! external push collaborator.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};

use crate::application::availability::AvailabilityTracker;
use crate::domain::{DomainResult, RepositoryProvider};
use crate::support::shutdown::ShutdownSignal;

/// Heartbeat age after which a station counts as offline.
const OFFLINE_THRESHOLD_MINUTES: i64 = 5;

pub struct AvailabilityMonitor {
    repos: Arc<dyn RepositoryProvider>,
    tracker: Arc<AvailabilityTracker>,
    check_interval: Duration,
}

impl AvailabilityMonitor {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        tracker: Arc<AvailabilityTracker>,
        check_interval_seconds: u64,
    ) -> Self {
        Self {
            repos,
            tracker,
            check_interval: Duration::from_secs(check_interval_seconds),
        }
    }

    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) {
        tokio::spawn(async move {
            info!(
                "💓 Availability monitor started (interval: {}s, offline threshold: {}m)",
                self.check_interval.as_secs(),
                OFFLINE_THRESHOLD_MINUTES
            );

            let mut interval = tokio::time::interval(self.check_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.sweep().await {
                            warn!("Availability sweep error: {}", e);
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("💓 Availability monitor shutting down");
                        break;
                    }
                }
            }
        });
    }

    /// One pass over all stations.
    pub async fn sweep(&self) -> DomainResult<()> {
        let stations = self.repos.stations().list_all().await?;
        let now = Utc::now();

        debug!("Checking availability for {} stations", stations.len());

        for station in stations {
            let should_be_available = match station.last_heartbeat_at {
                Some(last) => (now - last).num_minutes() < OFFLINE_THRESHOLD_MINUTES,
                // Never connected
                None => false,
            };

            if should_be_available == station.is_available {
                continue;
            }

            info!(
                "💓 [{}] availability: {} → {} (last heartbeat: {:?})",
                station.id, station.is_available, should_be_available, station.last_heartbeat_at
            );

            self.repos
                .stations()
                .set_available(&station.id, should_be_available)
                .await?;

            self.tracker
                .broadcast_station_presence(&station.id, should_be_available)
                .await;
        }

        Ok(())
    }
}
