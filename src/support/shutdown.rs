//! Graceful shutdown handling
//!
//! Provides shutdown signal coordination for all server components.
//! On SIGTERM/SIGINT the HTTP listener stops accepting, stations receive a
//! close frame (1001 Going Away) and in-flight settlement transactions get
//! a bounded drain window before the process exits.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shutdown signal that can be cloned and shared across tasks
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            info!("🛑 Shutdown signal triggered");
            let _ = self.sender.send(());
        }
    }

    pub fn notified(&self) -> ShutdownNotified {
        ShutdownNotified {
            receiver: self.sender.subscribe(),
            triggered: self.triggered.clone(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A future that resolves when shutdown is triggered
pub struct ShutdownNotified {
    receiver: broadcast::Receiver<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownNotified {
    pub async fn wait(mut self) {
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.receiver.recv().await;
    }
}

/// Tracks money-changing operations that must be allowed to commit before
/// the process exits.
#[derive(Clone, Default)]
pub struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a critical section; the returned token releases it on drop.
    pub fn enter(&self) -> InFlightToken {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightToken {
            count: self.count.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until all critical sections have completed, or the timeout hits.
    pub async fn drain(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.in_flight() > 0 {
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    remaining = self.in_flight(),
                    "Drain timeout reached with settlements still in flight"
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

pub struct InFlightToken {
    count: Arc<AtomicUsize>,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Graceful shutdown coordinator
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    in_flight: InFlightGuard,
    timeout_secs: u64,
}

impl ShutdownCoordinator {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            in_flight: InFlightGuard::new(),
            timeout_secs,
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn in_flight(&self) -> InFlightGuard {
        self.in_flight.clone()
    }

    /// Listen for OS shutdown signals (SIGTERM, SIGINT) in the background.
    pub fn start_signal_listener(&self) {
        let signal = self.signal.clone();
        tokio::spawn(listen_for_shutdown_signals(signal));
    }

    /// Wait for the in-flight settlements to drain (bounded).
    pub async fn drain(&self) {
        self.in_flight
            .drain(Duration::from_secs(self.timeout_secs))
            .await;
    }
}

/// Listen for OS shutdown signals (SIGTERM, SIGINT)
pub async fn listen_for_shutdown_signals(shutdown: ShutdownSignal) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("📡 Received SIGINT signal (Ctrl+C)");
            }
        }

        shutdown.trigger();
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("📡 Received Ctrl+C signal");
        shutdown.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_wakes_waiters() {
        let signal = ShutdownSignal::new();
        let notified = signal.notified();
        signal.trigger();
        // Resolves immediately because the flag is already set.
        notified.wait().await;
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn in_flight_guard_counts_tokens() {
        let guard = InFlightGuard::new();
        let token = guard.enter();
        assert_eq!(guard.in_flight(), 1);
        drop(token);
        assert_eq!(guard.in_flight(), 0);
        guard.drain(Duration::from_millis(10)).await;
    }
}
