//! EvGrid operator backend entrypoint
//!
//! Brings up the OCPP 1.6-J WebSocket endpoint, the mobile HTTP API and
//! the background sweepers, then runs until SIGTERM/SIGINT.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use evgrid_ocpp::application::availability::{AvailabilityMonitor, AvailabilityTracker};
use evgrid_ocpp::application::charging::{ChargingEngine, HangingSessionSweeper};
use evgrid_ocpp::application::commands::create_command_sender;
use evgrid_ocpp::application::pricing::PricingResolver;
use evgrid_ocpp::application::session::SessionRegistry;
use evgrid_ocpp::config::AppConfig;
use evgrid_ocpp::domain::RepositoryProvider;
use evgrid_ocpp::interfaces::ws::OcppServer;
use evgrid_ocpp::support::retry::{retry_with_backoff, RetryConfig};
use evgrid_ocpp::support::shutdown::ShutdownCoordinator;
use evgrid_ocpp::{
    create_api_router, create_message_bus, init_database, DatabaseConfig, SeaOrmRepositoryProvider,
};

/// Seconds granted to in-flight settlements on shutdown.
const SHUTDOWN_DRAIN_SECS: u64 = 30;
/// Hanging sessions older than this are force-stopped.
const HANGING_SESSION_MAX_HOURS: i64 = 12;

#[tokio::main]
async fn main() -> ExitCode {
    // ── Configuration ──────────────────────────────────────
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet; this must still reach the operator.
            eprintln!("❌ Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting EvGrid OCPP operator backend ({})", config.app_env);

    // ── Prometheus (before any metrics calls) ──────────────
    let prometheus_handle = match metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to install Prometheus recorder: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("📊 Prometheus metrics recorder installed");

    // ── Database (bounded bootstrap retries) ───────────────
    let db_config = DatabaseConfig {
        url: config.database_url.clone(),
    };
    let db = match retry_with_backoff(
        RetryConfig::bootstrap(),
        || init_database(&db_config),
        |_| true,
        "database_connect",
    )
    .await
    {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Database connection established");

    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    // ── Core components ────────────────────────────────────
    let bus = create_message_bus();
    let registry = SessionRegistry::shared();
    let command_sender = create_command_sender(registry.clone());
    let pricing = Arc::new(PricingResolver::new(repos.clone()));
    let engine = Arc::new(ChargingEngine::new(
        repos.clone(),
        pricing.clone(),
        bus.clone(),
    ));
    let tracker = Arc::new(AvailabilityTracker::new(repos.clone(), bus.clone()));

    let shutdown = ShutdownCoordinator::new(SHUTDOWN_DRAIN_SECS);
    let shutdown_signal = shutdown.signal();
    shutdown.start_signal_listener();

    // ── Background tasks ───────────────────────────────────
    let monitor = Arc::new(AvailabilityMonitor::new(
        repos.clone(),
        tracker.clone(),
        config.status_check_interval_seconds,
    ));
    monitor.start(shutdown_signal.clone());

    HangingSessionSweeper::new(engine.clone())
        .with_schedule(Duration::from_secs(3600), HANGING_SESSION_MAX_HOURS)
        .start(shutdown_signal.clone());

    spawn_cleanup_task(repos.clone(), bus.clone(), &config, shutdown_signal.clone());

    // ── OCPP WebSocket server ──────────────────────────────
    let config = Arc::new(config);
    let ocpp_server = OcppServer::new(
        config.clone(),
        repos.clone(),
        registry.clone(),
        command_sender.clone(),
        bus.clone(),
        engine.clone(),
        tracker.clone(),
        shutdown.in_flight(),
    )
    .with_shutdown(shutdown_signal.clone());

    let ws_task = tokio::spawn(async move { ocpp_server.run().await });

    // ── HTTP API server ────────────────────────────────────
    let api_router = create_api_router(
        &config,
        repos.clone(),
        engine.clone(),
        registry.clone(),
        prometheus_handle,
    );

    let api_addr = config.api_address();
    let listener = match tokio::net::TcpListener::bind(&api_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind API listener on {api_addr}: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("REST API listening on http://{}", api_addr);
    info!("Swagger UI at http://{}/docs", api_addr);

    let api_shutdown = shutdown_signal.clone();
    let api_task = tokio::spawn(async move {
        axum::serve(
            listener,
            api_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.notified().wait().await;
            info!("🛑 REST API server received shutdown signal");
        })
        .await
    });

    info!("🚀 All servers started. Press Ctrl+C to shutdown gracefully.");

    tokio::select! {
        result = ws_task => match result {
            Ok(Ok(())) => info!("OCPP server stopped"),
            Ok(Err(e)) => error!("OCPP server error: {e}"),
            Err(e) => error!("OCPP server task panicked: {e}"),
        },
        result = api_task => match result {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API server error: {e}"),
            Err(e) => error!("REST API server task panicked: {e}"),
        },
    }

    // ── Drain and cleanup ──────────────────────────────────
    info!("🧹 Waiting for in-flight settlements to commit...");
    shutdown.drain().await;

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {e}");
    } else {
        info!("✅ Database connection closed");
    }

    info!("👋 EvGrid operator backend shutdown complete");
    ExitCode::SUCCESS
}

/// Periodic housekeeping: purge expired idempotency records (24 h
/// retention) and drop dead TTL keys from the bus.
fn spawn_cleanup_task(
    repos: Arc<dyn RepositoryProvider>,
    bus: evgrid_ocpp::SharedMessageBus,
    config: &AppConfig,
    shutdown: evgrid_ocpp::support::shutdown::ShutdownSignal,
) {
    let interval = Duration::from_secs(config.cleanup_interval_minutes.max(1) * 60);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let cutoff = Utc::now() - chrono::Duration::hours(24);
                    match repos.idempotency().purge_older_than(cutoff).await {
                        Ok(0) => {}
                        Ok(purged) => info!(purged, "Idempotency records purged"),
                        Err(e) => warn!(error = %e, "Idempotency purge failed"),
                    }
                    bus.evict_expired();
                }
                _ = shutdown.notified().wait() => break,
            }
        }
    });
}
