//! HTTP API router
//!
//! Wires the charging endpoints with their middleware stack: per-IP rate
//! limits (tight on the money-moving routes), the idempotency layer,
//! CORS, tracing and the Prometheus/Swagger surfaces.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::charging::ChargingEngine;
use crate::application::session::SharedSessionRegistry;
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;

use super::charging::dto::{StartChargingRequest, StopChargingRequest};
use super::charging::handlers::{self, ApiState};
use super::health::{health, HealthState};
use super::middleware::{idempotency_middleware, IdempotencyState};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::charging::handlers::start_charging,
        super::charging::handlers::stop_charging,
        super::charging::handlers::charging_status,
    ),
    components(schemas(StartChargingRequest, StopChargingRequest)),
    tags((name = "Charging", description = "Mobile charging session API"))
)]
struct ApiDoc;

#[allow(clippy::too_many_arguments)]
pub fn create_api_router(
    config: &AppConfig,
    repos: Arc<dyn RepositoryProvider>,
    engine: Arc<ChargingEngine>,
    registry: SharedSessionRegistry,
    prometheus: PrometheusHandle,
) -> Router {
    let api_state = ApiState {
        engine,
        repos: repos.clone(),
        jwt: JwtConfig::new(config.secret_key.clone()),
    };
    let idempotency_state = IdempotencyState { repos };
    let health_state = HealthState { registry };

    // Default quota: RATE_LIMIT_DEFAULT_PER_MINUTE per client IP.
    let default_rpm = config.rate_limit_default_per_minute.max(1);
    let default_governor = GovernorConfigBuilder::default()
        .per_second((60 / default_rpm as u64).max(1))
        .burst_size(default_rpm)
        .use_headers()
        .finish()
        .expect("default governor config");

    // Money-moving routes get the tighter critical quota.
    let critical_rpm = config.rate_limit_critical_per_minute.max(1);
    let critical_governor = GovernorConfigBuilder::default()
        .per_second((60 / critical_rpm as u64).max(1))
        .burst_size(critical_rpm)
        .use_headers()
        .finish()
        .expect("critical governor config");

    let charging_mutations = Router::new()
        .route("/charging/start", post(handlers::start_charging))
        .route("/charging/stop", post(handlers::stop_charging))
        .layer(axum::middleware::from_fn_with_state(
            idempotency_state,
            idempotency_middleware,
        ))
        .layer(GovernorLayer::new(critical_governor))
        .with_state(api_state.clone());

    let charging_queries = Router::new()
        .route("/charging/status/{id}", get(handlers::charging_status))
        .with_state(api_state);

    let charging_routes = charging_mutations.merge(charging_queries);

    let prometheus_handle = prometheus.clone();

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health).with_state(health_state))
        .route(
            "/metrics",
            get(move || {
                let handle = prometheus_handle.clone();
                async move { handle.render() }
            }),
        )
        .nest("/api/v1", charging_routes)
        .fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                axum::Json(serde_json::json!({
                    "success": false,
                    "error": "not_found",
                    "message": "Route not found",
                })),
            )
        })
        .layer(GovernorLayer::new(default_governor))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
