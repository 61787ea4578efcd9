//! Charging API handlers

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::application::charging::ChargingEngine;
use crate::domain::{ChargingLimit, DomainError, RepositoryProvider};
use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig};
use crate::interfaces::http::common::{error_response, money, ok_response};

use super::dto::{StartChargingRequest, StopChargingRequest};

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<ChargingEngine>,
    pub repos: Arc<dyn RepositoryProvider>,
    pub jwt: JwtConfig,
}

/// Authenticated mobile client, extracted from the bearer token.
pub struct AuthClient(pub Uuid);

impl FromRequestParts<ApiState> for AuthClient {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("Missing bearer token"))?;

        let claims = verify_token(token, &state.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        let client_id = claims
            .client_id()
            .ok_or_else(|| unauthorized("Malformed token subject"))?;

        Ok(AuthClient(client_id))
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "error": "unauthorized", "message": message})),
    )
        .into_response()
}

fn validation_failure(e: validator::ValidationErrors) -> Response {
    error_response(&DomainError::Validation(e.to_string())).into_response()
}

/// POST /api/v1/charging/start
#[utoipa::path(
    post,
    path = "/api/v1/charging/start",
    tag = "Charging",
    request_body = StartChargingRequest,
    responses(
        (status = 200, description = "Session created, funds reserved"),
        (status = 400, description = "Balance or validation failure"),
        (status = 409, description = "Station offline or session conflict")
    ),
    security(("bearer_auth" = []))
)]
pub async fn start_charging(
    State(state): State<ApiState>,
    AuthClient(client_id): AuthClient,
    Json(body): Json<StartChargingRequest>,
) -> Response {
    if let Err(e) = body.validate() {
        return validation_failure(e);
    }

    info!(
        %client_id,
        station_id = body.station_id.as_str(),
        connector_id = body.connector_id,
        energy_kwh = ?body.energy_kwh,
        amount_som = ?body.amount_som,
        "Start charging requested"
    );

    let limit = ChargingLimit::from_request(body.energy_kwh, body.amount_som);

    match state
        .engine
        .start_charging(client_id, &body.station_id, body.connector_id, limit)
        .await
    {
        Ok(outcome) => {
            let message = if outcome.station_online {
                "Зарядка запущена, средства зарезервированы"
            } else {
                "Сессия создана, средства зарезервированы. Зарядка начнется при подключении станции."
            };
            ok_response(json!({
                "session_id": outcome.session_id,
                "station_id": outcome.station_id,
                "connector_id": outcome.connector_id,
                "reserved_amount": money(outcome.reserved_amount),
                "new_balance": money(outcome.new_balance),
                "station_online": outcome.station_online,
                "pricing": outcome.pricing,
                "message": message,
            }))
            .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/v1/charging/stop
#[utoipa::path(
    post,
    path = "/api/v1/charging/stop",
    tag = "Charging",
    request_body = StopChargingRequest,
    responses(
        (status = 200, description = "Session settled"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn stop_charging(
    State(state): State<ApiState>,
    AuthClient(client_id): AuthClient,
    Json(body): Json<StopChargingRequest>,
) -> Response {
    if let Err(e) = body.validate() {
        return validation_failure(e);
    }

    info!(%client_id, session_id = %body.session_id, "Stop charging requested");

    match state
        .engine
        .stop_charging(body.session_id, Some(client_id))
        .await
    {
        Ok(outcome) => ok_response(json!({
            "session_id": outcome.session_id,
            "station_id": outcome.station_id,
            "energy_consumed": outcome.energy_consumed,
            "reserved_amount": money(outcome.reserved_amount),
            "actual_cost": money(outcome.actual_cost),
            "refund_amount": money(outcome.refund_amount),
            "additional_charge": money(outcome.additional_charge),
            "new_balance": money(outcome.new_balance),
            "station_online": outcome.station_online,
        }))
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /api/v1/charging/status/{id}
#[utoipa::path(
    get,
    path = "/api/v1/charging/status/{id}",
    tag = "Charging",
    params(("id" = Uuid, Path, description = "Charging session id")),
    responses(
        (status = 200, description = "Live session view"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn charging_status(
    State(state): State<ApiState>,
    AuthClient(client_id): AuthClient,
    Path(session_id): Path<Uuid>,
) -> Response {
    match state
        .engine
        .charging_status(session_id, Some(client_id))
        .await
    {
        Ok(view) => ok_response(json!({
            "session_id": view.session_id,
            "status": view.status,
            "station_id": view.station_id,
            "connector_id": view.connector_id,
            "limit_type": view.limit_type,
            "limit_value": money(view.limit_value),
            "reserved_amount": money(view.reserved_amount),
            "energy_kwh": view.energy_kwh,
            "current_cost": money(view.current_cost),
            "progress_percent": view.progress_percent,
            "meter_start": view.meter_start,
            "ocpp_transaction_id": view.ocpp_transaction_id,
            "start_time": view.start_time,
            "stop_time": view.stop_time,
            "final_amount": view.final_amount.map(money).unwrap_or(serde_json::Value::Null),
            "station_online": view.station_online,
        }))
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
