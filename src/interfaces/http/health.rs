//! Health endpoint

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::application::session::SharedSessionRegistry;

#[derive(Clone)]
pub struct HealthState {
    pub registry: SharedSessionRegistry,
}

pub async fn health(State(state): State<HealthState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "connected_stations": state.registry.count(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
