pub mod payments;

use crate::AppState;
use axum::{extract::State, Json, response::IntoResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub status_api: String,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status_api = state
        .gateway
        .status_circuit_state()
        .unwrap_or_else(|| "not_configured".to_string());

    Json(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status_api,
    })
}
