//! Liveness and health handlers

use std::sync::Arc;

use axum::{Json, extract::State};

use super::super::state::AppState;
use super::super::types::HealthResponse;

pub const ROOT_MESSAGE: &str = "NEAR Fungible Token Claiming Service is running!";

/// Liveness text
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String, content_type = "text/plain")),
    tag = "System"
)]
pub async fn root() -> &'static str {
    ROOT_MESSAGE
}

/// Health check endpoint
///
/// Reports admission gate occupancy; performs no ledger calls.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json")
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let gate = state.relay.admission();
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
        in_flight: gate.in_flight(),
        capacity: gate.capacity(),
        ledger: state.relay.ledger_name().to_string(),
        version: state.version.clone(),
    })
}
