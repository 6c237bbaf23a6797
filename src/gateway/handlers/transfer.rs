//! FT transfer handler

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use super::super::state::AppState;
use super::super::types::{ApiError, ErrorResponse, SendFtResponse};
use crate::relay::RawTransferRequest;

/// Send fungible tokens from the relay account
///
/// Registers the recipient's storage in the same transaction when needed.
#[utoipa::path(
    post,
    path = "/send-ft",
    request_body = crate::gateway::types::SendFtRequest,
    responses(
        (status = 200, description = "Transaction submitted", body = SendFtResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 500, description = "Ledger read or submission failed", body = ErrorResponse),
        (status = 503, description = "No admission slot freed up in time", body = ErrorResponse)
    ),
    tag = "Transfer"
)]
pub async fn send_ft(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawTransferRequest>, JsonRejection>,
) -> Result<Json<SendFtResponse>, ApiError> {
    let Json(raw) = payload.map_err(|e| {
        tracing::info!("[GATEWAY] POST /send-ft rejected: {}", e.body_text());
        ApiError::InvalidJson(e.body_text())
    })?;
    tracing::info!(
        receiver = ?raw.receiver_id,
        amount = ?raw.amount,
        "[GATEWAY] POST /send-ft"
    );
    let receipt = state.relay.send_ft(raw).await?;
    Ok(Json(SendFtResponse::initiated(receipt.outcome)))
}
