//! HTTP request/response DTOs and the API error type
//!
//! Every error body has the shape `{ "error": string, "details"?: string }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::relay::RelayError;

pub const TRANSFER_INITIATED: &str = "FT transfer initiated successfully";
pub const TRANSFER_FAILED: &str = "Failed to initiate FT transfer";
pub const INVALID_JSON: &str = "invalid JSON body";

/// `POST /send-ft` body
///
/// Only used for API documentation; the handler deserializes the lenient
/// `RawTransferRequest` and validates it in the relay.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct SendFtRequest {
    /// Recipient account
    #[schema(example = "alice.testnet")]
    pub receiver_id: String,
    /// Positive integer in the token's base unit, string or number
    #[schema(value_type = String, example = "1000000")]
    pub amount: Value,
    #[schema(example = "claim #42")]
    pub memo: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendFtResponse {
    #[schema(example = "FT transfer initiated successfully")]
    pub message: String,
    /// Final execution outcome of the submitted transaction
    #[schema(value_type = Object)]
    pub result: Value,
}

impl SendFtResponse {
    pub fn initiated(result: Value) -> Self {
        Self {
            message: TRANSFER_INITIATED.to_string(),
            result,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "receiverId and amount are required")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
    /// Transfers currently holding an admission slot
    pub in_flight: usize,
    /// Admission capacity
    pub capacity: usize,
    /// Ledger adapter in use
    #[schema(example = "near-rpc")]
    pub ledger: String,
    pub version: String,
}

/// Errors returned by gateway handlers
#[derive(Debug)]
pub enum ApiError {
    /// Body missing, not JSON, or not an object of the expected shape
    InvalidJson(String),
    Relay(RelayError),
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        ApiError::Relay(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Relay(e) => StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::InvalidJson(details) => ErrorResponse {
                error: INVALID_JSON.to_string(),
                details: Some(details.clone()),
            },
            ApiError::Relay(RelayError::Rpc(e)) => ErrorResponse {
                error: TRANSFER_FAILED.to_string(),
                details: Some(e.to_string()),
            },
            ApiError::Relay(e) => ErrorResponse {
                error: e.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
