//! Relay error types

use thiserror::Error;

use crate::ledger::RpcError;

/// Malformed or missing request fields. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("receiverId and amount are required")]
    MissingFields,

    #[error("amount must be a positive number")]
    InvalidAmount,
}

/// Everything a transfer request can fail with after it reaches the relay
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// No admission slot freed up within the configured wait
    #[error("Server is busy, try again later")]
    Overloaded,
}

impl RelayError {
    /// Get the error code for logs and API responses
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Validation(ValidationError::MissingFields) => "MISSING_FIELDS",
            RelayError::Validation(ValidationError::InvalidAmount) => "INVALID_AMOUNT",
            RelayError::Rpc(e) => e.code(),
            RelayError::Overloaded => "OVERLOADED",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            RelayError::Validation(_) => 400,
            RelayError::Rpc(_) => 500,
            RelayError::Overloaded => 503,
        }
    }
}
