use std::sync::Arc;

use crate::relay::TransferRelay;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    /// Relay context built once at startup
    pub relay: Arc<TransferRelay>,
    /// Build identifier reported by `/health`
    pub version: String,
}

impl AppState {
    pub fn new(relay: Arc<TransferRelay>) -> Self {
        Self {
            relay,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}
