//! Ledger access
//!
//! The relay talks to the chain through one capability interface, [`Ledger`],
//! with two operations:
//!
//! - `read`: execute a read-only contract function and return the raw bytes
//! - `submit`: sign an ordered batch of actions as the custodial account and
//!   broadcast it as one transaction
//!
//! The concrete adapter is chosen once at startup from `ledger.mode`:
//! - [`NearRpcLedger`]: NEAR JSON-RPC reads, submissions signed with the
//!   custodial [`keys::KeyPool`]
//! - [`SimulatedLedger`]: in-process ledger for local dev runs and tests

pub mod error;
pub mod keys;
pub mod near_rpc;
pub mod simulated;
pub mod transaction;

#[cfg(test)]
pub(crate) mod scripted;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, ConfigError, LedgerMode};

pub use error::RpcError;
pub use near_rpc::NearRpcLedger;
pub use simulated::SimulatedLedger;

/// Opaque execution outcome of a submitted batch
pub type SubmissionOutcome = serde_json::Value;

/// Unified interface for reading from and submitting to the ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Adapter name for logs
    fn name(&self) -> &str;

    /// Execute a view function on `contract` and return its raw result bytes
    async fn read(
        &self,
        contract: &str,
        method: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<u8>, RpcError>;

    /// Submit `actions` as one transaction to `receiver_id`, executed in order
    async fn submit(
        &self,
        receiver_id: &str,
        actions: &[FunctionCallAction],
    ) -> Result<SubmissionOutcome, RpcError>;
}

/// A single function-call action inside a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: serde_json::Value,
    /// Prepaid gas
    pub gas: u64,
    /// Attached deposit in yoctoNEAR, as a decimal integer string
    pub deposit: String,
}

/// Build the ledger adapter selected by configuration
pub fn connect(config: &AppConfig) -> Result<Arc<dyn Ledger>, ConfigError> {
    match config.ledger.mode {
        LedgerMode::Rpc => Ok(Arc::new(NearRpcLedger::from_config(config)?)),
        LedgerMode::Simulated => Ok(Arc::new(SimulatedLedger::from_config(config)?)),
    }
}
