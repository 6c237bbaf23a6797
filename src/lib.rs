//! NEAR FT Relay
//!
//! HTTP service that sends NEP-141 fungible tokens from one custodial account,
//! registering the recipient's NEP-145 storage in the same transaction when
//! it is missing.
//!
//! # Modules
//!
//! - [`config`] - YAML config + environment overrides, validated at startup
//! - [`logging`] - tracing subscriber setup
//! - [`ledger`] - `Ledger` capability (`read` / `submit`) and its adapters
//! - [`relay`] - validation, admission, retry, storage check, batch composition
//! - [`gateway`] - axum router, handlers and OpenAPI document

pub mod config;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod relay;

pub use config::{AppConfig, ConfigError};
pub use ledger::{FunctionCallAction, Ledger, NearRpcLedger, RpcError, SimulatedLedger};
pub use relay::{RawTransferRequest, RelayError, TransferReceipt, TransferRelay};
