//! FT transfer relay
//!
//! Turns a transfer request into one ordered transaction against the token
//! contract:
//!
//! ```text
//! request ─→ validate ─→ admit ─→ storage check ─→ compose ─→ submit
//!                          │            │
//!                     AdmissionGate  RetryPolicy (reads only)
//! ```
//!
//! # Invariants
//!
//! 1. **Registration first**: `storage_deposit` always precedes `ft_transfer`
//!    in the same batch, never a separate transaction
//! 2. **Exact amounts**: the amount reaches the chain as the validated
//!    base-unit integer, never via floating point
//! 3. **Bounded concurrency**: at most `max_concurrency` requests past
//!    admission, admitted FIFO, slot returned on every exit path
//! 4. **Submit once**: retries apply to idempotent reads, never to `submit`

pub mod actions;
pub mod admission;
pub mod amount;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod retry;
pub mod storage;

#[cfg(test)]
mod integration_tests;

pub use actions::ActionBatch;
pub use admission::{AdmissionGate, AdmissionSlot};
pub use amount::TokenAmount;
pub use error::{RelayError, ValidationError};
pub use orchestrator::{RelayStage, StorageMode, TransferReceipt, TransferRelay};
pub use request::{RawTransferRequest, TransferRequest};
pub use retry::RetryPolicy;
pub use storage::{StorageRegistrationCheck, StorageStatus};
