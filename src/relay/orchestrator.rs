//! Transfer submission pipeline
//!
//! ```text
//! Validating → Admitted → CheckingStorage → Composing → Submitting → Completed
//!      │           │              │              │            │
//!      └───────────┴──────────────┴──────────────┴────────────┴──→ Failed
//! ```
//!
//! Validation runs before admission, so malformed requests never queue or
//! consume a slot. The admission slot lives inside [`TransferRelay::run`]
//! and is dropped before a failure is logged and returned.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigUint;
use tracing::{debug, info, warn};

use super::actions::ActionBatch;
use super::admission::AdmissionGate;
use super::error::RelayError;
use super::request::{RawTransferRequest, TransferRequest};
use super::retry::RetryPolicy;
use super::storage::{StorageRegistrationCheck, StorageStatus, fallback_min_deposit};
use crate::config::{ConfigError, RelayConfig};
use crate::ledger::{Ledger, SubmissionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    Validating,
    Admitted,
    CheckingStorage,
    Composing,
    Submitting,
    Completed,
    Failed,
}

impl fmt::Display for RelayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelayStage::Validating => "VALIDATING",
            RelayStage::Admitted => "ADMITTED",
            RelayStage::CheckingStorage => "CHECKING_STORAGE",
            RelayStage::Composing => "COMPOSING",
            RelayStage::Submitting => "SUBMITTING",
            RelayStage::Completed => "COMPLETED",
            RelayStage::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// How registration is decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// Read `storage_balance_of` (and bounds when needed) per request
    Check,
    /// Always attach `storage_deposit` with this deposit, no reads.
    /// Redundant deposits are refunded by the contract.
    Skip { deposit: BigUint },
}

/// Result of a completed transfer
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub batch: ActionBatch,
    pub outcome: SubmissionOutcome,
}

/// Relay context built once at startup and shared by every request
pub struct TransferRelay {
    ledger: Arc<dyn Ledger>,
    ft_contract: String,
    gate: AdmissionGate,
    retry: RetryPolicy,
    storage_mode: StorageMode,
}

impl TransferRelay {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        ft_contract: impl Into<String>,
        config: &RelayConfig,
    ) -> Result<Self, ConfigError> {
        let storage_mode = if config.skip_storage_check {
            let deposit = match config.storage_min_deposit {
                Some(ref raw) => BigUint::parse_bytes(raw.trim().as_bytes(), 10).ok_or_else(
                    || ConfigError::InvalidValue {
                        key: "relay.storage_min_deposit".into(),
                        reason: format!("'{}' is not a yoctoNEAR integer", raw),
                    },
                )?,
                None => fallback_min_deposit(),
            };
            StorageMode::Skip { deposit }
        } else {
            StorageMode::Check
        };

        let wait_timeout = match config.admission_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(Self {
            ledger,
            ft_contract: ft_contract.into(),
            gate: AdmissionGate::new(config.max_concurrency, wait_timeout),
            retry: RetryPolicy::default(),
            storage_mode,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn admission(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn storage_mode(&self) -> &StorageMode {
        &self.storage_mode
    }

    pub fn ledger_name(&self) -> &str {
        self.ledger.name()
    }

    /// Validate, admit, decide registration, compose and submit one transfer
    pub async fn send_ft(&self, raw: RawTransferRequest) -> Result<TransferReceipt, RelayError> {
        let mut stage = RelayStage::Validating;
        self.run(raw, &mut stage).await.inspect_err(|e| {
            warn!(
                failed_at = %stage,
                code = e.code(),
                "[RELAY] transfer {}: {}",
                RelayStage::Failed,
                e
            );
        })
    }

    async fn run(
        &self,
        raw: RawTransferRequest,
        stage: &mut RelayStage,
    ) -> Result<TransferReceipt, RelayError> {
        let request = TransferRequest::try_from(raw)?;

        let _slot = self.gate.acquire().await?;
        advance(stage, RelayStage::Admitted, &request);

        advance(stage, RelayStage::CheckingStorage, &request);
        let storage = match self.storage_mode {
            StorageMode::Check => {
                StorageRegistrationCheck::new(self.ledger.as_ref(), &self.ft_contract, &self.retry)
                    .status(&request.receiver_id)
                    .await?
            }
            StorageMode::Skip { ref deposit } => StorageStatus::Unregistered {
                minimum_deposit: deposit.clone(),
            },
        };

        advance(stage, RelayStage::Composing, &request);
        let batch = ActionBatch::compose(&self.ft_contract, &storage, &request);

        advance(stage, RelayStage::Submitting, &request);
        let outcome = self
            .ledger
            .submit(batch.receiver_id(), batch.actions())
            .await?;

        advance(stage, RelayStage::Completed, &request);
        info!(
            receiver = %request.receiver_id,
            amount = %request.amount,
            actions = batch.len(),
            with_registration = batch.includes_registration(),
            "[RELAY] transfer submitted via {}",
            self.ledger.name()
        );
        Ok(TransferReceipt { batch, outcome })
    }
}

fn advance(stage: &mut RelayStage, next: RelayStage, request: &TransferRequest) {
    debug!(
        receiver = %request.receiver_id,
        amount = %request.amount,
        "[RELAY] {} -> {}",
        stage,
        next
    );
    *stage = next;
}
