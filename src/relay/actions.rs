//! Action batch composition
//!
//! A batch is `[storage_deposit]? ft_transfer`. The chain executes a
//! transaction's actions in order and `ft_transfer` panics for receivers
//! without storage, so registration always comes first.

use num_bigint::BigUint;
use serde_json::json;

use super::request::TransferRequest;
use super::storage::StorageStatus;
use crate::ledger::FunctionCallAction;

pub const TGAS: u64 = 1_000_000_000_000;
pub const STORAGE_DEPOSIT_GAS: u64 = 30 * TGAS;
pub const FT_TRANSFER_GAS: u64 = 30 * TGAS;
/// `ft_transfer` requires exactly one yoctoNEAR attached
pub const FT_TRANSFER_DEPOSIT: &str = "1";

/// Ordered actions for one transaction against the token contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBatch {
    receiver_id: String,
    actions: Vec<FunctionCallAction>,
}

impl ActionBatch {
    pub fn compose(ft_contract: &str, storage: &StorageStatus, request: &TransferRequest) -> Self {
        let mut actions = Vec::with_capacity(2);
        if let StorageStatus::Unregistered { minimum_deposit } = storage {
            actions.push(storage_deposit(&request.receiver_id, minimum_deposit));
        }
        actions.push(ft_transfer(request));

        Self {
            receiver_id: ft_contract.to_string(),
            actions,
        }
    }

    /// Contract the transaction is sent to
    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    pub fn actions(&self) -> &[FunctionCallAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn includes_registration(&self) -> bool {
        self.actions
            .first()
            .is_some_and(|a| a.method_name == "storage_deposit")
    }
}

pub fn storage_deposit(account_id: &str, deposit: &BigUint) -> FunctionCallAction {
    FunctionCallAction {
        method_name: "storage_deposit".to_string(),
        args: json!({ "account_id": account_id, "registration_only": true }),
        gas: STORAGE_DEPOSIT_GAS,
        deposit: deposit.to_string(),
    }
}

/// The amount goes out exactly as validated: base units, decimal string
pub fn ft_transfer(request: &TransferRequest) -> FunctionCallAction {
    FunctionCallAction {
        method_name: "ft_transfer".to_string(),
        args: json!({
            "receiver_id": request.receiver_id,
            "amount": request.amount.to_string(),
            "memo": request.memo.as_deref().unwrap_or(""),
        }),
        gas: FT_TRANSFER_GAS,
        deposit: FT_TRANSFER_DEPOSIT.to_string(),
    }
}
