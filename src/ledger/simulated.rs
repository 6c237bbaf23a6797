//! In-process ledger for local dev runs and tests
//!
//! Models just enough of a NEP-141/NEP-145 token contract to exercise the
//! relay: storage registration, storage bounds, and transfers that require the
//! receiver to be registered. A submitted batch is applied atomically, the way
//! the chain applies a transaction's actions.

use std::collections::HashMap;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::RpcError;
use super::{FunctionCallAction, Ledger, SubmissionOutcome};
use crate::config::{AppConfig, ConfigError};

pub struct SimulatedLedger {
    ft_contract: String,
    signer_account: String,
    min_deposit: BigUint,
    /// account_id -> storage deposit total
    storage: Mutex<HashMap<String, BigUint>>,
    /// receiver_id -> transferred balance
    balances: Mutex<HashMap<String, BigUint>>,
}

impl SimulatedLedger {
    pub fn new(
        ft_contract: impl Into<String>,
        signer_account: impl Into<String>,
        min_deposit: BigUint,
    ) -> Self {
        Self {
            ft_contract: ft_contract.into(),
            signer_account: signer_account.into(),
            min_deposit,
            storage: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let sim = &config.ledger.simulated;
        let min_deposit = BigUint::parse_bytes(sim.min_deposit.trim().as_bytes(), 10)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "ledger.simulated.min_deposit".into(),
                reason: format!("'{}' is not a yoctoNEAR integer", sim.min_deposit),
            })?;

        let storage = sim
            .registered_accounts
            .iter()
            .map(|account| (account.clone(), min_deposit.clone()))
            .collect();

        info!(
            "Initializing simulated ledger for {} ({} pre-registered accounts)",
            config.near.ft_contract,
            sim.registered_accounts.len()
        );
        Ok(Self {
            storage: Mutex::new(storage),
            ..Self::new(
                config.near.ft_contract.clone(),
                config.near.master_account.clone(),
                min_deposit,
            )
        })
    }

    /// Pre-register an account with the given storage deposit
    pub async fn register(&self, account_id: &str, deposit: BigUint) {
        self.storage
            .lock()
            .await
            .insert(account_id.to_string(), deposit);
    }

    pub async fn is_registered(&self, account_id: &str) -> bool {
        self.storage.lock().await.contains_key(account_id)
    }

    /// Token balance credited to `account_id` by transfers so far
    pub async fn balance_of(&self, account_id: &str) -> BigUint {
        self.balances
            .lock()
            .await
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check_contract(&self, contract: &str) -> Result<(), RpcError> {
        if contract != self.ft_contract {
            return Err(RpcError::Rejected(format!(
                "account {} does not exist while viewing",
                contract
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for SimulatedLedger {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn read(&self, contract: &str, method: &str, args: &Value) -> Result<Vec<u8>, RpcError> {
        self.check_contract(contract)?;

        let result = match method {
            "storage_balance_of" => {
                let account_id = str_arg(args, "account_id")?;
                match self.storage.lock().await.get(account_id) {
                    Some(total) => json!({ "total": total.to_string(), "available": "0" }),
                    None => Value::Null,
                }
            }
            "storage_balance_bounds" => json!({
                "min": self.min_deposit.to_string(),
                "max": self.min_deposit.to_string(),
            }),
            "ft_balance_of" => {
                let account_id = str_arg(args, "account_id")?;
                json!(self.balance_of(account_id).await.to_string())
            }
            other => {
                return Err(RpcError::Rejected(format!(
                    "wasm execution failed with error: MethodResolveError(MethodNotFound) ({})",
                    other
                )));
            }
        };

        serde_json::to_vec(&result).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }

    async fn submit(
        &self,
        receiver_id: &str,
        actions: &[FunctionCallAction],
    ) -> Result<SubmissionOutcome, RpcError> {
        self.check_contract(receiver_id)?;

        // Stage against copies; commit only if every action succeeds
        let mut storage_guard = self.storage.lock().await;
        let mut balances_guard = self.balances.lock().await;
        let mut storage = storage_guard.clone();
        let mut balances = balances_guard.clone();

        for (index, action) in actions.iter().enumerate() {
            let fail = |reason: String| {
                RpcError::Rejected(format!(
                    "Smart contract panicked in action {}: {}",
                    index, reason
                ))
            };
            let deposit = BigUint::parse_bytes(action.deposit.as_bytes(), 10)
                .ok_or_else(|| fail(format!("invalid deposit '{}'", action.deposit)))?;

            match action.method_name.as_str() {
                "storage_deposit" => {
                    let account_id = str_arg(&action.args, "account_id").map_err(|e| fail(e.to_string()))?;
                    if deposit < self.min_deposit {
                        return Err(fail(format!(
                            "The attached deposit is less than the minimum storage balance ({})",
                            self.min_deposit
                        )));
                    }
                    // Already-registered accounts get the deposit refunded
                    storage.entry(account_id.to_string()).or_insert(deposit);
                }
                "ft_transfer" => {
                    if deposit != BigUint::from(1u8) {
                        return Err(fail("Requires attached deposit of exactly 1 yoctoNEAR".into()));
                    }
                    let receiver = str_arg(&action.args, "receiver_id").map_err(|e| fail(e.to_string()))?;
                    if !storage.contains_key(receiver) {
                        return Err(fail(format!("The account {} is not registered", receiver)));
                    }
                    let amount = str_arg(&action.args, "amount")
                        .ok()
                        .and_then(|a| BigUint::parse_bytes(a.as_bytes(), 10))
                        .ok_or_else(|| fail("The amount should be a positive number".into()))?;
                    *balances.entry(receiver.to_string()).or_default() += amount;
                }
                other => return Err(fail(format!("MethodNotFound ({})", other))),
            }
        }

        *storage_guard = storage;
        *balances_guard = balances;

        let tx_id = uuid::Uuid::new_v4();
        debug!("simulated tx {} with {} actions", tx_id, actions.len());
        Ok(json!({
            "transaction": {
                "hash": tx_id.simple().to_string(),
                "signer_id": self.signer_account,
                "receiver_id": receiver_id,
                "actions": actions.len(),
            },
            "status": { "SuccessValue": "" },
        }))
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::Rejected(format!("Failed to deserialize input: missing {}", key)))
}
