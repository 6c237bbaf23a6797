//! NEP-145 storage registration check
//!
//! Decides whether a `storage_deposit` must precede the transfer:
//!
//! 1. `storage_balance_of({account_id})`: registered when the result is an
//!    object whose `total` (else `available`) is an integer > 0
//! 2. only if unregistered, `storage_balance_bounds()`: `min` is the deposit
//!
//! Both reads go through the retry policy. Undecodable results are not
//! errors: a bad balance means "unregistered" and a bad bounds result means
//! the fallback deposit is used. RPC failures still propagate.

use num_bigint::BigUint;
use serde_json::{Value, json};
use tracing::debug;

use super::retry::RetryPolicy;
use crate::ledger::{Ledger, RpcError};

/// Deposit used when the contract's bounds cannot be read (0.00125 NEAR)
pub const FALLBACK_MIN_DEPOSIT: &str = "1250000000000000000000";

pub fn fallback_min_deposit() -> BigUint {
    BigUint::parse_bytes(FALLBACK_MIN_DEPOSIT.as_bytes(), 10).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageStatus {
    Registered,
    Unregistered { minimum_deposit: BigUint },
}

impl StorageStatus {
    pub fn is_registered(&self) -> bool {
        matches!(self, StorageStatus::Registered)
    }
}

pub struct StorageRegistrationCheck<'a> {
    ledger: &'a dyn Ledger,
    ft_contract: &'a str,
    retry: &'a RetryPolicy,
}

impl<'a> StorageRegistrationCheck<'a> {
    pub fn new(ledger: &'a dyn Ledger, ft_contract: &'a str, retry: &'a RetryPolicy) -> Self {
        Self {
            ledger,
            ft_contract,
            retry,
        }
    }

    pub async fn status(&self, account_id: &str) -> Result<StorageStatus, RpcError> {
        let args = json!({ "account_id": account_id });
        let balance = self
            .retry
            .run("storage_balance_of", || {
                self.ledger.read(self.ft_contract, "storage_balance_of", &args)
            })
            .await?;

        if is_registered(&balance) {
            debug!(account_id, "storage already registered");
            return Ok(StorageStatus::Registered);
        }

        let no_args = json!({});
        let bounds = self
            .retry
            .run("storage_balance_bounds", || {
                self.ledger
                    .read(self.ft_contract, "storage_balance_bounds", &no_args)
            })
            .await?;

        let minimum_deposit = min_deposit(&bounds).unwrap_or_else(|| {
            debug!("storage bounds unusable, using fallback deposit");
            fallback_min_deposit()
        });
        debug!(account_id, %minimum_deposit, "storage registration required");
        Ok(StorageStatus::Unregistered { minimum_deposit })
    }
}

/// Decode raw view bytes as JSON; anything undecodable or `null` is `None`
fn decode_json(bytes: &[u8]) -> Option<Value> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Null) | Err(_) => None,
        Ok(v) => Some(v),
    }
}

/// Integer from a JSON string or number, `None` otherwise
fn parse_integer(value: &Value) -> Option<BigUint> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            BigUint::parse_bytes(s.as_bytes(), 10)
        }
        Value::Number(n) => n.as_u64().map(BigUint::from),
        _ => None,
    }
}

/// Decode a `storage_balance_of` result
pub fn is_registered(bytes: &[u8]) -> bool {
    let Some(balance) = decode_json(bytes) else {
        return false;
    };
    let amount = match balance.get("total") {
        Some(total) if !total.is_null() => Some(total),
        _ => balance.get("available"),
    };
    amount
        .and_then(parse_integer)
        .is_some_and(|v| v > BigUint::default())
}

/// Decode the `min` of a `storage_balance_bounds` result. Some contracts
/// nest it as `{ "min": { "yocto": "..." } }`.
pub fn min_deposit(bytes: &[u8]) -> Option<BigUint> {
    let bounds = decode_json(bytes)?;
    let min = bounds.get("min")?;
    parse_integer(min).or_else(|| min.get("yocto").and_then(parse_integer))
}
