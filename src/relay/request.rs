//! Transfer request types

use serde::Deserialize;
use serde_json::Value;

use super::amount::TokenAmount;
use super::error::ValidationError;

/// Transfer request as received, before any validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransferRequest {
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Validated transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub receiver_id: String,
    pub amount: TokenAmount,
    pub memo: Option<String>,
}

impl TransferRequest {
    pub fn new(
        receiver_id: impl Into<String>,
        amount: TokenAmount,
        memo: Option<String>,
    ) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            amount,
            memo,
        }
    }
}

impl TryFrom<RawTransferRequest> for TransferRequest {
    type Error = ValidationError;

    fn try_from(raw: RawTransferRequest) -> Result<Self, Self::Error> {
        let receiver_id = raw
            .receiver_id
            .filter(|r| !r.is_empty())
            .ok_or(ValidationError::MissingFields)?;
        let amount = match raw.amount {
            None | Some(Value::Null) => return Err(ValidationError::MissingFields),
            Some(ref v) => TokenAmount::from_json(v)?,
        };
        Ok(Self {
            receiver_id,
            amount,
            memo: raw.memo,
        })
    }
}
