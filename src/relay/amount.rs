//! Token amount validation
//!
//! Amounts are exact integers in the token's base unit. They are parsed into
//! a [`BigUint`] and never pass through floating point or a NEAR-denomination
//! parser, so a 24-decimal supply survives unchanged.
//!
//! Accepted:
//! - JSON strings of ASCII digits, surrounding whitespace ignored
//! - JSON integers
//!
//! Rejected with [`ValidationError::InvalidAmount`]:
//! - zero, negatives, explicit `+`
//! - fractions (`"1.5"`), exponents (`"1e3"`), non-integral JSON numbers
//! - anything that is not a string or number

use std::fmt;

use num_bigint::BigUint;
use serde_json::Value;

use super::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount(BigUint);

impl TokenAmount {
    /// Validate a raw amount taken from a request body
    pub fn from_json(raw: &Value) -> Result<Self, ValidationError> {
        match raw {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => match n.as_u64() {
                Some(v) if v > 0 => Ok(Self(BigUint::from(v))),
                _ => Err(ValidationError::InvalidAmount),
            },
            _ => Err(ValidationError::InvalidAmount),
        }
    }

    /// Validate a decimal integer string
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidAmount);
        }
        let value = BigUint::parse_bytes(s.as_bytes(), 10).ok_or(ValidationError::InvalidAmount)?;
        if value == BigUint::default() {
            return Err(ValidationError::InvalidAmount);
        }
        Ok(Self(value))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
