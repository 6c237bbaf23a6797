//! Custodial access keys
//!
//! Secret keys arrive as `ed25519:<base58>` strings, usually pasted into
//! environment variables. The pool hands them out round-robin so concurrent
//! transfers spread across access keys and do not fight over one nonce.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use ed25519_dalek::SigningKey;

use crate::config::ConfigError;

const ED25519_PREFIX: &str = "ed25519:";
const SECP256K1_PREFIX: &str = "secp256k1:";

/// Canonical form of a pasted secret key: trimmed, unquoted, curve-prefixed
/// and with any whitespace inside the base58 body removed.
pub fn normalize_key(raw: &str) -> String {
    let mut s = raw.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s = &s[1..s.len() - 1];
    }

    let (curve, body) = if let Some(body) = s.strip_prefix(ED25519_PREFIX) {
        ("ed25519", body)
    } else if let Some(body) = s.strip_prefix(SECP256K1_PREFIX) {
        ("secp256k1", body)
    } else {
        ("ed25519", s)
    };

    let body: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{}:{}", curve, body)
}

/// Parse a secret key. Accepts the 64-byte `secret || public` encoding NEAR
/// tooling emits, or a bare 32-byte seed.
pub fn parse_secret_key(raw: &str) -> Result<SigningKey, ConfigError> {
    let normalized = normalize_key(raw);
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: "MASTER_ACCOUNT_PRIVATE_KEY".into(),
        reason,
    };

    if normalized.starts_with(SECP256K1_PREFIX) {
        return Err(invalid("secp256k1 keys are not supported".into()));
    }
    let body = &normalized[ED25519_PREFIX.len()..];
    let bytes = bs58::decode(body)
        .into_vec()
        .map_err(|e| invalid(format!("not base58: {}", e)))?;

    match bytes.len() {
        64 => {
            let mut keypair = [0u8; 64];
            keypair.copy_from_slice(&bytes);
            SigningKey::from_keypair_bytes(&keypair)
                .map_err(|_| invalid("public half does not match secret half".into()))
        }
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        n => Err(invalid(format!("expected 32 or 64 key bytes, got {}", n))),
    }
}

/// `ed25519:<base58>` form of a public key, as NEAR RPC expects it
pub fn public_key_string(key: &SigningKey) -> String {
    format!(
        "{}{}",
        ED25519_PREFIX,
        bs58::encode(key.verifying_key().as_bytes()).into_string()
    )
}

/// One full-access key of the custodial account
pub struct AccessKey {
    signing_key: SigningKey,
    public_key: String,
    /// Highest nonce handed out locally
    last_nonce: AtomicU64,
}

impl AccessKey {
    fn new(signing_key: SigningKey) -> Self {
        let public_key = public_key_string(&signing_key);
        Self {
            signing_key,
            public_key,
            last_nonce: AtomicU64::new(0),
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Next nonce to sign with, given the nonce the chain last saw for this
    /// key. Strictly increasing per key even when transfers overlap.
    pub fn reserve_nonce(&self, chain_nonce: u64) -> u64 {
        self.last_nonce.fetch_max(chain_nonce, Ordering::SeqCst);
        self.last_nonce.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub struct KeyPool {
    keys: Vec<AccessKey>,
    next: AtomicUsize,
}

impl KeyPool {
    pub fn from_secrets(secrets: &[String]) -> Result<Self, ConfigError> {
        if secrets.is_empty() {
            return Err(ConfigError::MissingCredentials(MISSING_KEYS));
        }
        let keys = secrets
            .iter()
            .map(|s| parse_secret_key(s).map(AccessKey::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            keys,
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Next key in round-robin order
    pub fn next_key(&self) -> &AccessKey {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        &self.keys[i]
    }
}

pub const MISSING_KEYS: &str =
    "MASTER_ACCOUNT_PRIVATE_KEY or MASTER_ACCOUNT_PRIVATE_KEYS environment variable is required";
