use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use thiserror::Error;

use crate::ledger::keys::MISSING_KEYS;

pub const TESTNET_RPC_URL: &str = "https://rpc.testnet.near.org";
pub const MAINNET_RPC_URL: &str = "https://rpc.mainnet.near.org";
pub const SANDBOX_RPC_URL: &str = "http://localhost:3030";

/// Startup failures. Any of these halts the process before it binds a port.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "Unsupported networkId: {0}. Only testnet, mainnet, and sandbox are supported."
    )]
    UnsupportedNetwork(String),

    #[error("RPC_URLS provided but no valid URLs found")]
    EmptyRpcUrls,

    #[error("{0}")]
    MissingCredentials(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid RPC header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub server: ServerConfig,
    pub near: NearConfig,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NearConfig {
    pub network_id: String,
    /// Single RPC endpoint; ignored when `rpc_urls` is non-empty
    #[serde(default)]
    pub node_url: Option<String>,
    /// Endpoints used round-robin
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    /// Extra headers sent with every RPC call (API keys etc.)
    #[serde(default)]
    pub rpc_headers: BTreeMap<String, String>,
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    /// Custodial account that signs every transfer
    pub master_account: String,
    /// Fungible token contract receiving the transactions
    pub ft_contract: String,
}

fn default_rpc_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    Rpc,
    Simulated,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    pub mode: LedgerMode,
    /// Secret keys of `near.master_account`. Only ever read from the
    /// environment, never from config files.
    #[serde(skip)]
    pub private_keys: Vec<String>,
    #[serde(default)]
    pub simulated: SimulatedLedgerConfig,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("mode", &self.mode)
            .field("private_keys", &format_args!("<{} redacted>", self.private_keys.len()))
            .field("simulated", &self.simulated)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimulatedLedgerConfig {
    pub min_deposit: String,
    #[serde(default)]
    pub registered_accounts: Vec<String>,
}

impl Default for SimulatedLedgerConfig {
    fn default() -> Self {
        Self {
            min_deposit: "1250000000000000000000".to_string(),
            registered_accounts: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    /// Concurrent in-flight transfers allowed against the chain
    pub max_concurrency: usize,
    /// Longest a request may queue for an admission slot
    pub admission_timeout_ms: u64,
    /// Always attach `storage_deposit` instead of reading registration state
    pub skip_storage_check: bool,
    /// Deposit used in skip-check mode, yoctoNEAR
    pub storage_min_deposit: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 100,
            admission_timeout_ms: 30_000,
            skip_storage_check: false,
            storage_min_deposit: None,
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`, then apply process environment overrides.
    ///
    /// Also returns non-fatal notices about ignored overrides. Logging is not
    /// up yet at this point, so the caller logs them once it is.
    pub fn load(env: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let mut config = Self::from_file(&config_path)?;
        let notices = config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok((config, notices))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Apply environment overrides. `lookup` returns the value of a variable
    /// if it is set. Returns a notice for every override that was ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<Vec<String>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut notices = Vec::new();

        if let Some(port) = lookup("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }

        if let Some(urls) = lookup("RPC_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if urls.is_empty() {
                return Err(ConfigError::EmptyRpcUrls);
            }
            self.near.rpc_urls = urls;
        }

        if let Some(key) = lookup("FASTNEAR_API_KEY") {
            self.near.rpc_headers.insert("x-api-key".to_string(), key);
        }

        if let Some(raw) = lookup("RPC_HEADERS") {
            match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&raw) {
                Ok(extra) => {
                    for (name, value) in extra {
                        match value {
                            serde_json::Value::String(v) => {
                                self.near.rpc_headers.insert(name, v);
                            }
                            other => notices.push(format!(
                                "Ignoring RPC_HEADERS entry {}: expected a string, got {}",
                                name, other
                            )),
                        }
                    }
                }
                Err(e) => notices.push(format!("Invalid RPC_HEADERS JSON, ignoring: {}", e)),
            }
        }

        let pool = lookup("MASTER_ACCOUNT_PRIVATE_KEYS").filter(|v| !v.trim().is_empty());
        if let Some(keys) = pool {
            self.ledger.private_keys = keys
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        } else if let Some(key) = lookup("MASTER_ACCOUNT_PRIVATE_KEY")
            .filter(|v| !v.trim().is_empty())
        {
            self.ledger.private_keys = vec![key.trim().to_string()];
        }

        if let Some(n) = lookup("MAX_CONCURRENCY") {
            self.relay.max_concurrency = parse_var("MAX_CONCURRENCY", &n)?;
        }
        if let Some(flag) = lookup("SKIP_STORAGE_CHECK") {
            self.relay.skip_storage_check = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(deposit) = lookup("STORAGE_MIN_DEPOSIT") {
            self.relay.storage_min_deposit = Some(deposit.trim().to_string());
        }

        Ok(notices)
    }

    /// Check everything that would otherwise fail on the first request
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near.master_account.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "near.master_account".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.near.ft_contract.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "near.ft_contract".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.relay.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "relay.max_concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }
        if let Some(ref deposit) = self.relay.storage_min_deposit
            && (deposit.is_empty() || !deposit.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(ConfigError::InvalidValue {
                key: "relay.storage_min_deposit".into(),
                reason: format!("'{}' is not a yoctoNEAR integer", deposit),
            });
        }

        if self.ledger.mode == LedgerMode::Rpc {
            self.near.resolve_rpc_urls()?;
            if self.ledger.private_keys.is_empty() {
                return Err(ConfigError::MissingCredentials(MISSING_KEYS));
            }
        }

        Ok(())
    }
}

impl NearConfig {
    /// Pick the RPC endpoints: explicit list, then `node_url`, then the
    /// well-known endpoint for `network_id`.
    pub fn resolve_rpc_urls(&self) -> Result<Vec<String>, ConfigError> {
        if !self.rpc_urls.is_empty() {
            return Ok(self.rpc_urls.clone());
        }
        if let Some(ref url) = self.node_url
            && !url.trim().is_empty()
        {
            return Ok(vec![url.trim().to_string()]);
        }
        let url = match self.network_id.as_str() {
            "testnet" => TESTNET_RPC_URL,
            "mainnet" => MAINNET_RPC_URL,
            "sandbox" => SANDBOX_RPC_URL,
            other => return Err(ConfigError::UnsupportedNetwork(other.to_string())),
        };
        Ok(vec![url.to_string()])
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
