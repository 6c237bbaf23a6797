//! NEAR JSON-RPC ledger adapter
//!
//! Reads go straight to NEAR RPC nodes (`query` / `call_function`), rotating
//! round-robin over the configured endpoints. Submissions are signed in
//! process with the next key from the custodial [`KeyPool`] and broadcast
//! with `broadcast_tx_commit`, which waits for the final execution outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::RpcError;
use super::keys::KeyPool;
use super::transaction::{Action, PublicKey, Transaction};
use super::{FunctionCallAction, Ledger, SubmissionOutcome};
use crate::config::{AppConfig, ConfigError};

pub struct NearRpcLedger {
    client: reqwest::Client,
    rpc_urls: Vec<String>,
    /// Sent with every RPC call
    headers: HeaderMap,
    next_rpc: AtomicUsize,
    keys: KeyPool,
    signer_account: String,
}

/// JSON-RPC request structure
#[derive(Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'static str,
    params: T,
}

/// JSON-RPC response structure
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// NEAR structured RPC error
#[derive(Deserialize, Debug)]
struct JsonRpcError {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cause: Option<ErrorCause>,
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct ErrorCause {
    name: String,
}

#[derive(Serialize)]
struct CallFunctionParams<'a> {
    request_type: &'static str,
    finality: &'static str,
    account_id: &'a str,
    method_name: &'a str,
    args_base64: String,
}

/// `call_function` result. Older nodes report contract panics inline as
/// `error` instead of a JSON-RPC error.
#[derive(Deserialize, Debug)]
struct CallFunctionResult {
    #[serde(default)]
    result: Option<Vec<u8>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct ViewAccessKeyParams<'a> {
    request_type: &'static str,
    finality: &'static str,
    account_id: &'a str,
    public_key: &'a str,
}

/// Only the fields needed to build the next transaction
#[derive(Deserialize, Debug)]
struct AccessKeyView {
    nonce: u64,
    block_hash: String,
}

impl NearRpcLedger {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let rpc_urls = config.near.resolve_rpc_urls()?;
        let keys = KeyPool::from_secrets(&config.ledger.private_keys)?;

        let headers = build_headers(&config.near.rpc_headers)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.near.rpc_timeout_ms))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "near".into(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        info!(
            "Initializing NEAR RPC ledger for {} (rpc_urls={}, headers={}, access_keys={})",
            config.near.network_id,
            rpc_urls.len(),
            headers.len(),
            keys.len()
        );

        Ok(Self {
            client,
            rpc_urls,
            headers,
            next_rpc: AtomicUsize::new(0),
            keys,
            signer_account: config.near.master_account.clone(),
        })
    }

    /// Next endpoint in round-robin order
    fn pick_rpc_url(&self) -> &str {
        let i = self.next_rpc.fetch_add(1, Ordering::Relaxed) % self.rpc_urls.len();
        &self.rpc_urls[i]
    }

    /// Make a JSON-RPC call
    async fn rpc_call<T, R>(&self, method: &'static str, params: T) -> Result<R, RpcError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.pick_rpc_url();
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: "near_ft_relay",
            method,
            params,
        };

        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await?;

        if let Some(err) = classify_status(response.status(), url) {
            return Err(err);
        }

        // A body cut short is a network failure, only a complete body that
        // fails to parse is an invalid response
        let body = response.bytes().await?;
        let rpc_response: JsonRpcResponse<R> = serde_json::from_slice(&body)
            .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(classify_rpc_error(error));
        }

        rpc_response
            .result
            .ok_or_else(|| RpcError::InvalidResponse("No result in RPC response".to_string()))
    }
}

#[async_trait]
impl Ledger for NearRpcLedger {
    fn name(&self) -> &str {
        "near-rpc"
    }

    async fn read(
        &self,
        contract: &str,
        method: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<u8>, RpcError> {
        let args_json = serde_json::to_vec(args)
            .map_err(|e| RpcError::InvalidResponse(format!("Unencodable view args: {}", e)))?;

        let params = CallFunctionParams {
            request_type: "call_function",
            finality: "final",
            account_id: contract,
            method_name: method,
            args_base64: BASE64.encode(args_json),
        };

        let result: CallFunctionResult = self.rpc_call("query", params).await?;
        if let Some(error) = result.error {
            return Err(RpcError::Rejected(error));
        }
        debug!("view {}.{} ok", contract, method);
        Ok(result.result.unwrap_or_default())
    }

    async fn submit(
        &self,
        receiver_id: &str,
        actions: &[FunctionCallAction],
    ) -> Result<SubmissionOutcome, RpcError> {
        let actions = actions
            .iter()
            .map(Action::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let key = self.keys.next_key();
        let access_key: AccessKeyView = self
            .rpc_call(
                "query",
                ViewAccessKeyParams {
                    request_type: "view_access_key",
                    finality: "final",
                    account_id: &self.signer_account,
                    public_key: key.public_key(),
                },
            )
            .await?;
        let block_hash = decode_block_hash(&access_key.block_hash)?;
        let nonce = key.reserve_nonce(access_key.nonce);

        let signed = Transaction {
            signer_id: self.signer_account.clone(),
            public_key: PublicKey::Ed25519(key.signing_key().verifying_key().to_bytes()),
            nonce,
            receiver_id: receiver_id.to_string(),
            block_hash,
            actions,
        }
        .sign(key.signing_key())?;
        let tx_hash = bs58::encode(signed.transaction.hash()?).into_string();
        debug!(
            tx_hash = %tx_hash,
            public_key = key.public_key(),
            nonce,
            "broadcasting transaction"
        );

        let outcome: SubmissionOutcome = self
            .rpc_call("broadcast_tx_commit", [BASE64.encode(signed.to_bytes()?)])
            .await?;
        if let Some(failure) = outcome.pointer("/status/Failure") {
            return Err(RpcError::Rejected(describe_failure(failure)));
        }
        Ok(outcome)
    }
}

fn decode_block_hash(encoded: &str) -> Result<[u8; 32], RpcError> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| RpcError::InvalidResponse(format!("Bad block hash {}: {}", encoded, e)))?;
    bytes
        .try_into()
        .map_err(|_| RpcError::InvalidResponse(format!("Bad block hash length: {}", encoded)))
}

/// Contract panics carry a readable message; anything else is reported as the
/// raw failure JSON
fn describe_failure(failure: &serde_json::Value) -> String {
    match failure.pointer("/ActionError/kind/FunctionCallError/ExecutionError") {
        Some(serde_json::Value::String(message)) => message.clone(),
        _ => failure.to_string(),
    }
}

fn build_headers(
    raw: &std::collections::BTreeMap<String, String>,
) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    for (name, value) in raw {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Map an HTTP status to an error, `None` when the body should be parsed
fn classify_status(status: StatusCode, url: &str) -> Option<RpcError> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            Some(RpcError::RateLimited(format!("HTTP 429 from {}", url)))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            Some(RpcError::Timeout(format!("HTTP {} from {}", status.as_u16(), url)))
        }
        s if s.is_success() => None,
        // NEAR nodes return structured errors with HTTP 4xx/5xx, parse them
        StatusCode::BAD_REQUEST | StatusCode::INTERNAL_SERVER_ERROR => None,
        s => Some(RpcError::Transport(format!("HTTP {} from {}", s.as_u16(), url))),
    }
}

fn classify_rpc_error(error: JsonRpcError) -> RpcError {
    let cause = error.cause.as_ref().map(|c| c.name.as_str());
    let detail = match error.data {
        Some(serde_json::Value::String(ref s)) => s.clone(),
        Some(ref other) => other.to_string(),
        None => error.message.clone(),
    };
    let message = format!("RPC error {}: {}", error.code, detail);

    match (error.name.as_deref(), cause) {
        (_, Some("TOO_MANY_REQUESTS")) | (Some("TOO_MANY_REQUESTS"), _) => {
            RpcError::RateLimited(message)
        }
        (_, Some("TIMEOUT_ERROR")) => RpcError::Timeout(message),
        _ => RpcError::Rejected(message),
    }
}
