//! Relay pipeline tests against a scripted ledger
//!
//! Cover the full request path (validation, admission, storage check,
//! composition, submission) without a network.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::task::yield_now;

use super::*;
use crate::config::RelayConfig;
use crate::ledger::RpcError;
use crate::ledger::scripted::ScriptedLedger;

const FT: &str = "ft.test.near";
const MIN_DEPOSIT: &str = "1250000000000000000000";

fn relay_config(max_concurrency: usize) -> RelayConfig {
    RelayConfig {
        max_concurrency,
        ..RelayConfig::default()
    }
}

fn relay_with(ledger: &Arc<ScriptedLedger>, config: &RelayConfig) -> TransferRelay {
    TransferRelay::new(ledger.clone(), FT, config).unwrap()
}

fn request(body: Value) -> RawTransferRequest {
    serde_json::from_value(body).unwrap()
}

fn alice(amount: &str) -> RawTransferRequest {
    request(json!({ "receiverId": "alice.test", "amount": amount }))
}

// ============================================================================
// Batch composition end to end
// ============================================================================

#[tokio::test]
async fn test_unregistered_recipient_gets_registration_first() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.push_json("storage_balance_of", Value::Null);
    ledger.push_json("storage_balance_bounds", json!({ "min": MIN_DEPOSIT, "max": null }));
    let relay = relay_with(&ledger, &relay_config(4));

    let receipt = relay.send_ft(alice("1000000")).await.unwrap();

    let submissions = ledger.submissions();
    assert_eq!(submissions.len(), 1);
    let (receiver, actions) = &submissions[0];
    assert_eq!(receiver, FT);
    assert_eq!(actions.len(), 2);

    assert_eq!(actions[0].method_name, "storage_deposit");
    assert_eq!(
        actions[0].args,
        json!({ "account_id": "alice.test", "registration_only": true })
    );
    assert_eq!(actions[0].deposit, MIN_DEPOSIT);

    assert_eq!(actions[1].method_name, "ft_transfer");
    assert_eq!(
        actions[1].args,
        json!({ "receiver_id": "alice.test", "amount": "1000000", "memo": "" })
    );
    assert_eq!(actions[1].deposit, "1");

    assert!(receipt.batch.includes_registration());
    assert_eq!(receipt.batch.actions(), actions.as_slice());
    assert_eq!(relay.admission().in_flight(), 0);
}

#[tokio::test]
async fn test_registered_recipient_gets_transfer_only() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.push_json("storage_balance_of", json!({ "total": "5", "available": "0" }));
    let relay = relay_with(&ledger, &relay_config(4));

    let receipt = relay.send_ft(alice("1000000")).await.unwrap();

    assert_eq!(receipt.batch.len(), 1);
    assert_eq!(receipt.batch.actions()[0].method_name, "ft_transfer");
    assert_eq!(
        receipt.batch.actions()[0].args,
        json!({ "receiver_id": "alice.test", "amount": "1000000", "memo": "" })
    );
    // bounds are only read for unregistered accounts
    assert_eq!(ledger.read_methods(), vec!["storage_balance_of"]);
}

#[tokio::test]
async fn test_memo_and_numeric_amount() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_default(
        "storage_balance_of",
        Ok(br#"{"total":"5","available":"0"}"#.to_vec()),
    );
    let relay = relay_with(&ledger, &relay_config(4));

    let receipt = relay
        .send_ft(request(json!({
            "receiverId": "bob.test",
            "amount": 250,
            "memo": "airdrop round 2"
        })))
        .await
        .unwrap();

    let args = &receipt.batch.actions()[0].args;
    assert_eq!(args["amount"], "250");
    assert_eq!(args["memo"], "airdrop round 2");
}

#[tokio::test]
async fn test_skip_check_always_registers_without_reads() {
    let ledger = Arc::new(ScriptedLedger::new());
    // would read as registered if anyone asked
    ledger.set_default("storage_balance_of", Ok(br#"{"total":"5"}"#.to_vec()));
    let config = RelayConfig {
        skip_storage_check: true,
        storage_min_deposit: Some("2000000000000000000000".into()),
        ..RelayConfig::default()
    };
    let relay = relay_with(&ledger, &config);

    for _ in 0..2 {
        let receipt = relay.send_ft(alice("1000000")).await.unwrap();
        assert!(receipt.batch.includes_registration());
        assert_eq!(receipt.batch.actions()[0].deposit, "2000000000000000000000");
    }
    assert!(ledger.read_methods().is_empty());
    assert_eq!(ledger.submissions().len(), 2);
}

#[tokio::test]
async fn test_skip_check_without_override_uses_fallback() {
    let ledger = Arc::new(ScriptedLedger::new());
    let config = RelayConfig {
        skip_storage_check: true,
        ..RelayConfig::default()
    };
    let relay = relay_with(&ledger, &config);

    let receipt = relay.send_ft(alice("7")).await.unwrap();
    assert_eq!(receipt.batch.actions()[0].deposit, MIN_DEPOSIT);
    assert!(ledger.read_methods().is_empty());
}

#[test]
fn test_invalid_override_rejected_at_startup() {
    let ledger = Arc::new(ScriptedLedger::new());
    let config = RelayConfig {
        skip_storage_check: true,
        storage_min_deposit: Some("0.00125".into()),
        ..RelayConfig::default()
    };
    assert!(TransferRelay::new(ledger, FT, &config).is_err());
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_validation_failure_touches_nothing() {
    let ledger = Arc::new(ScriptedLedger::new());
    let relay = relay_with(&ledger, &relay_config(1));

    // every slot is taken; a validation failure must not queue behind it
    let _held = relay.admission().acquire().await.unwrap();

    for body in [
        json!({ "receiverId": "alice.test", "amount": "-5" }),
        json!({ "receiverId": "alice.test", "amount": "0" }),
        json!({ "receiverId": "alice.test", "amount": "1.5" }),
        json!({ "receiverId": "alice.test" }),
        json!({ "amount": "10" }),
        json!({ "receiverId": "", "amount": "10" }),
    ] {
        let err = relay.send_ft(request(body.clone())).await.unwrap_err();
        assert_eq!(err.http_status(), 400, "{body}");
    }

    assert!(ledger.read_methods().is_empty());
    assert!(ledger.submissions().is_empty());
    assert_eq!(relay.admission().in_flight(), 1);
}

#[tokio::test]
async fn test_negative_amount_message() {
    let ledger = Arc::new(ScriptedLedger::new());
    let relay = relay_with(&ledger, &relay_config(4));

    let err = relay.send_ft(alice("-5")).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Validation(ValidationError::InvalidAmount)
    ));
    assert_eq!(err.to_string(), "amount must be a positive number");
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_submit_failure_releases_slot() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.fail_submit(RpcError::Rejected(
        "Smart contract panicked: The account is not registered".into(),
    ));
    let relay = relay_with(&ledger, &relay_config(1));

    let err = relay.send_ft(alice("1000000")).await.unwrap_err();
    assert_eq!(err.http_status(), 500);
    assert!(err.to_string().contains("not registered"));
    assert_eq!(relay.admission().in_flight(), 0);

    // the single slot is usable again
    let err = relay.send_ft(alice("1000000")).await.unwrap_err();
    assert_eq!(err.http_status(), 500);
    assert_eq!(ledger.submissions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_submit_is_never_retried() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.fail_submit(RpcError::Timeout("signer timed out".into()));
    let relay = relay_with(&ledger, &relay_config(1));

    let err = relay.send_ft(alice("1000000")).await.unwrap_err();
    assert_eq!(err.code(), "TIMEOUT");
    assert_eq!(ledger.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_storage_reads_are_retried() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.push_read(
        "storage_balance_of",
        Err(RpcError::RateLimited("429 Too Many Requests".into())),
    );
    ledger.push_read(
        "storage_balance_of",
        Err(RpcError::ConnectionReset("ECONNRESET".into())),
    );
    ledger.push_json("storage_balance_of", json!({ "total": "5" }));
    let relay = relay_with(&ledger, &relay_config(1));

    let receipt = relay.send_ft(alice("1000000")).await.unwrap();

    assert_eq!(receipt.batch.len(), 1);
    assert_eq!(ledger.read_methods().len(), 3);
    assert_eq!(ledger.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_storage_read_fails_request() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_default(
        "storage_balance_of",
        Err(RpcError::Timeout("request timed out".into())),
    );
    let relay = relay_with(&ledger, &relay_config(1));

    let err = relay.send_ft(alice("1000000")).await.unwrap_err();

    assert_eq!(err.http_status(), 500);
    assert_eq!(ledger.read_methods().len(), 3);
    assert!(ledger.submissions().is_empty());
    assert_eq!(relay.admission().in_flight(), 0);
}

#[tokio::test]
async fn test_undecodable_storage_reads_still_submit() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.push_read("storage_balance_of", Ok(b"<html>502</html>".to_vec()));
    ledger.push_read("storage_balance_bounds", Ok(b"{\"min\":".to_vec()));
    let relay = relay_with(&ledger, &relay_config(1));

    let receipt = relay.send_ft(alice("1000000")).await.unwrap();
    assert!(receipt.batch.includes_registration());
    assert_eq!(receipt.batch.actions()[0].deposit, MIN_DEPOSIT);
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn test_concurrency_never_exceeds_capacity() {
    let ledger = Arc::new(ScriptedLedger::with_blocking_submits());
    ledger.set_default("storage_balance_of", Ok(br#"{"total":"5"}"#.to_vec()));
    let relay = Arc::new(relay_with(&ledger, &relay_config(2)));

    let mut handles = Vec::new();
    for i in 0..3 {
        let relay = relay.clone();
        handles.push(tokio::spawn(async move {
            relay.send_ft(alice(&(i + 1).to_string())).await
        }));
    }

    while ledger.submits_in_progress() < 2 {
        yield_now().await;
    }
    for _ in 0..10 {
        yield_now().await;
    }
    // the third request waits for a slot
    assert_eq!(ledger.submits_in_progress(), 2);
    assert_eq!(relay.admission().in_flight(), 2);

    ledger.release_submits(1);
    while ledger.submissions().is_empty() || ledger.submits_in_progress() < 2 {
        yield_now().await;
    }
    assert_eq!(ledger.submissions().len(), 1);

    ledger.release_submits(2);
    for h in handles {
        assert!(h.await.unwrap().is_ok());
    }

    assert_eq!(ledger.submissions().len(), 3);
    assert_eq!(ledger.max_submits_in_progress(), 2);
    assert_eq!(relay.admission().in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_overloaded_when_no_slot_frees_up() {
    let ledger = Arc::new(ScriptedLedger::new());
    let config = RelayConfig {
        max_concurrency: 1,
        admission_timeout_ms: 50,
        ..RelayConfig::default()
    };
    let relay = relay_with(&ledger, &config);
    let _held = relay.admission().acquire().await.unwrap();

    let err = relay.send_ft(alice("1000000")).await.unwrap_err();

    assert!(matches!(err, RelayError::Overloaded));
    assert_eq!(err.http_status(), 503);
    assert!(ledger.read_methods().is_empty());
    assert!(ledger.submissions().is_empty());
}

#[test]
fn test_stage_names() {
    assert_eq!(RelayStage::CheckingStorage.to_string(), "CHECKING_STORAGE");
    assert_eq!(RelayStage::Failed.to_string(), "FAILED");
}

#[test]
fn test_relay_reports_its_context() {
    let ledger = Arc::new(ScriptedLedger::new());
    let relay = relay_with(&ledger, &relay_config(8));
    assert_eq!(relay.admission().capacity(), 8);
    assert_eq!(relay.storage_mode(), &StorageMode::Check);
    assert_eq!(relay.ledger_name(), "scripted");
}

#[tokio::test(start_paused = true)]
async fn test_custom_retry_policy_applies() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_default(
        "storage_balance_of",
        Err(RpcError::RateLimited("429".into())),
    );
    let relay = relay_with(&ledger, &relay_config(1))
        .with_retry_policy(RetryPolicy::new(5, Duration::from_millis(1)));

    assert!(relay.send_ft(alice("1")).await.is_err());
    assert_eq!(ledger.read_methods().len(), 5);
}
