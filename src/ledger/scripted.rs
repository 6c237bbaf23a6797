//! Scripted ledger fake for unit tests
//!
//! Reads pop pre-loaded responses per method (falling back to a default when
//! the queue is empty); every read and submit is recorded for assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use super::error::RpcError;
use super::{FunctionCallAction, Ledger, SubmissionOutcome};

#[derive(Default)]
pub(crate) struct ScriptedLedger {
    reads: Mutex<HashMap<String, VecDeque<Result<Vec<u8>, RpcError>>>>,
    defaults: Mutex<HashMap<String, Result<Vec<u8>, RpcError>>>,
    submit_result: Mutex<Option<Result<SubmissionOutcome, RpcError>>>,
    read_log: Mutex<Vec<(String, Value)>>,
    submissions: Mutex<Vec<(String, Vec<FunctionCallAction>)>>,
    /// When set, each submit must take a permit before completing
    submit_gate: Option<Semaphore>,
    submits_in_progress: AtomicUsize,
    max_submits_in_progress: AtomicUsize,
}

impl ScriptedLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Submits block until `release_submits` hands out permits
    pub(crate) fn with_blocking_submits() -> Self {
        Self {
            submit_gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub(crate) fn push_read(&self, method: &str, result: Result<Vec<u8>, RpcError>) {
        self.reads
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(result);
    }

    pub(crate) fn push_json(&self, method: &str, value: Value) {
        self.push_read(method, Ok(serde_json::to_vec(&value).unwrap()));
    }

    pub(crate) fn set_default(&self, method: &str, result: Result<Vec<u8>, RpcError>) {
        self.defaults
            .lock()
            .unwrap()
            .insert(method.to_string(), result);
    }

    pub(crate) fn fail_submit(&self, err: RpcError) {
        *self.submit_result.lock().unwrap() = Some(Err(err));
    }

    pub(crate) fn release_submits(&self, n: usize) {
        if let Some(ref gate) = self.submit_gate {
            gate.add_permits(n);
        }
    }

    pub(crate) fn read_methods(&self) -> Vec<String> {
        self.read_log
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub(crate) fn submissions(&self) -> Vec<(String, Vec<FunctionCallAction>)> {
        self.submissions.lock().unwrap().clone()
    }

    pub(crate) fn submits_in_progress(&self) -> usize {
        self.submits_in_progress.load(Ordering::SeqCst)
    }

    pub(crate) fn max_submits_in_progress(&self) -> usize {
        self.max_submits_in_progress.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for ScriptedLedger {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn read(&self, _contract: &str, method: &str, args: &Value) -> Result<Vec<u8>, RpcError> {
        self.read_log
            .lock()
            .unwrap()
            .push((method.to_string(), args.clone()));

        let queued = self
            .reads
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|q| q.pop_front());
        match queued {
            Some(result) => result,
            None => self
                .defaults
                .lock()
                .unwrap()
                .get(method)
                .cloned()
                .unwrap_or_else(|| Ok(b"null".to_vec())),
        }
    }

    async fn submit(
        &self,
        receiver_id: &str,
        actions: &[FunctionCallAction],
    ) -> Result<SubmissionOutcome, RpcError> {
        let now = self.submits_in_progress.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_submits_in_progress.fetch_max(now, Ordering::SeqCst);

        if let Some(ref gate) = self.submit_gate {
            let permit = gate.acquire().await.expect("gate never closed");
            permit.forget();
        }

        self.submissions
            .lock()
            .unwrap()
            .push((receiver_id.to_string(), actions.to_vec()));
        self.submits_in_progress.fetch_sub(1, Ordering::SeqCst);

        match self.submit_result.lock().unwrap().clone() {
            Some(result) => result,
            None => Ok(json!({ "status": { "SuccessValue": "" }, "actions": actions.len() })),
        }
    }
}
