//! Result log
//!
//! Successes and failures each sit behind their own lock, so the two paths
//! never contend with each other. Within a bucket the sequences stay paired
//! index for index.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::result::CallResult;

#[derive(Debug, Default)]
struct OkBucket {
    data: Vec<JsonValue>,
    results: Vec<CallResult>,
}

#[derive(Debug, Default)]
struct FailBucket {
    results: Vec<CallResult>,
    errors: Vec<String>,
}

/// Append-only storage of classified results
#[derive(Debug, Default)]
pub struct ResultLog {
    ok: Mutex<OkBucket>,
    fail: Mutex<FailBucket>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful result and its payload (`null` when it has none)
    pub fn push_ok(&self, result: CallResult) {
        let mut ok = self.ok.lock();
        ok.data.push(result.data.clone().unwrap_or(JsonValue::Null));
        ok.results.push(result);
    }

    /// Append a failed or timed-out result and its error text
    pub fn push_fail(&self, result: CallResult) {
        let mut fail = self.fail.lock();
        fail.errors.push(result.error.clone().unwrap_or_default());
        fail.results.push(result);
    }

    pub fn ok_count(&self) -> usize {
        self.ok.lock().results.len()
    }

    pub fn fail_count(&self) -> usize {
        self.fail.lock().results.len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.fail.lock().errors.clone()
    }

    /// Copy of all buckets. Each bucket is consistent on its own.
    pub fn snapshot(&self) -> ResultData {
        let (ok_data, ok_results) = {
            let ok = self.ok.lock();
            (ok.data.clone(), ok.results.clone())
        };
        ResultData {
            ok_data,
            ok_results,
            fail_results: self.fail.lock().results.clone(),
        }
    }
}

/// Snapshot of a [`ResultLog`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultData {
    /// Payloads of successful results, in completion order
    pub ok_data: Vec<JsonValue>,
    /// Successful results, in completion order
    pub ok_results: Vec<CallResult>,
    /// Failed and timed-out results, in completion order
    pub fail_results: Vec<CallResult>,
}
