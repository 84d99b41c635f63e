//! Soroban RPC client for account loads and transaction submission.
//!
//! Retrying is left to the caller's [`RetryPolicy`](crate::retry::RetryPolicy):
//! this layer only classifies failures so the caller can tell "account not
//! found" and "timed out" apart from generic transport trouble.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::xdr;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LedgerEntriesResult {
    pub entries: Option<Vec<LedgerEntry>>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerEntry {
    pub xdr: String,
    #[serde(rename = "lastModifiedLedgerSeq")]
    pub last_modified_ledger_seq: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct HealthResult {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SendTransactionResult {
    pub status: String,
    pub hash: Option<String>,
    #[serde(rename = "errorResultXdr")]
    pub error_result_xdr: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcFailure {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rejected { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RpcFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RpcFailure::Timeout(e.to_string())
        } else if e.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            RpcFailure::NotFound(e.to_string())
        } else {
            RpcFailure::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: String,
    pub sequence: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status: String,
    pub hash: Option<String>,
}

/// Ledger reads and writes the hunt flows depend on.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn get_account(&self, public_key: &str) -> Result<AccountState, RpcFailure>;

    async fn get_health(&self) -> Result<String, RpcFailure>;

    async fn submit_transaction(&self, signed_xdr: &str) -> Result<SubmitResponse, RpcFailure>;
}

pub struct SorobanRpc {
    client: Client,
    url: String,
}

impl SorobanRpc {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcFailure> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: RpcResponse<T> = response.json().await?;

        if let Some(err) = body.error {
            return Err(RpcFailure::Rejected {
                code: err.code,
                message: err.message,
            });
        }

        body.result
            .ok_or_else(|| RpcFailure::InvalidResponse(format!("Empty result from {method}")))
    }
}

#[async_trait]
impl LedgerRpc for SorobanRpc {
    async fn get_account(&self, public_key: &str) -> Result<AccountState, RpcFailure> {
        let key = xdr::account_ledger_key(public_key)
            .map_err(|e| RpcFailure::InvalidResponse(e.to_string()))?;
        let result: LedgerEntriesResult = self
            .call("getLedgerEntries", json!({ "keys": [key] }))
            .await?;
        debug!(
            "Loaded account {public_key} (latest_ledger={:?})",
            result.latest_ledger
        );
        account_from_entries(public_key, result)
    }

    async fn get_health(&self) -> Result<String, RpcFailure> {
        let result: HealthResult = self.call("getHealth", json!({})).await?;
        Ok(result.status)
    }

    async fn submit_transaction(&self, signed_xdr: &str) -> Result<SubmitResponse, RpcFailure> {
        let result: SendTransactionResult = self
            .call("sendTransaction", json!({ "transaction": signed_xdr }))
            .await?;
        debug!("sendTransaction → {} {:?}", result.status, result.hash);
        interpret_send_result(result)
    }
}

fn account_from_entries(
    public_key: &str,
    result: LedgerEntriesResult,
) -> Result<AccountState, RpcFailure> {
    let entry = result
        .entries
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| RpcFailure::NotFound(format!("account {public_key} not found")))?;

    let sequence = xdr::account_sequence(&entry.xdr)
        .map_err(|e| RpcFailure::InvalidResponse(e.to_string()))?;

    Ok(AccountState {
        account_id: public_key.to_string(),
        sequence,
    })
}

/// `PENDING` and `DUPLICATE` mean the network holds the transaction;
/// `TRY_AGAIN_LATER` is transient; `ERROR` is a rejection.
fn interpret_send_result(result: SendTransactionResult) -> Result<SubmitResponse, RpcFailure> {
    match result.status.as_str() {
        "PENDING" | "DUPLICATE" => Ok(SubmitResponse {
            status: result.status,
            hash: result.hash,
        }),
        "TRY_AGAIN_LATER" => Err(RpcFailure::Transport(
            "network asked to try again later".to_string(),
        )),
        "ERROR" => Err(RpcFailure::Rejected {
            code: 0,
            message: result
                .error_result_xdr
                .unwrap_or_else(|| "transaction rejected".to_string()),
        }),
        other => Err(RpcFailure::InvalidResponse(format!(
            "unknown sendTransaction status {other}"
        ))),
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
