//! Wallet capability and adapters.
//!
//! Business logic only sees [`Wallet`]; which concrete wallet is in use is
//! decided once by [`WalletRegistry::detect`], in order of precedence.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Raw failure reported by a wallet; the message is what the user saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletError {
    pub message: String,
}

impl WalletError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The user dismissed or refused the prompt.
    pub fn is_user_rejection(&self) -> bool {
        let lower = self.message.to_lowercase();
        lower.contains("reject") || lower.contains("cancel") || lower.contains("denied")
    }
}

impl std::fmt::Display for WalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WalletError {}

#[async_trait]
pub trait Wallet: Send + Sync {
    fn name(&self) -> &str;

    /// Active account, or `None` when the wallet is locked / disconnected.
    async fn get_public_key(&self) -> Result<Option<String>, WalletError>;

    /// Sign a base64 transaction envelope. `None` means the wallet produced nothing.
    async fn sign_transaction(
        &self,
        envelope_xdr: &str,
        network_passphrase: &str,
    ) -> Result<Option<String>, WalletError>;
}

/// Ordered set of wallet adapters.
#[derive(Clone, Default)]
pub struct WalletRegistry {
    adapters: Vec<Arc<dyn Wallet>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an adapter; earlier adapters take precedence.
    pub fn with(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.adapters.push(wallet);
        self
    }

    pub fn is_available(&self) -> bool {
        !self.adapters.is_empty()
    }

    pub fn detect(&self) -> Option<Arc<dyn Wallet>> {
        self.adapters.first().cloned()
    }
}

// ─────────────────────────────────────────────────────────
// JSON-RPC bridge adapter
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    result: Option<Value>,
    error: Option<BridgeError>,
}

#[derive(Debug, Deserialize)]
struct BridgeError {
    message: String,
}

/// Talks to a wallet bridge that exposes the generic
/// `request({ method, params })` interface over HTTP.
pub struct BridgeWallet {
    client: Client,
    url: String,
}

impl BridgeWallet {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Option<Value>, WalletError> {
        debug!("Wallet bridge request: {method}");
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
            .await
            .map_err(|e| WalletError::new(format!("wallet bridge unreachable: {e}")))?;

        let body: BridgeResponse = response
            .json()
            .await
            .map_err(|e| WalletError::new(format!("invalid wallet bridge response: {e}")))?;

        if let Some(err) = body.error {
            return Err(WalletError::new(err.message));
        }
        Ok(body.result)
    }
}

fn non_empty_string(value: Option<Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.trim().is_empty())
}

#[async_trait]
impl Wallet for BridgeWallet {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn get_public_key(&self) -> Result<Option<String>, WalletError> {
        let result = self.request("getPublicKey", json!({})).await?;
        Ok(non_empty_string(result))
    }

    async fn sign_transaction(
        &self,
        envelope_xdr: &str,
        network_passphrase: &str,
    ) -> Result<Option<String>, WalletError> {
        let result = self
            .request(
                "signTransaction",
                json!({ "tx": envelope_xdr, "networkPassphrase": network_passphrase }),
            )
            .await?;
        Ok(non_empty_string(result))
    }
}
