//! Wallet → account → build → sign → submit pipeline shared by every action.
//!
//! One call of [`LedgerSubmitter::submit`] is a single attempt; callers wrap it
//! in their [`RetryPolicy`](crate::retry::RetryPolicy) so a retry re-derives
//! the wallet state and account sequence from scratch.

use std::sync::Arc;

use tracing::{debug, info};

use crate::actions::HuntAction;
use crate::clock::Clock;
use crate::errors::RegistrationError;
use crate::rpc::{LedgerRpc, RpcFailure};
use crate::wallet::{Wallet, WalletRegistry};
use crate::xdr::TransactionDraft;

#[derive(Debug, Clone)]
pub struct SubmitterSettings {
    pub network_passphrase: String,
    pub base_fee: u32,
    pub timeout_secs: u64,
}

pub struct LedgerSubmitter {
    wallets: WalletRegistry,
    rpc: Arc<dyn LedgerRpc>,
    clock: Arc<dyn Clock>,
    settings: SubmitterSettings,
}

impl LedgerSubmitter {
    pub fn new(
        wallets: WalletRegistry,
        rpc: Arc<dyn LedgerRpc>,
        clock: Arc<dyn Clock>,
        settings: SubmitterSettings,
    ) -> Self {
        Self {
            wallets,
            rpc,
            clock,
            settings,
        }
    }

    pub fn wallet_available(&self) -> bool {
        self.wallets.is_available()
    }

    pub fn rpc(&self) -> &Arc<dyn LedgerRpc> {
        &self.rpc
    }

    /// Submit `action` once and return the confirmed transaction hash.
    ///
    /// When `expected_signer` is set, the wallet's active account must match it.
    pub async fn submit(
        &self,
        action: &HuntAction,
        expected_signer: Option<&str>,
    ) -> Result<String, RegistrationError> {
        let wallet = self
            .wallets
            .detect()
            .ok_or(RegistrationError::WalletNotFound)?;
        let public_key = active_public_key(wallet.as_ref()).await?;

        if let Some(expected) = expected_signer {
            if public_key != expected {
                return Err(RegistrationError::AddressMismatch);
            }
        }

        let account = self
            .rpc
            .get_account(&public_key)
            .await
            .map_err(|e| match e {
                RpcFailure::NotFound(_) => RegistrationError::AccountNotFound,
                other => {
                    debug!("Account load failed for {public_key}: {other}");
                    RegistrationError::AccountLoadFailed
                }
            })?;

        let now_ms = self.clock.now_millis();
        let envelope = TransactionDraft {
            source: account.account_id,
            sequence: account.sequence,
            base_fee: self.settings.base_fee,
            max_time: now_ms / 1000 + self.settings.timeout_secs,
            operations: action
                .to_operations(now_ms)
                .map_err(|e| RegistrationError::Unexpected(e.to_string()))?,
        }
        .to_envelope_xdr()
        .map_err(|e| RegistrationError::Unexpected(e.to_string()))?;

        let signed = sign(wallet.as_ref(), &envelope, &self.settings.network_passphrase).await?;

        let response = self
            .rpc
            .submit_transaction(&signed)
            .await
            .map_err(|e| match e {
                RpcFailure::Timeout(_) => RegistrationError::TransactionTimeout,
                other => RegistrationError::SubmissionFailed {
                    detail: other.to_string(),
                },
            })?;

        let hash = response
            .hash
            .filter(|h| !h.trim().is_empty())
            .ok_or(RegistrationError::SubmissionUnconfirmed)?;

        info!(
            "{} submitted via {} wallet: {hash} ({})",
            action.name(),
            wallet.name(),
            response.status
        );
        Ok(hash)
    }
}

async fn active_public_key(wallet: &dyn Wallet) -> Result<String, RegistrationError> {
    match wallet.get_public_key().await {
        Ok(Some(key)) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        Ok(_) => Err(RegistrationError::WalletNotConnected),
        Err(e) => {
            debug!("Wallet {} could not provide a public key: {e}", wallet.name());
            Err(RegistrationError::WalletNotConnected)
        }
    }
}

async fn sign(
    wallet: &dyn Wallet,
    envelope: &str,
    network_passphrase: &str,
) -> Result<String, RegistrationError> {
    match wallet.sign_transaction(envelope, network_passphrase).await {
        Ok(Some(signed)) if !signed.trim().is_empty() => Ok(signed),
        Ok(_) => Err(RegistrationError::WalletSigningFailed),
        Err(e) if e.is_user_rejection() => Err(RegistrationError::UserRejected),
        Err(e) => Err(RegistrationError::Unexpected(e.message)),
    }
}
