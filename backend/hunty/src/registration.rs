//! Player registration: status checks (cached, retried) and the one-time
//! `register_player` transaction.
//!
//! Neither public entry point returns an error. Every failure, including bad
//! input, is folded into the returned [`RegistrationStatus`] or
//! [`RegistrationResult`] so callers always have something renderable.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actions::HuntAction;
use crate::cache::{CacheKey, RegistrationCache};
use crate::db;
use crate::errors::RegistrationError;
use crate::ledger::LedgerSubmitter;
use crate::retry::RetryPolicy;
use crate::store::HuntStore;
use crate::validation::{validate_hunt_id, validate_player_address};

/// Progress record kept per `(hunt, player)`. Its existence means "registered".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub hunt_id: u64,
    pub player: String,
    pub current_clue_index: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub is_registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_data: Option<PlayerProgress>,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistrationStatus {
    fn from_progress(progress: Option<PlayerProgress>) -> Self {
        Self {
            is_registered: progress.is_some(),
            progress_data: progress,
            loading: false,
            error: None,
        }
    }

    fn failed(error: &RegistrationError) -> Self {
        Self {
            is_registered: false,
            progress_data: None,
            loading: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Where registration state is read from.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// `Ok(None)` when the player has not registered for the hunt.
    async fn get_player_progress(
        &self,
        hunt_id: u64,
        player: &str,
    ) -> Result<Option<PlayerProgress>, RegistrationError>;

    /// Called once a registration transaction is confirmed.
    async fn record_registration(&self, _hunt_id: u64, _player: &str) {}
}

#[async_trait]
impl ProgressSource for HuntStore {
    async fn get_player_progress(
        &self,
        hunt_id: u64,
        player: &str,
    ) -> Result<Option<PlayerProgress>, RegistrationError> {
        db::get_progress(self.pool(), hunt_id, player)
            .await
            .map_err(|e| RegistrationError::from_query_failure(&e.to_string()))
    }

    async fn record_registration(&self, hunt_id: u64, player: &str) {
        if let Err(e) = db::insert_progress(self.pool(), hunt_id, player).await {
            warn!("Failed to record progress for {hunt_id}:{player}: {e}");
        }
    }
}

pub struct RegistrationService {
    cache: Arc<RegistrationCache>,
    retry: RetryPolicy,
    submitter: Arc<LedgerSubmitter>,
    progress: Arc<dyn ProgressSource>,
}

impl RegistrationService {
    pub fn new(
        cache: Arc<RegistrationCache>,
        retry: RetryPolicy,
        submitter: Arc<LedgerSubmitter>,
        progress: Arc<dyn ProgressSource>,
    ) -> Self {
        Self {
            cache,
            retry,
            submitter,
            progress,
        }
    }

    /// Registration status against the default progress source.
    pub async fn check_registration_status(&self, hunt_id: i64, player: &str) -> RegistrationStatus {
        self.check_registration_status_with(hunt_id, player, self.progress.as_ref())
            .await
    }

    /// Registration status for `(hunt_id, player)`, answered from the cache
    /// when a fresh entry exists and from `source` otherwise.
    pub async fn check_registration_status_with(
        &self,
        hunt_id: i64,
        player: &str,
        source: &dyn ProgressSource,
    ) -> RegistrationStatus {
        let (hunt_id, player) = match validate(hunt_id, player) {
            Ok(valid) => valid,
            Err(e) => return RegistrationStatus::failed(&e),
        };

        let key = CacheKey::new(hunt_id, player);
        if let Some(cached) = self.cache.get(&key).await {
            return cached;
        }

        debug!("Querying registration status for {key}");
        match self
            .retry
            .run(|| source.get_player_progress(hunt_id, player))
            .await
        {
            Ok(progress) => {
                let status = RegistrationStatus::from_progress(progress);
                self.cache.insert(key, status.clone()).await;
                status
            }
            Err(e) => {
                warn!("Registration status check for {key} failed: {e}");
                RegistrationStatus::failed(&e)
            }
        }
    }

    /// Drop the cached status for one `(hunt_id, player)` pair.
    pub async fn clear_registration_cache(&self, hunt_id: u64, player: &str) {
        self.cache
            .invalidate(&CacheKey::new(hunt_id, player.trim()))
            .await;
    }

    /// Register `player` for `hunt_id` through the connected wallet.
    pub async fn register_player(&self, hunt_id: i64, player: &str) -> RegistrationResult {
        match self.try_register(hunt_id, player).await {
            Ok(hash) => RegistrationResult {
                success: true,
                transaction_hash: Some(hash),
                error: None,
                code: None,
            },
            Err(e) => {
                warn!("Registration for hunt {hunt_id} failed ({}): {e}", e.code());
                RegistrationResult {
                    success: false,
                    transaction_hash: None,
                    error: Some(e.to_string()),
                    code: Some(e.code()),
                }
            }
        }
    }

    async fn try_register(&self, hunt_id: i64, player: &str) -> Result<String, RegistrationError> {
        let (hunt_id, player) = validate(hunt_id, player)?;

        if !self.submitter.wallet_available() {
            return Err(RegistrationError::WalletNotFound);
        }

        let action = HuntAction::RegisterPlayer {
            hunt_id,
            player: player.to_string(),
        };
        let hash = self
            .retry
            .run(|| self.submitter.submit(&action, Some(player)))
            .await?;

        // The progress row must exist before the cache entry is dropped.
        self.progress.record_registration(hunt_id, player).await;
        self.clear_registration_cache(hunt_id, player).await;
        info!("Player {player} registered for hunt {hunt_id}: {hash}");
        Ok(hash)
    }
}

fn validate(hunt_id: i64, player: &str) -> Result<(u64, &str), RegistrationError> {
    Ok((validate_hunt_id(hunt_id)?, validate_player_address(player)?))
}
