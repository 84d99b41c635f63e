//! In-memory registration status cache.
//!
//! Entries are keyed by `(hunt_id, player)` and expire after a fixed TTL
//! measured against an injected [`Clock`]. The cache is advisory: a stale or
//! missing entry only costs a redundant query, so concurrent readers may see
//! either side of a racing write.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::Clock;
use crate::registration::RegistrationStatus;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hunt_id: u64,
    pub player: String,
}

impl CacheKey {
    pub fn new(hunt_id: u64, player: &str) -> Self {
        Self {
            hunt_id,
            player: player.to_string(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.hunt_id, self.player)
    }
}

#[derive(Debug, Clone)]
struct CachedStatus {
    status: RegistrationStatus,
    stored_at_ms: u64,
}

pub struct RegistrationCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, CachedStatus>>,
}

impl RegistrationCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached status if it is younger than the TTL.
    pub async fn get(&self, key: &CacheKey) -> Option<RegistrationStatus> {
        let now = self.clock.now_millis();
        let entries = self.entries.read().await;
        let cached = entries.get(key)?;
        if now.saturating_sub(cached.stored_at_ms) < self.ttl.as_millis() as u64 {
            debug!("Registration cache hit for {key}");
            Some(cached.status.clone())
        } else {
            debug!("Registration cache entry for {key} expired");
            None
        }
    }

    pub async fn insert(&self, key: CacheKey, status: RegistrationStatus) {
        let stored_at_ms = self.clock.now_millis();
        self.entries.write().await.insert(
            key,
            CachedStatus {
                status,
                stored_at_ms,
            },
        );
    }

    /// Drop a single entry. Returns whether one was present.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            debug!("Registration cache entry for {key} invalidated");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const PLAYER: &str = "GXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX";

    fn registered() -> RegistrationStatus {
        RegistrationStatus {
            is_registered: true,
            progress_data: None,
            loading: false,
            error: None,
        }
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = RegistrationCache::new(DEFAULT_TTL, clock.clone());
        let key = CacheKey::new(7, PLAYER);

        cache.insert(key.clone(), registered()).await;
        clock.advance(DEFAULT_TTL - Duration::from_millis(1));
        assert_eq!(cache.get(&key).await, Some(registered()));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache = RegistrationCache::new(DEFAULT_TTL, Arc::new(ManualClock::new(0)));
        cache.insert(CacheKey::new(1, PLAYER), registered()).await;

        assert!(cache.get(&CacheKey::new(2, PLAYER)).await.is_none());
        assert!(cache.get(&CacheKey::new(1, "GOTHER")).await.is_none());
        assert!(cache.get(&CacheKey::new(1, PLAYER)).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_removes_only_its_key() {
        let cache = RegistrationCache::new(DEFAULT_TTL, Arc::new(ManualClock::new(0)));
        cache.insert(CacheKey::new(1, PLAYER), registered()).await;
        cache.insert(CacheKey::new(2, PLAYER), registered()).await;

        assert!(cache.invalidate(&CacheKey::new(1, PLAYER)).await);
        assert!(!cache.invalidate(&CacheKey::new(1, PLAYER)).await);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&CacheKey::new(2, PLAYER)).await.is_some());
    }

    #[test]
    fn key_renders_like_hunt_and_player() {
        assert_eq!(CacheKey::new(123, "GABC").to_string(), "123:GABC");
    }
}
