//! Local hunt / clue store, standing in for a future indexer.
//!
//! Hunts and clues are kept as two JSON documents (`hunty_hunts`,
//! `hunty_clues`). Reads never fail: a missing or unparseable document falls
//! back to the built-in seed data. Saving a clue rewrites both documents in
//! one transaction so the clue list and the parent's `cluesCount` cannot
//! drift apart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::actions::normalize_answer;
use crate::db;
use crate::errors::{HuntyError, Result};

pub const HUNTS_KEY: &str = "hunty_hunts";
pub const CLUES_KEY: &str = "hunty_clues";

const SEED_CREATOR: &str = "GDEMO_CREATOR_ADDRESS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HuntStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl HuntStatus {
    /// Transitions the on-chain flows allow. The store itself does not
    /// enforce these.
    pub fn can_transition_to(self, next: HuntStatus) -> bool {
        use HuntStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Draft, Cancelled) | (Active, Cancelled) | (Active, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, HuntStatus::Completed | HuntStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunt {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub clues_count: u32,
    pub status: HuntStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    /// Creator wallet address; used to list "my hunts".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_address: Option<String>,
}

impl Hunt {
    /// Status with the implicit `Completed` transition applied: an active
    /// hunt whose end time has passed is over.
    pub fn effective_status(&self, now_secs: u64) -> HuntStatus {
        match (self.status, self.end_time) {
            (HuntStatus::Active, Some(end)) if now_secs >= end => HuntStatus::Completed,
            (status, _) => status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clue {
    pub id: u64,
    pub hunt_id: u64,
    pub question: String,
    /// Stored trimmed and lowercased.
    pub answer: String,
    pub points: u32,
}

impl Clue {
    pub fn check_answer(&self, candidate: &str) -> bool {
        normalize_answer(candidate) == self.answer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClue {
    pub hunt_id: u64,
    pub question: String,
    pub answer: String,
    pub points: u32,
}

fn seed_hunts() -> Vec<Hunt> {
    let hunt = |id, title: &str, description: &str, clues_count, status| Hunt {
        id,
        title: title.to_string(),
        description: description.to_string(),
        clues_count,
        status,
        start_time: None,
        end_time: None,
        creator_address: Some(SEED_CREATOR.to_string()),
    };
    vec![
        hunt(
            1,
            "City Secrets",
            "Race across town to uncover hidden murals and landmarks.",
            5,
            HuntStatus::Active,
        ),
        hunt(
            2,
            "Campus Quest",
            "Solve riddles scattered around campus before the timer ends.",
            7,
            HuntStatus::Active,
        ),
        hunt(
            3,
            "Office Onboarding Hunt",
            "A playful intro game for new teammates around the office.",
            4,
            HuntStatus::Completed,
        ),
        hunt(
            4,
            "Summer Treasure Hunt",
            "Find hidden clues in the park.",
            3,
            HuntStatus::Draft,
        ),
        hunt(
            5,
            "Museum Mystery",
            "Discover art and history through clues.",
            0,
            HuntStatus::Draft,
        ),
    ]
}

fn parse_or_seed<T, F>(key: &str, raw: Option<String>, seed: F) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
    F: FnOnce() -> Vec<T>,
{
    match raw {
        None => seed(),
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Stored {key} document is unreadable, using seed data: {e}");
            seed()
        }),
    }
}

/// Cheap to clone; clones share the pool and the write lock.
#[derive(Clone)]
pub struct HuntStore {
    pool: SqlitePool,
    /// Serialises read-modify-write cycles on the documents. Reads skip it.
    write_lock: Arc<Mutex<()>>,
}

impl HuntStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn read_hunts(&self) -> Vec<Hunt> {
        let raw = db::kv_get(&self.pool, HUNTS_KEY).await.unwrap_or_else(|e| {
            warn!("Failed to read {HUNTS_KEY}: {e}");
            None
        });
        parse_or_seed(HUNTS_KEY, raw, seed_hunts)
    }

    async fn read_clues(&self) -> Vec<Clue> {
        let raw = db::kv_get(&self.pool, CLUES_KEY).await.unwrap_or_else(|e| {
            warn!("Failed to read {CLUES_KEY}: {e}");
            None
        });
        parse_or_seed(CLUES_KEY, raw, Vec::new)
    }

    /// Run `edit` against the hunts document inside one transaction while
    /// holding the write lock. The document is written back only when
    /// `edit` reports a change. Database errors abort without writing.
    async fn modify_hunts<R, F>(&self, edit: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<Hunt>) -> (R, bool),
    {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut hunts = parse_or_seed(HUNTS_KEY, db::kv_get(&mut *tx, HUNTS_KEY).await?, seed_hunts);
        let (result, changed) = edit(&mut hunts);
        if changed {
            db::kv_put(&mut *tx, HUNTS_KEY, &serde_json::to_string(&hunts)?).await?;
            tx.commit().await?;
        }
        Ok(result)
    }

    // ─────────────────────────────────────────────────────
    // Hunts
    // ─────────────────────────────────────────────────────

    pub async fn get_all_hunts(&self) -> Vec<Hunt> {
        self.read_hunts().await
    }

    /// Hunts created by `creator`. An empty address matches nothing.
    pub async fn get_hunts_by_creator(&self, creator: &str) -> Vec<Hunt> {
        if creator.trim().is_empty() {
            return Vec::new();
        }
        self.read_hunts()
            .await
            .into_iter()
            .filter(|h| h.creator_address.as_deref() == Some(creator))
            .collect()
    }

    pub async fn get_hunt_by_id(&self, hunt_id: u64) -> Option<Hunt> {
        self.read_hunts().await.into_iter().find(|h| h.id == hunt_id)
    }

    /// Overwrite the status of `hunt_id`. No transition rules are applied
    /// here; see [`HuntStatus::can_transition_to`]. Returns whether the hunt exists.
    pub async fn update_hunt_status(&self, hunt_id: u64, status: HuntStatus) -> Result<bool> {
        let found = self
            .modify_hunts(|hunts| match hunts.iter_mut().find(|h| h.id == hunt_id) {
                None => (false, false),
                Some(hunt) if hunt.status == status => (true, false),
                Some(hunt) => {
                    hunt.status = status;
                    (true, true)
                }
            })
            .await?;
        if found {
            info!("Hunt {hunt_id} status → {status:?}");
        }
        Ok(found)
    }

    /// Append `hunt` unless one with the same id exists. Returns whether it was added.
    pub async fn add_hunt(&self, hunt: Hunt) -> Result<bool> {
        let (id, title) = (hunt.id, hunt.title.clone());
        let added = self
            .modify_hunts(move |hunts| {
                if hunts.iter().any(|h| h.id == hunt.id) {
                    return (false, false);
                }
                hunts.push(hunt);
                (true, true)
            })
            .await?;
        if added {
            info!("Hunt {id} added: {title}");
        }
        Ok(added)
    }

    /// Append `hunt` under the next free id (max existing id + 1) and
    /// return it as stored.
    pub async fn add_hunt_with_next_id(&self, mut hunt: Hunt) -> Result<Hunt> {
        let stored = self
            .modify_hunts(move |hunts| {
                hunt.id = hunts.iter().map(|h| h.id).max().map_or(1, |max| max + 1);
                hunts.push(hunt.clone());
                (hunt, true)
            })
            .await?;
        info!("Hunt {} added: {}", stored.id, stored.title);
        Ok(stored)
    }

    // ─────────────────────────────────────────────────────
    // Clues
    // ─────────────────────────────────────────────────────

    pub async fn get_clues_for_hunt(&self, hunt_id: u64) -> Vec<Clue> {
        self.read_clues()
            .await
            .into_iter()
            .filter(|c| c.hunt_id == hunt_id)
            .collect()
    }

    pub async fn get_clue(&self, hunt_id: u64, clue_id: u64) -> Option<Clue> {
        self.read_clues()
            .await
            .into_iter()
            .find(|c| c.hunt_id == hunt_id && c.id == clue_id)
    }

    /// Append a clue with the next free id and bump the parent's clue count.
    /// Both documents are rewritten in a single transaction.
    pub async fn save_clue(&self, clue: NewClue) -> Result<Clue> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut hunts = parse_or_seed(
            HUNTS_KEY,
            db::kv_get(&mut *tx, HUNTS_KEY).await?,
            seed_hunts,
        );
        let mut clues: Vec<Clue> =
            parse_or_seed(CLUES_KEY, db::kv_get(&mut *tx, CLUES_KEY).await?, Vec::new);

        let parent = hunts
            .iter_mut()
            .find(|h| h.id == clue.hunt_id)
            .ok_or(HuntyError::HuntNotFound(clue.hunt_id))?;
        parent.clues_count += 1;

        let saved = Clue {
            id: clues.iter().map(|c| c.id).max().map_or(1, |max| max + 1),
            hunt_id: clue.hunt_id,
            question: clue.question.trim().to_string(),
            answer: normalize_answer(&clue.answer),
            points: clue.points,
        };
        clues.push(saved.clone());

        db::kv_put(&mut *tx, CLUES_KEY, &serde_json::to_string(&clues)?).await?;
        db::kv_put(&mut *tx, HUNTS_KEY, &serde_json::to_string(&hunts)?).await?;
        tx.commit().await?;

        info!("Clue {} saved for hunt {}", saved.id, saved.hunt_id);
        Ok(saved)
    }
}
