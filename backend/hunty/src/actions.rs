//! Typed on-chain payloads for every hunt action.
//!
//! Each action serializes to `{"action": "<name>", ...fields}` and is stored in
//! one or more `ManageData` entries named `<name>:<timestamp_ms>`. Payloads
//! longer than a single entry allows are split across numbered entries
//! (`<name>:<timestamp_ms>:<n>`). The schema is provisional until the hunt
//! contract exposes direct invocations.

use serde::{Deserialize, Serialize};

use crate::errors::{HuntyError, Result};
use crate::xdr::{ManageDataOp, MANAGE_DATA_MAX_LEN, MAX_OPERATIONS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HuntAction {
    CreateHunt {
        creator: String,
        title: String,
        description: String,
        start_time: u64,
        end_time: u64,
    },
    ActivateHunt {
        hunt_id: u64,
    },
    AddClue {
        hunt_id: u64,
        question: String,
        /// Already trimmed and lowercased.
        answer: String,
        points: u32,
    },
    SubmitAnswer {
        hunt_id: u64,
        clue_id: u64,
        /// Already trimmed and lowercased.
        answer: String,
    },
    CancelHunt {
        hunt_id: u64,
    },
    RegisterPlayer {
        hunt_id: u64,
        player: String,
    },
}

impl HuntAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateHunt { .. } => "create_hunt",
            Self::ActivateHunt { .. } => "activate_hunt",
            Self::AddClue { .. } => "add_clue",
            Self::SubmitAnswer { .. } => "submit_answer",
            Self::CancelHunt { .. } => "cancel_hunt",
            Self::RegisterPlayer { .. } => "register_player",
        }
    }

    /// Data entry key for a payload written at `timestamp_ms`.
    pub fn data_key(&self, timestamp_ms: u64) -> String {
        format!("{}:{timestamp_ms}", self.name())
    }

    /// Split the JSON payload into `ManageData` operations.
    pub fn to_operations(&self, timestamp_ms: u64) -> Result<Vec<ManageDataOp>> {
        let payload = serde_json::to_vec(self)?;
        let key = self.data_key(timestamp_ms);

        if payload.len() <= MANAGE_DATA_MAX_LEN {
            return Ok(vec![ManageDataOp {
                name: key,
                value: Some(payload),
            }]);
        }

        let chunks: Vec<&[u8]> = payload.chunks(MANAGE_DATA_MAX_LEN).collect();
        if chunks.len() > MAX_OPERATIONS {
            return Err(HuntyError::Xdr(format!(
                "{} payload is {} bytes, too large for one transaction",
                self.name(),
                payload.len()
            )));
        }

        Ok(chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| ManageDataOp {
                name: format!("{key}:{i}"),
                value: Some(chunk.to_vec()),
            })
            .collect())
    }
}

/// Canonical form used for answers before hashing, storage, or comparison.
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_tagged_with_action_name() {
        let action = HuntAction::RegisterPlayer {
            hunt_id: 3,
            player: "GABC".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "action": "register_player", "hunt_id": 3, "player": "GABC" })
        );
        assert_eq!(action.data_key(1_700_000_000_000), "register_player:1700000000000");
    }

    #[test]
    fn small_payload_fits_one_entry() {
        let ops = HuntAction::ActivateHunt { hunt_id: 9 }
            .to_operations(5)
            .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "activate_hunt:5");
        assert_eq!(
            ops[0].value.as_deref(),
            Some(br#"{"action":"activate_hunt","hunt_id":9}"#.as_slice())
        );
    }

    #[test]
    fn large_payload_is_chunked_and_reassembles() {
        let action = HuntAction::CreateHunt {
            creator: "G".repeat(56),
            title: "City Secrets".to_string(),
            description: "Race across town to uncover hidden murals and landmarks.".to_string(),
            start_time: 1_700_000_000,
            end_time: 1_700_086_400,
        };
        let ops = action.to_operations(42).unwrap();
        assert!(ops.len() > 1);
        assert_eq!(ops[0].name, "create_hunt:42:0");
        assert!(ops
            .iter()
            .all(|op| op.value.as_ref().unwrap().len() <= MANAGE_DATA_MAX_LEN));

        let joined: Vec<u8> = ops
            .iter()
            .flat_map(|op| op.value.clone().unwrap())
            .collect();
        let decoded: HuntAction = serde_json::from_slice(&joined).unwrap();
        assert_eq!(decoded, action);
    }

    #[test]
    fn answers_are_trimmed_and_lowercased() {
        assert_eq!(normalize_answer("  The Old Oak \n"), "the old oak");
    }
}
