//! Creator and player hunt actions.
//!
//! Each action submits one transaction through the shared
//! [`LedgerSubmitter`] and mirrors the confirmed result into the local
//! [`HuntStore`]. Status transitions are checked here, before anything is
//! signed; the store itself accepts any status.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::actions::{normalize_answer, HuntAction};
use crate::clock::Clock;
use crate::errors::{HuntyError, RegistrationError};
use crate::ledger::LedgerSubmitter;
use crate::store::{Clue, Hunt, HuntStatus, HuntStore, NewClue};
use crate::validation::validate_player_address;

pub const CLUE_COMPLETED_EVENT: &str = "ClueCompleted";

#[derive(Debug, Error)]
pub enum HuntActionError {
    #[error("Incorrect answer. Please try again.")]
    AnswerIncorrect,

    #[error("Hunt {hunt_id} is {status:?} and cannot {action}")]
    InvalidState {
        hunt_id: u64,
        status: HuntStatus,
        action: &'static str,
    },

    #[error("{0}")]
    InvalidInput(String),

    #[error("Hunt {0} not found")]
    HuntNotFound(u64),

    #[error("Clue {clue_id} not found in hunt {hunt_id}")]
    ClueNotFound { hunt_id: u64, clue_id: u64 },

    #[error(transparent)]
    Store(#[from] HuntyError),

    #[error(transparent)]
    Submission(#[from] RegistrationError),
}

impl HuntActionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AnswerIncorrect => "ANSWER_INCORRECT",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::HuntNotFound(_) | Self::ClueNotFound { .. } => "NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
            Self::Submission(e) => e.code(),
        }
    }
}

/// Contract rejections for a wrong answer surface only in the submission detail.
fn is_answer_rejection(err: &RegistrationError) -> bool {
    match err {
        RegistrationError::SubmissionFailed { detail } => {
            let detail = detail.to_lowercase();
            ["answerincorrect", "answer_incorrect", "wrong answer"]
                .iter()
                .any(|marker| detail.contains(marker))
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHuntRequest {
    pub creator: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: u64,
    pub end_time: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClueInput {
    pub question: String,
    pub answer: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReceipt {
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedHunt {
    pub tx_hash: String,
    pub hunt: Hunt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedClues {
    pub tx_hashes: Vec<String>,
    pub clues: Vec<Clue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerAccepted {
    pub tx_hash: String,
    pub event: &'static str,
}

pub struct HuntClient {
    submitter: Arc<LedgerSubmitter>,
    store: HuntStore,
    clock: Arc<dyn Clock>,
}

impl HuntClient {
    pub fn new(submitter: Arc<LedgerSubmitter>, store: HuntStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            submitter,
            store,
            clock,
        }
    }

    pub async fn create_hunt(&self, req: CreateHuntRequest) -> Result<CreatedHunt, HuntActionError> {
        let creator = validate_player_address(&req.creator)?;
        let title = req.title.trim();
        if title.is_empty() {
            return Err(HuntActionError::InvalidInput("Hunt title is required".into()));
        }
        if req.end_time <= req.start_time {
            return Err(HuntActionError::InvalidInput(
                "End time must be after start time".into(),
            ));
        }

        let action = HuntAction::CreateHunt {
            creator: creator.to_string(),
            title: title.to_string(),
            description: req.description.clone(),
            start_time: req.start_time,
            end_time: req.end_time,
        };
        let tx_hash = self.submitter.submit(&action, Some(creator)).await?;

        let hunt = Hunt {
            id: 0,
            title: title.to_string(),
            description: req.description,
            clues_count: 0,
            status: HuntStatus::Draft,
            start_time: Some(req.start_time),
            end_time: Some(req.end_time),
            creator_address: Some(creator.to_string()),
        };
        let hunt = self.store.add_hunt_with_next_id(hunt).await?;

        info!("Hunt {} created by {creator}: {tx_hash}", hunt.id);
        Ok(CreatedHunt { tx_hash, hunt })
    }

    pub async fn activate_hunt(&self, hunt_id: u64) -> Result<ActionReceipt, HuntActionError> {
        self.transition(hunt_id, HuntStatus::Active, "be activated", HuntAction::ActivateHunt { hunt_id })
            .await
    }

    pub async fn cancel_hunt(&self, hunt_id: u64) -> Result<ActionReceipt, HuntActionError> {
        self.transition(hunt_id, HuntStatus::Cancelled, "be cancelled", HuntAction::CancelHunt { hunt_id })
            .await
    }

    async fn transition(
        &self,
        hunt_id: u64,
        next: HuntStatus,
        action_label: &'static str,
        action: HuntAction,
    ) -> Result<ActionReceipt, HuntActionError> {
        let hunt = self.hunt(hunt_id).await?;
        let status = hunt.effective_status(self.clock.now_secs());
        if !status.can_transition_to(next) {
            return Err(HuntActionError::InvalidState {
                hunt_id,
                status,
                action: action_label,
            });
        }

        let tx_hash = self.submitter.submit(&action, None).await?;
        self.store.update_hunt_status(hunt_id, next).await?;
        Ok(ActionReceipt { tx_hash })
    }

    /// Submit one `add_clue` transaction per clue, in order, saving each
    /// locally once confirmed. Stops at the first failure; clues confirmed
    /// before it stay saved.
    pub async fn add_clues(
        &self,
        hunt_id: u64,
        clues: Vec<ClueInput>,
    ) -> Result<AddedClues, HuntActionError> {
        let hunt = self.hunt(hunt_id).await?;
        if hunt.status != HuntStatus::Draft {
            return Err(HuntActionError::InvalidState {
                hunt_id,
                status: hunt.status,
                action: "take new clues",
            });
        }
        if let Some(blank) = clues.iter().position(|c| c.question.trim().is_empty() || c.answer.trim().is_empty()) {
            return Err(HuntActionError::InvalidInput(format!(
                "Clue {} needs both a question and an answer",
                blank + 1
            )));
        }

        let mut added = AddedClues {
            tx_hashes: Vec::with_capacity(clues.len()),
            clues: Vec::with_capacity(clues.len()),
        };
        for clue in clues {
            let answer = normalize_answer(&clue.answer);
            let action = HuntAction::AddClue {
                hunt_id,
                question: clue.question.trim().to_string(),
                answer: answer.clone(),
                points: clue.points,
            };
            let tx_hash = self.submitter.submit(&action, None).await.map_err(|e| {
                warn!(
                    "add_clue for hunt {hunt_id} failed after {} confirmed: {e}",
                    added.clues.len()
                );
                e
            })?;

            let saved = self
                .store
                .save_clue(NewClue {
                    hunt_id,
                    question: clue.question,
                    answer,
                    points: clue.points,
                })
                .await?;
            added.tx_hashes.push(tx_hash);
            added.clues.push(saved);
        }
        Ok(added)
    }

    pub async fn submit_answer(
        &self,
        hunt_id: u64,
        clue_id: u64,
        answer: &str,
    ) -> Result<AnswerAccepted, HuntActionError> {
        let hunt = self.hunt(hunt_id).await?;
        let status = hunt.effective_status(self.clock.now_secs());
        if status != HuntStatus::Active {
            return Err(HuntActionError::InvalidState {
                hunt_id,
                status,
                action: "accept answers",
            });
        }
        let clue = self
            .store
            .get_clue(hunt_id, clue_id)
            .await
            .ok_or(HuntActionError::ClueNotFound { hunt_id, clue_id })?;
        if !clue.check_answer(answer) {
            return Err(HuntActionError::AnswerIncorrect);
        }

        let action = HuntAction::SubmitAnswer {
            hunt_id,
            clue_id,
            answer: normalize_answer(answer),
        };
        match self.submitter.submit(&action, None).await {
            Ok(tx_hash) => Ok(AnswerAccepted {
                tx_hash,
                event: CLUE_COMPLETED_EVENT,
            }),
            Err(e) if is_answer_rejection(&e) => Err(HuntActionError::AnswerIncorrect),
            Err(e) => Err(e.into()),
        }
    }

    async fn hunt(&self, hunt_id: u64) -> Result<Hunt, HuntActionError> {
        self.store
            .get_hunt_by_id(hunt_id)
            .await
            .ok_or(HuntActionError::HuntNotFound(hunt_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db;
    use crate::ledger::testing::{submitter, MockRpc, MockWallet};
    use crate::rpc::RpcFailure;
    use crate::strkey;

    const NOW_SECS: u64 = 1_700_000_000;

    struct Harness {
        client: HuntClient,
        store: HuntStore,
        wallet: Arc<MockWallet>,
        rpc: Arc<MockRpc>,
    }

    fn creator() -> String {
        strkey::encode_account_id(&[31u8; 32])
    }

    async fn harness(rpc: MockRpc) -> Harness {
        let store = HuntStore::new(db::memory_pool().await);
        let wallet = Arc::new(MockWallet::connected(&creator()));
        let rpc = Arc::new(rpc);
        let client = HuntClient::new(
            Arc::new(submitter(Some(wallet.clone()), rpc.clone())),
            store.clone(),
            Arc::new(ManualClock::new(NOW_SECS * 1000)),
        );
        Harness {
            client,
            store,
            wallet,
            rpc,
        }
    }

    fn request(title: &str, start_time: u64, end_time: u64) -> CreateHuntRequest {
        CreateHuntRequest {
            creator: creator(),
            title: title.to_string(),
            description: "Find the hidden plaques".to_string(),
            start_time,
            end_time,
        }
    }

    fn clue_input(question: &str, answer: &str) -> ClueInput {
        ClueInput {
            question: question.to_string(),
            answer: answer.to_string(),
            points: 10,
        }
    }

    #[tokio::test]
    async fn create_hunt_records_a_draft() {
        let h = harness(MockRpc::with_account(&creator())).await;
        let created = h
            .client
            .create_hunt(request("  Harbour Walk ", NOW_SECS, NOW_SECS + 3600))
            .await
            .unwrap();

        assert_eq!(created.tx_hash, "txhash");
        assert_eq!(created.hunt.id, 6);
        assert_eq!(created.hunt.title, "Harbour Walk");
        assert_eq!(created.hunt.status, HuntStatus::Draft);
        assert_eq!(h.store.get_hunt_by_id(6).await, Some(created.hunt));
        assert_eq!(h.store.get_hunts_by_creator(&creator()).await.len(), 1);
    }

    #[tokio::test]
    async fn create_hunt_rejects_bad_input_before_signing() {
        let h = harness(MockRpc::with_account(&creator())).await;
        for req in [request("   ", 1, 2), request("Walk", 10, 10), request("Walk", 10, 5)] {
            let err = h.client.create_hunt(req).await.unwrap_err();
            assert_eq!(err.code(), "INVALID_INPUT");
        }
        assert_eq!(h.wallet.sign_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.get_all_hunts().await.len(), 5);
    }

    #[tokio::test]
    async fn create_hunt_rejects_malformed_creator_before_wallet() {
        let h = harness(MockRpc::with_account(&creator())).await;
        for bad in ["", "GSHORT", "not-an-address"] {
            let mut req = request("Walk", 1, 2);
            req.creator = bad.to_string();
            let err = h.client.create_hunt(req).await.unwrap_err();
            assert_eq!(err.code(), "INVALID_PLAYER_ADDRESS");
        }
        assert_eq!(h.wallet.key_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.rpc.submits(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_are_all_stored() {
        let h = Arc::new(harness(MockRpc::with_account(&creator())).await);
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let h = h.clone();
                tokio::spawn(async move {
                    h.client
                        .create_hunt(request(&format!("Walk {i}"), 1, 2))
                        .await
                        .unwrap()
                        .hunt
                        .id
                })
            })
            .collect();
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();

        assert_eq!(ids, (6..12).collect::<Vec<u64>>());
        assert_eq!(h.store.get_hunts_by_creator(&creator()).await.len(), 6);
    }

    #[tokio::test]
    async fn create_hunt_requires_creator_wallet() {
        let h = harness(MockRpc::with_account(&creator())).await;
        let mut req = request("Walk", 1, 2);
        req.creator = strkey::encode_account_id(&[32u8; 32]);
        let err = h.client.create_hunt(req).await.unwrap_err();
        assert!(matches!(
            err,
            HuntActionError::Submission(RegistrationError::AddressMismatch)
        ));
        assert_eq!(h.rpc.submits(), 0);
    }

    #[tokio::test]
    async fn activate_only_from_draft() {
        let h = harness(MockRpc::with_account(&creator())).await;
        let receipt = h.client.activate_hunt(4).await.unwrap();
        assert_eq!(receipt.tx_hash, "txhash");
        assert_eq!(h.store.get_hunt_by_id(4).await.unwrap().status, HuntStatus::Active);

        let err = h.client.activate_hunt(4).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert_eq!(h.rpc.submits(), 1);
    }

    #[tokio::test]
    async fn cancel_from_draft_or_active_only() {
        let h = harness(MockRpc::with_account(&creator())).await;
        h.client.cancel_hunt(1).await.unwrap();
        h.client.cancel_hunt(4).await.unwrap();
        assert_eq!(h.store.get_hunt_by_id(1).await.unwrap().status, HuntStatus::Cancelled);

        let err = h.client.cancel_hunt(1).await.unwrap_err();
        assert!(matches!(
            err,
            HuntActionError::InvalidState {
                status: HuntStatus::Cancelled,
                ..
            }
        ));
        assert!(matches!(
            h.client.cancel_hunt(42).await.unwrap_err(),
            HuntActionError::HuntNotFound(42)
        ));
    }

    #[tokio::test]
    async fn failed_submission_leaves_status_untouched() {
        let rpc = MockRpc::with_account(&creator())
            .then_submit(Err(RpcFailure::Transport("reset".into())));
        let h = harness(rpc).await;
        let err = h.client.activate_hunt(4).await.unwrap_err();
        assert_eq!(err.code(), "SUBMISSION_FAILED");
        assert_eq!(h.store.get_hunt_by_id(4).await.unwrap().status, HuntStatus::Draft);
    }

    #[tokio::test]
    async fn add_clues_saves_each_confirmed_clue() {
        let h = harness(MockRpc::with_account(&creator())).await;
        let added = h
            .client
            .add_clues(
                4,
                vec![
                    clue_input("Oldest tree?", "  The Oak "),
                    clue_input("Bridge colour?", "Red"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(added.tx_hashes.len(), 2);
        assert_eq!(added.clues[0].answer, "the oak");
        assert_eq!(h.store.get_clues_for_hunt(4).await.len(), 2);
        assert_eq!(h.store.get_hunt_by_id(4).await.unwrap().clues_count, 5);
        assert_eq!(h.rpc.submits(), 2);
    }

    #[tokio::test]
    async fn add_clues_stops_at_first_failure() {
        let rpc = MockRpc::with_account(&creator())
            .then_submit(Ok(crate::rpc::SubmitResponse {
                status: "PENDING".to_string(),
                hash: Some("first".to_string()),
            }))
            .then_submit(Err(RpcFailure::Timeout("30s".into())));
        let h = harness(rpc).await;

        let err = h
            .client
            .add_clues(
                4,
                vec![clue_input("a", "1"), clue_input("b", "2"), clue_input("c", "3")],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRANSACTION_TIMEOUT");
        assert_eq!(h.rpc.submits(), 2);
        assert_eq!(h.store.get_clues_for_hunt(4).await.len(), 1);
    }

    #[tokio::test]
    async fn add_clues_requires_draft_hunt() {
        let h = harness(MockRpc::with_account(&creator())).await;
        let err = h
            .client
            .add_clues(1, vec![clue_input("a", "1")])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert_eq!(h.rpc.submits(), 0);
    }

    #[tokio::test]
    async fn correct_answer_completes_clue() {
        let h = harness(MockRpc::with_account(&creator())).await;
        let clue = h
            .store
            .save_clue(NewClue {
                hunt_id: 1,
                question: "Color of the door?".to_string(),
                answer: "Blue".to_string(),
                points: 5,
            })
            .await
            .unwrap();

        let accepted = h.client.submit_answer(1, clue.id, "  BLUE ").await.unwrap();
        assert_eq!(accepted.event, "ClueCompleted");
        assert_eq!(accepted.tx_hash, "txhash");

        let err = h.client.submit_answer(1, clue.id, "green").await.unwrap_err();
        assert!(matches!(err, HuntActionError::AnswerIncorrect));
        assert_eq!(h.rpc.submits(), 1);
    }

    #[tokio::test]
    async fn ledger_rejection_of_answer_is_reported_as_incorrect() {
        let rpc = MockRpc::with_account(&creator()).then_submit(Err(RpcFailure::Rejected {
            code: 0,
            message: "HostError: AnswerIncorrect".to_string(),
        }));
        let h = harness(rpc).await;
        let clue = h
            .store
            .save_clue(NewClue {
                hunt_id: 1,
                question: "q".to_string(),
                answer: "a".to_string(),
                points: 1,
            })
            .await
            .unwrap();

        let err = h.client.submit_answer(1, clue.id, "a").await.unwrap_err();
        assert_eq!(err.code(), "ANSWER_INCORRECT");
    }

    #[tokio::test]
    async fn answers_need_an_active_hunt_and_known_clue() {
        let h = harness(MockRpc::with_account(&creator())).await;
        assert_eq!(
            h.client.submit_answer(4, 1, "x").await.unwrap_err().code(),
            "INVALID_STATE"
        );
        assert!(matches!(
            h.client.submit_answer(1, 99, "x").await.unwrap_err(),
            HuntActionError::ClueNotFound { hunt_id: 1, clue_id: 99 }
        ));
    }

    #[test]
    fn answer_rejection_markers() {
        for detail in ["AnswerIncorrect", "err: answer_incorrect", "Wrong answer given"] {
            assert!(is_answer_rejection(&RegistrationError::SubmissionFailed {
                detail: detail.to_string()
            }));
        }
        assert!(!is_answer_rejection(&RegistrationError::SubmissionFailed {
            detail: "tx_bad_seq".to_string()
        }));
        assert!(!is_answer_rejection(&RegistrationError::TransactionTimeout));
    }
}
