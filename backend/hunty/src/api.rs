//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::hunts::{ClueInput, CreateHuntRequest, HuntActionError, HuntClient};
use crate::registration::RegistrationService;
use crate::rpc::LedgerRpc;
use crate::store::{Hunt, HuntStatus, HuntStore};

#[derive(Clone)]
pub struct ApiState {
    pub store: HuntStore,
    pub hunts: Arc<HuntClient>,
    pub registration: Arc<RegistrationService>,
    pub rpc: Arc<dyn LedgerRpc>,
    pub clock: Arc<dyn Clock>,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Status reported by the RPC node, or `"unreachable"`.
    pub ledger: String,
}

#[derive(Serialize)]
pub struct HuntsResponse {
    pub count: usize,
    pub hunts: Vec<Hunt>,
}

/// Clue as shown to players; the answer never leaves the server.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClueView {
    pub id: u64,
    pub hunt_id: u64,
    pub question: String,
    pub points: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CluesResponse {
    pub hunt_id: u64,
    pub count: usize,
    pub clues: Vec<ClueView>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

#[derive(Deserialize)]
pub struct HuntsQuery {
    pub creator: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: HuntStatus,
}

#[derive(Deserialize)]
pub struct AddCluesRequest {
    pub clues: Vec<ClueInput>,
}

#[derive(Deserialize)]
pub struct AnswerCheck {
    pub answer: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub clue_id: u64,
    pub answer: String,
}

fn error_response(status: StatusCode, error: impl Into<String>, code: Option<&'static str>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code,
        }),
    )
        .into_response()
}

fn hunt_not_found(hunt_id: u64) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Hunt {hunt_id} not found"),
        Some("NOT_FOUND"),
    )
}

impl IntoResponse for HuntActionError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::AnswerIncorrect | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::InvalidState { .. } => StatusCode::CONFLICT,
            Self::HuntNotFound(_) | Self::ClueNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Submission(e) if e.is_retryable() => StatusCode::BAD_GATEWAY,
            Self::Submission(_) => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            warn!("Hunt action failed: {self}");
        }
        error_response(status, self.to_string(), Some(self.code()))
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let ledger = match state.rpc.get_health().await {
        Ok(status) => status,
        Err(e) => {
            warn!("RPC health check failed: {e}");
            "unreachable".to_string()
        }
    };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ledger,
    })
}

/// `GET /hunts[?creator=G...]`
///
/// Statuses are reported with elapsed hunts shown as completed.
pub async fn list_hunts(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HuntsQuery>,
) -> impl IntoResponse {
    let hunts = match query.creator {
        Some(creator) => state.store.get_hunts_by_creator(&creator).await,
        None => state.store.get_all_hunts().await,
    };
    let now = state.clock.now_secs();
    let hunts: Vec<Hunt> = hunts
        .into_iter()
        .map(|mut hunt| {
            hunt.status = hunt.effective_status(now);
            hunt
        })
        .collect();
    Json(HuntsResponse {
        count: hunts.len(),
        hunts,
    })
}

/// `POST /hunts`
pub async fn create_hunt(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateHuntRequest>,
) -> Response {
    match state.hunts.create_hunt(req).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /hunts/:id`
pub async fn get_hunt(State(state): State<Arc<ApiState>>, Path(hunt_id): Path<u64>) -> Response {
    match state.store.get_hunt_by_id(hunt_id).await {
        Some(mut hunt) => {
            hunt.status = hunt.effective_status(state.clock.now_secs());
            Json(hunt).into_response()
        }
        None => hunt_not_found(hunt_id),
    }
}

/// `PUT /hunts/:id/status`
///
/// Local override; no ledger transaction and no transition rules.
pub async fn set_hunt_status(
    State(state): State<Arc<ApiState>>,
    Path(hunt_id): Path<u64>,
    Json(update): Json<StatusUpdate>,
) -> Response {
    match state.store.update_hunt_status(hunt_id, update.status).await {
        Ok(true) => match state.store.get_hunt_by_id(hunt_id).await {
            Some(hunt) => Json(hunt).into_response(),
            None => hunt_not_found(hunt_id),
        },
        Ok(false) => hunt_not_found(hunt_id),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None),
    }
}

/// `POST /hunts/:id/activate`
pub async fn activate_hunt(State(state): State<Arc<ApiState>>, Path(hunt_id): Path<u64>) -> Response {
    match state.hunts.activate_hunt(hunt_id).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /hunts/:id/cancel`
pub async fn cancel_hunt(State(state): State<Arc<ApiState>>, Path(hunt_id): Path<u64>) -> Response {
    match state.hunts.cancel_hunt(hunt_id).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /hunts/:id/clues`
pub async fn list_clues(State(state): State<Arc<ApiState>>, Path(hunt_id): Path<u64>) -> Response {
    if state.store.get_hunt_by_id(hunt_id).await.is_none() {
        return hunt_not_found(hunt_id);
    }
    let clues: Vec<ClueView> = state
        .store
        .get_clues_for_hunt(hunt_id)
        .await
        .into_iter()
        .map(|c| ClueView {
            id: c.id,
            hunt_id: c.hunt_id,
            question: c.question,
            points: c.points,
        })
        .collect();
    Json(CluesResponse {
        hunt_id,
        count: clues.len(),
        clues,
    })
    .into_response()
}

/// `POST /hunts/:id/clues`
pub async fn add_clues(
    State(state): State<Arc<ApiState>>,
    Path(hunt_id): Path<u64>,
    Json(req): Json<AddCluesRequest>,
) -> Response {
    match state.hunts.add_clues(hunt_id, req.clues).await {
        Ok(added) => (StatusCode::CREATED, Json(added)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /hunts/:id/clues/:clue_id/check`
///
/// Off-ledger answer check against the stored clue.
pub async fn check_answer(
    State(state): State<Arc<ApiState>>,
    Path((hunt_id, clue_id)): Path<(u64, u64)>,
    Json(body): Json<AnswerCheck>,
) -> Response {
    match state.store.get_clue(hunt_id, clue_id).await {
        Some(clue) => Json(serde_json::json!({ "correct": clue.check_answer(&body.answer) }))
            .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Clue {clue_id} not found in hunt {hunt_id}"),
            Some("NOT_FOUND"),
        ),
    }
}

/// `POST /hunts/:id/answers`
pub async fn submit_answer(
    State(state): State<Arc<ApiState>>,
    Path(hunt_id): Path<u64>,
    Json(body): Json<AnswerSubmission>,
) -> Response {
    match state
        .hunts
        .submit_answer(hunt_id, body.clue_id, &body.answer)
        .await
    {
        Ok(accepted) => Json(accepted).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Non-integer ids become `0`, which the hunt-id check rejects.
fn parse_hunt_id(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

/// `GET /hunts/:id/players/:address/registration`
///
/// Always `200`; failures are carried in the status body's `error` field.
pub async fn registration_status(
    State(state): State<Arc<ApiState>>,
    Path((hunt_id, player)): Path<(String, String)>,
) -> impl IntoResponse {
    Json(
        state
            .registration
            .check_registration_status(parse_hunt_id(&hunt_id), &player)
            .await,
    )
}

/// `POST /hunts/:id/players/:address/registration`
pub async fn register_player(
    State(state): State<Arc<ApiState>>,
    Path((hunt_id, player)): Path<(String, String)>,
) -> impl IntoResponse {
    let result = state
        .registration
        .register_player(parse_hunt_id(&hunt_id), &player)
        .await;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(result))
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;
    use crate::cache::{RegistrationCache, DEFAULT_TTL};
    use crate::clock::ManualClock;
    use crate::db;
    use crate::ledger::testing::{submitter, MockRpc, MockWallet};
    use crate::retry::RetryPolicy;
    use crate::strkey;

    const NOW_MS: u64 = 1_700_000_000_000;

    fn player() -> String {
        strkey::encode_account_id(&[41u8; 32])
    }

    async fn state() -> Arc<ApiState> {
        let store = HuntStore::new(db::memory_pool().await);
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(NOW_MS));
        let rpc = Arc::new(MockRpc::with_account(&player()));
        let submitter = Arc::new(submitter(
            Some(Arc::new(MockWallet::connected(&player()))),
            rpc.clone(),
        ));
        Arc::new(ApiState {
            store: store.clone(),
            hunts: Arc::new(HuntClient::new(submitter.clone(), store.clone(), clock.clone())),
            registration: Arc::new(RegistrationService::new(
                Arc::new(RegistrationCache::new(DEFAULT_TTL, clock.clone())),
                RetryPolicy::default(),
                submitter,
                Arc::new(store),
            )),
            rpc,
            clock,
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ledger_status() {
        let response = health(State(state().await)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["ledger"], "healthy");
    }

    #[tokio::test]
    async fn elapsed_hunts_list_as_completed() {
        let state = state().await;
        let mut hunt = state.store.get_hunt_by_id(1).await.unwrap();
        hunt.id = 9;
        hunt.end_time = Some(NOW_MS / 1000 - 1);
        state.store.add_hunt(hunt).await.unwrap();

        let response = get_hunt(State(state.clone()), Path(9)).await;
        assert_eq!(body_json(response).await["status"], "Completed");
        // Stored status is unchanged.
        assert_eq!(state.store.get_hunt_by_id(9).await.unwrap().status, HuntStatus::Active);
    }

    #[tokio::test]
    async fn unknown_hunt_is_404() {
        let response = get_hunt(State(state().await), Path(404)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn clue_listing_hides_answers() {
        let state = state().await;
        let response = add_clues(
            State(state.clone()),
            Path(4),
            Json(AddCluesRequest {
                clues: vec![ClueInput {
                    question: "Tallest tower?".to_string(),
                    answer: "Spire".to_string(),
                    points: 20,
                }],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(list_clues(State(state.clone()), Path(4)).await).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["clues"][0]["question"], "Tallest tower?");
        assert!(body["clues"][0].get("answer").is_none());

        let check = check_answer(
            State(state),
            Path((4, 1)),
            Json(AnswerCheck {
                answer: " spire".to_string(),
            }),
        )
        .await;
        assert_eq!(body_json(check).await["correct"], true);
    }

    #[tokio::test]
    async fn invalid_transition_is_conflict() {
        let response = activate_hunt(State(state().await), Path(1)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["code"], "INVALID_STATE");
    }

    #[tokio::test]
    async fn registration_round_trip() {
        let state = state().await;
        let status = registration_status(State(state.clone()), Path(("2".to_string(), player())))
            .await
            .into_response();
        assert_eq!(body_json(status).await["isRegistered"], false);

        let registered = register_player(State(state.clone()), Path(("2".to_string(), player())))
            .await
            .into_response();
        assert_eq!(registered.status(), StatusCode::OK);
        assert_eq!(body_json(registered).await["transactionHash"], "txhash");

        let status = registration_status(State(state), Path(("2".to_string(), player())))
            .await
            .into_response();
        let body = body_json(status).await;
        assert_eq!(body["isRegistered"], true);
        assert_eq!(body["progressData"]["hunt_id"], 2);
    }

    #[tokio::test]
    async fn invalid_registration_input_is_unprocessable() {
        let response = register_player(State(state().await), Path(("0".to_string(), player())))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], "INVALID_HUNT_ID");
    }

    #[tokio::test]
    async fn non_integer_hunt_id_still_yields_a_status_body() {
        let state = state().await;
        for raw in ["abc", "1.5", ""] {
            let response =
                registration_status(State(state.clone()), Path((raw.to_string(), player())))
                    .await
                    .into_response();
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            assert_eq!(body["isRegistered"], false);
            assert!(body["error"].as_str().unwrap().contains("Invalid hunt ID"));
        }

        let response = register_player(State(state), Path(("abc".to_string(), player())))
            .await
            .into_response();
        assert_eq!(body_json(response).await["code"], "INVALID_HUNT_ID");
    }
}
