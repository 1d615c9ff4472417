use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use songbattle_core::protocol::{
    AffinityEntry, BattleQuery, BattleResponse, ErrorBody, LeaderboardEntry, OutcomeRequest,
    OutcomeResponse, SongCard,
};
use songbattle_core::{BattleError, RatingStore, SongId, matchmaker, outcome, ranking};

use crate::state::AppState;

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Battle(BattleError),
    NotFound(String),
    /// A request that failed to extract, keeping the extractor's status.
    Rejected(StatusCode, String),
}

impl From<BattleError> for ApiError {
    fn from(err: BattleError) -> Self {
        ApiError::Battle(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Battle(err) if err.is_client_error() => {
                warn!(error = %err, "rejected request");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Battle(err) => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Rejected(status, message) => {
                warn!(%status, error = %message, "malformed request");
                (status, message)
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

fn require_session(session: &str) -> Result<&str, ApiError> {
    let session = session.trim();
    if session.is_empty() {
        return Err(BattleError::invalid("missing session").into());
    }
    Ok(session)
}

// ── Health ──────────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ── Battle ──────────────────────────────────────────────────────────────

pub async fn battle<S: RatingStore>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<BattleQuery>, QueryRejection>,
) -> Result<Json<BattleResponse>, ApiError> {
    let Query(query) = query?;
    let session = require_session(&query.session)?;
    let _guard = state.lock_session(session).await;

    let battle = matchmaker::next_battle(&state.store, &state.catalog, &state.config, session).await?;
    Ok(Json(battle))
}

// ── Outcome ─────────────────────────────────────────────────────────────

pub async fn record_outcome<S: RatingStore>(
    State(state): State<Arc<AppState<S>>>,
    req: Result<Json<OutcomeRequest>, JsonRejection>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let Json(req) = req?;
    let session = require_session(&req.session)?;
    let _guard = state.lock_session(session).await;

    let result = outcome::record_outcome(
        &state.store,
        &state.catalog,
        &state.config,
        session,
        req.winner_id,
        req.loser_id,
    )
    .await?;
    Ok(Json(result))
}

// ── Rankings ────────────────────────────────────────────────────────────

pub async fn leaderboard<S: RatingStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let ratings = state.store.global_ratings().await?;
    Ok(Json(ranking::global_leaderboard(&state.catalog, &ratings)))
}

pub async fn personal_rankings<S: RatingStore>(
    State(state): State<Arc<AppState<S>>>,
    session: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let Path(session) = session?;
    let ratings = state.store.personal_ratings(&session).await?;
    Ok(Json(ranking::personal_leaderboard(&state.catalog, &ratings)))
}

pub async fn affinity<S: RatingStore>(
    State(state): State<Arc<AppState<S>>>,
    session: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<AffinityEntry>>, ApiError> {
    let Path(session) = session?;
    let records = state.store.affinity(&session).await?;
    Ok(Json(ranking::affinity_report(records)))
}

// ── Songs ───────────────────────────────────────────────────────────────

pub async fn song<S: RatingStore>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<SongId>, PathRejection>,
) -> Result<Json<SongCard>, ApiError> {
    let Path(id) = id?;
    let song = state
        .catalog
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("Song {} not found", id)))?;
    let ratings = state.store.global_ratings().await?;
    let global = ratings.get(&id).copied().unwrap_or_default();
    Ok(Json(SongCard::new(song, global, None)))
}
