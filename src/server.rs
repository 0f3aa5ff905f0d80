use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::export::{self, MatchSummary};
use crate::scoring::ScoringError;
use crate::session::Prompt;
use crate::state::AppState;
use crate::store::{CreateMatchRequest, EventType, StoreError, StoredMatch};
use crate::types::{
    Action, Ball, BallAction, CricketSignal, ExtraType, MatchSetup, Player, Team,
};

type S = Arc<AppState>;
type ApiError = (StatusCode, Json<Value>);

pub fn build_router(state: S) -> Router {
    Router::new()
        .route("/api/health", get(get_health))
        // live scoring session
        .route("/api/match", post(post_match))
        .route("/api/status", get(get_status))
        .route("/api/events", get(get_events))
        .route("/api/ball", post(post_ball))
        .route("/api/signal", post(post_signal))
        .route("/api/wicket", post(post_wicket))
        .route("/api/retire", post(post_retire))
        .route("/api/undo", post(post_undo))
        .route("/api/openers", post(post_openers))
        .route("/api/select-batter", post(post_select_batter))
        .route("/api/select-bowler", post(post_select_bowler))
        .route("/api/export/json", get(get_export_json))
        .route("/api/export/csv", get(get_export_csv))
        .route("/api/reset", post(post_reset))
        // event-log store
        .route("/api/matches", post(post_stored_match))
        .route("/api/matches/code/{code}", get(get_stored_match))
        .route("/api/matches/{code}/events", post(post_stored_event))
        .route("/api/matches/{code}/undo", post(post_stored_undo))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_error(status: StatusCode, error: impl std::fmt::Display, details: Vec<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({ "error": error.to_string(), "details": details })),
    )
}

fn scoring_error(e: ScoringError) -> ApiError {
    let status = match &e {
        ScoringError::NoMatch => StatusCode::NOT_FOUND,
        ScoringError::MatchFinished
        | ScoringError::PromptPending(_)
        | ScoringError::NothingToUndo => StatusCode::CONFLICT,
        ScoringError::NoStriker
        | ScoringError::UnknownPlayer(_)
        | ScoringError::InvalidSelection(_) => StatusCode::BAD_REQUEST,
    };
    api_error(status, e, Vec::new())
}

fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Duplicate(_) | StoreError::NothingToUndo | StoreError::Finished(_) => {
            StatusCode::CONFLICT
        }
        StoreError::Corrupt(_) | StoreError::Sqlite(_) | StoreError::Json(_) => {
            tracing::error!(error = %e, "store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e, Vec::new())
}

async fn get_health() -> Json<Value> {
    Json(serde_json::json!({ "ok": true }))
}

// ── Status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    summary: MatchSummary,
    current_over: Vec<Ball>,
    striker: Option<Player>,
    non_striker: Option<Player>,
    bowler: Option<Player>,
    pending: Vec<Prompt>,
    undo_depth: usize,
    mirror_enabled: bool,
}

fn status_of(state: &AppState) -> Result<StatusResponse, ApiError> {
    let m = state.snapshot().ok_or_else(|| scoring_error(ScoringError::NoMatch))?;
    Ok(StatusResponse {
        summary: export::summary(&m),
        current_over: m.current_over.clone(),
        striker: m.striker_player().cloned(),
        non_striker: m.non_striker_player().cloned(),
        bowler: m.bowler_player().cloned(),
        pending: state.pending(),
        undo_depth: m.history.len(),
        mirror_enabled: state.mirror.is_enabled(),
    })
}

async fn get_status(State(state): State<S>) -> Result<Json<StatusResponse>, ApiError> {
    Ok(Json(status_of(&state)?))
}

async fn get_events(State(state): State<S>) -> Json<Vec<crate::state::EventEntry>> {
    let events = state.events.lock().unwrap();
    Json(events.iter().cloned().collect())
}

// ── Setup ───────────────────────────────────────────────────────────────────

async fn post_match(
    State(state): State<S>,
    Json(body): Json<MatchSetup>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .start_match(body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e, e.details().to_vec()))?;
    Ok(Json(status_of(&state)?))
}

async fn post_reset(State(state): State<S>) -> Json<Value> {
    state.reset();
    Json(serde_json::json!({ "ok": true }))
}

// ── Scoring ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct BallRequest {
    #[serde(default)]
    runs: u32,
    #[serde(default)]
    extra: Option<ExtraType>,
    #[serde(default)]
    bat_runs: u32,
}

impl BallRequest {
    /// A no-ball carries its bat runs in `bat_runs`; `runs` must stay zero.
    pub(crate) fn into_action(self) -> Result<BallAction, ApiError> {
        if self.extra == Some(ExtraType::NoBall) && self.runs > 0 {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "runs not allowed on a no-ball",
                vec!["send the batter's runs as bat_runs".into()],
            ));
        }
        let limit = match self.extra {
            Some(ExtraType::Wide) => 7,
            _ => 6,
        };
        if self.runs > limit || self.bat_runs > 6 {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "runs out of range",
                vec![format!("runs must be at most {limit}, bat_runs at most 6")],
            ));
        }
        Ok(match self.extra {
            None => BallAction::runs(self.runs),
            Some(ExtraType::Wide) => BallAction::wide(self.runs.max(1)),
            Some(ExtraType::NoBall) => BallAction::no_ball(self.bat_runs),
            Some(ExtraType::Bye) => BallAction::bye(self.runs),
            Some(ExtraType::LegBye) => BallAction::leg_bye(self.runs),
        })
    }
}

fn apply(state: &AppState, action: Action) -> Result<Json<StatusResponse>, ApiError> {
    state.apply(action).map_err(scoring_error)?;
    Ok(Json(status_of(state)?))
}

async fn post_ball(
    State(state): State<S>,
    Json(body): Json<BallRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let ball = body.into_action()?;
    apply(&state, Action::Ball(ball))
}

#[derive(Deserialize)]
struct SignalRequest {
    signal: String,
}

async fn post_signal(
    State(state): State<S>,
    Json(body): Json<SignalRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let signal = CricketSignal::parse(&body.signal).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("unknown signal: {}", body.signal),
            vec!["expected 0-6, W, Wd[1-6], N[1-6], B[1-6], LB[1-6], R or U".into()],
        )
    })?;
    tracing::info!(signal = %signal, "signal received via API");
    apply(&state, signal.into_action())
}

async fn post_wicket(State(state): State<S>) -> Result<Json<StatusResponse>, ApiError> {
    apply(&state, Action::Wicket)
}

async fn post_retire(State(state): State<S>) -> Result<Json<StatusResponse>, ApiError> {
    apply(&state, Action::Retire)
}

async fn post_undo(State(state): State<S>) -> Result<Json<StatusResponse>, ApiError> {
    apply(&state, Action::Undo)
}

// ── Operator selections ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct OpenersRequest {
    striker_id: String,
    non_striker_id: String,
    bowler_id: String,
}

#[derive(Deserialize)]
struct PlayerRequest {
    player_id: String,
}

async fn post_openers(
    State(state): State<S>,
    Json(body): Json<OpenersRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .select("openers", |s| s.set_openers(&body.striker_id, &body.non_striker_id, &body.bowler_id))
        .map_err(scoring_error)?;
    Ok(Json(status_of(&state)?))
}

async fn post_select_batter(
    State(state): State<S>,
    Json(body): Json<PlayerRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .select("batter", |s| s.select_batter(&body.player_id))
        .map_err(scoring_error)?;
    Ok(Json(status_of(&state)?))
}

async fn post_select_bowler(
    State(state): State<S>,
    Json(body): Json<PlayerRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .select("bowler", |s| s.select_bowler(&body.player_id))
        .map_err(scoring_error)?;
    Ok(Json(status_of(&state)?))
}

// ── Export ──────────────────────────────────────────────────────────────────

async fn get_export_json(State(state): State<S>) -> Result<Json<MatchSummary>, ApiError> {
    let m = state.snapshot().ok_or_else(|| scoring_error(ScoringError::NoMatch))?;
    Ok(Json(export::summary(&m)))
}

#[derive(Deserialize)]
struct CsvQuery {
    side: Option<String>,
}

async fn get_export_csv(
    State(state): State<S>,
    Query(query): Query<CsvQuery>,
) -> Result<([(header::HeaderName, &'static str); 1], String), ApiError> {
    let m = state.snapshot().ok_or_else(|| scoring_error(ScoringError::NoMatch))?;
    let side = match query.side.as_deref() {
        None => m.batting,
        Some(raw) => Team::parse(raw).ok_or_else(|| {
            api_error(StatusCode::BAD_REQUEST, format!("unknown side: {raw}"), vec!["expected A or B".into()])
        })?,
    };
    let csv = export::scorecard_csv(&m, side)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e, Vec::new()))?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv))
}

// ── Event-log store ─────────────────────────────────────────────────────────

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e, Vec::new()))?
        .map_err(store_error)
}

async fn post_stored_match(
    State(state): State<S>,
    Json(body): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<StoredMatch>), ApiError> {
    body.validate()
        .map_err(|details| api_error(StatusCode::BAD_REQUEST, "invalid match", details))?;
    let store = state.store.clone();
    let doc = blocking(move || store.create_match(&body)).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn get_stored_match(
    State(state): State<S>,
    Path(code): Path<String>,
) -> Result<Json<StoredMatch>, ApiError> {
    let store = state.store.clone();
    let lookup = code.clone();
    let doc = blocking(move || store.fetch_by_code(&lookup)).await?;
    doc.map(Json)
        .ok_or_else(|| store_error(StoreError::NotFound(code)))
}

#[derive(Deserialize)]
struct EventRequest {
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(default)]
    payload: Value,
}

async fn post_stored_event(
    State(state): State<S>,
    Path(code): Path<String>,
    Json(body): Json<EventRequest>,
) -> Result<Json<StoredMatch>, ApiError> {
    let store = state.store.clone();
    let doc = blocking(move || store.append_event(&code, body.event_type, body.payload)).await?;
    Ok(Json(doc))
}

async fn post_stored_undo(
    State(state): State<S>,
    Path(code): Path<String>,
) -> Result<Json<StoredMatch>, ApiError> {
    let store = state.store.clone();
    let doc = blocking(move || store.undo_last_event(&code)).await?;
    Ok(Json(doc))
}
