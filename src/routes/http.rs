//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; game errors map onto HTTP status codes.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::error::GameError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

/// `GameError` as an HTTP response with a JSON `{ "error": ... }` body.
pub struct ApiError(GameError);

impl From<GameError> for ApiError {
  fn from(e: GameError) -> Self {
    Self(e)
  }
}

pub fn status_for(e: &GameError) -> StatusCode {
  match e {
    GameError::NotFound { .. } | GameError::InvalidChapter(_) => StatusCode::NOT_FOUND,
    GameError::LevelLocked { .. } => StatusCode::FORBIDDEN,
    GameError::AdvanceNotAllowed(_) | GameError::NoActiveLevel => StatusCode::CONFLICT,
    GameError::IndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
    _ => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = status_for(&self.0);
    warn!(target: "dynasty_words", %status, error = %self.0, "Request rejected");
    (status, Json(ErrorOut { error: self.0.to_string() })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_chapters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(ChaptersOut { chapters: logic::list_chapters(&state).await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_levels(
  State(state): State<Arc<AppState>>,
  Path(chapter_id): Path<String>,
) -> ApiResult<LevelsOut> {
  let levels = logic::list_levels(&state, &chapter_id).await?;
  Ok(Json(LevelsOut { chapter_id, levels }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_game(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::snapshot(&state).await)
}

#[instrument(level = "info", skip(state, body), fields(%body.chapter_id))]
pub async fn http_post_chapter(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ChapterIn>,
) -> ApiResult<GameOut> {
  Ok(Json(logic::switch_chapter(&state, &body.chapter_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(%body.chapter_id, level_id = body.level_id))]
pub async fn http_post_start(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartLevelIn>,
) -> ApiResult<GameOut> {
  let out = logic::start_level(&state, &body.chapter_id, body.level_id).await?;
  info!(target: "session", chapter = %body.chapter_id, level = body.level_id, "HTTP level started");
  Ok(Json(out))
}

#[instrument(level = "debug", skip(state, body), fields(index = body.index))]
pub async fn http_post_select(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SelectIn>,
) -> ApiResult<GameOut> {
  Ok(Json(logic::select_candidate(&state, body.index, body.attempt_id).await?))
}

#[instrument(level = "debug", skip(state, body))]
pub async fn http_post_undo(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UndoIn>,
) -> impl IntoResponse {
  Json(logic::undo(&state, body.attempt_id).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_restart(State(state): State<Arc<AppState>>) -> ApiResult<GameOut> {
  Ok(Json(logic::restart(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_advance(State(state): State<Arc<AppState>>) -> ApiResult<GameOut> {
  Ok(Json(logic::advance(&state).await?))
}

#[instrument(level = "debug", skip(state))]
pub async fn http_post_hint(State(state): State<Arc<AppState>>) -> ApiResult<GameOut> {
  Ok(Json(logic::toggle_hint(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_progress(State(state): State<Arc<AppState>>) -> ApiResult<GameOut> {
  Ok(Json(logic::clear_progress(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(SettingsBody { settings: logic::settings(&state).await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_put_settings(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SettingsBody>,
) -> ApiResult<SettingsBody> {
  let settings = logic::save_settings(&state, body.settings).await?;
  Ok(Json(SettingsBody { settings }))
}
