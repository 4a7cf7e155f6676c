//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Each function takes the controller lock for the whole event, so events from
//! any transport are applied one at a time, and returns the resulting view.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::controller::{ChapterSummary, LevelEntry};
use crate::domain::AudioSettings;
use crate::error::GameResult;
use crate::protocol::{EventOut, GameOut};
use crate::state::AppState;

pub async fn list_chapters(state: &AppState) -> Vec<ChapterSummary> {
  state.game.lock().await.chapters()
}

#[instrument(level = "debug", skip(state))]
pub async fn list_levels(state: &AppState, chapter_id: &str) -> GameResult<Vec<LevelEntry>> {
  state.game.lock().await.levels(chapter_id)
}

pub async fn snapshot(state: &AppState) -> GameOut {
  GameOut { view: state.game.lock().await.view(), event: None }
}

#[instrument(level = "info", skip(state))]
pub async fn switch_chapter(state: &AppState, chapter_id: &str) -> GameResult<GameOut> {
  let mut game = state.game.lock().await;
  game.switch_chapter(chapter_id)?;
  Ok(GameOut { view: game.view(), event: None })
}

#[instrument(level = "info", skip(state))]
pub async fn start_level(state: &AppState, chapter_id: &str, level_id: u32) -> GameResult<GameOut> {
  let mut game = state.game.lock().await;
  game.start_level(chapter_id, level_id)?;
  Ok(GameOut { view: game.view(), event: None })
}

#[instrument(level = "debug", skip(state))]
pub async fn select_candidate(state: &AppState, index: usize, attempt_id: Option<Uuid>) -> GameResult<GameOut> {
  let mut game = state.game.lock().await;
  let outcome = game.select_candidate(index, attempt_id)?;
  Ok(GameOut { view: game.view(), event: Some(EventOut::Select { outcome }) })
}

#[instrument(level = "debug", skip(state))]
pub async fn undo(state: &AppState, attempt_id: Option<Uuid>) -> GameOut {
  let mut game = state.game.lock().await;
  let outcome = game.undo_last_wrong_selection(attempt_id);
  GameOut { view: game.view(), event: Some(EventOut::Undo { outcome }) }
}

pub async fn restart(state: &AppState) -> GameResult<GameOut> {
  let mut game = state.game.lock().await;
  game.restart_level()?;
  Ok(GameOut { view: game.view(), event: None })
}

pub async fn advance(state: &AppState) -> GameResult<GameOut> {
  let mut game = state.game.lock().await;
  game.advance_to_next_level()?;
  Ok(GameOut { view: game.view(), event: None })
}

pub async fn toggle_hint(state: &AppState) -> GameResult<GameOut> {
  let mut game = state.game.lock().await;
  let stage = game.toggle_hint()?;
  Ok(GameOut { view: game.view(), event: Some(EventOut::Hint { stage }) })
}

#[instrument(level = "info", skip(state))]
pub async fn clear_progress(state: &AppState) -> GameResult<GameOut> {
  let mut game = state.game.lock().await;
  game.clear_progress()?;
  info!(target: "progress", "Progress cleared by player");
  Ok(GameOut { view: game.view(), event: None })
}

pub async fn settings(state: &AppState) -> AudioSettings {
  state.game.lock().await.settings()
}

#[instrument(level = "debug", skip(state))]
pub async fn save_settings(state: &AppState, settings: AudioSettings) -> GameResult<AudioSettings> {
  let mut game = state.game.lock().await;
  game.set_settings(settings)?;
  Ok(game.settings())
}
