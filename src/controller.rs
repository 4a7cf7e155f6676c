//! Chapter/unlock controller: which chapter and level are active, starting and
//! restarting attempts, and turning terminal outcomes into saved progress.
//!
//! One controller drives one player. Events are applied synchronously; a
//! selection that arrives with no live attempt (or for an older attempt) is a
//! silent no-op. Progress writes are best effort: a failed write is logged and
//! the game carries on.

use std::sync::Arc;

use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::domain::{AudioSettings, BestResult, ChapterInfo, HintStage, LevelDefinition, TerminalOutcome};
use crate::error::{GameError, GameResult};
use crate::library::ContentLibrary;
use crate::pool::build_pool;
use crate::progress::{ProgressStore, FIRST_LEVEL};
use crate::seeds::default_chapters;
use crate::session::{LevelSession, SelectOutcome, SessionSnapshot, UndoOutcome};

/// Chapter card for the chapter-select screen.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
  pub id: String,
  pub name: String,
  pub level_count: usize,
  pub earned_stars: u32,
  pub total_stars: u32,
}

/// Level button for the level-select screen.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEntry {
  pub id: u32,
  pub unlocked: bool,
  pub stars: u8,
  pub best_score: u32,
}

/// Everything the presentation layer needs after any event.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
  pub chapter: ChapterInfo,
  pub level_id: u32,
  pub session: Option<SessionSnapshot>,
  pub best: Option<BestResult>,
  pub can_advance: bool,
}

pub struct ChapterController {
  chapters: Vec<ChapterInfo>,
  unlock_threshold: u32,
  library: Arc<ContentLibrary>,
  store: Box<dyn ProgressStore>,
  rng: StdRng,
  chapter: ChapterInfo,
  level_id: u32,
  session: Option<LevelSession>,
}

impl ChapterController {
  /// Resume the saved chapter (or the first configured one) with no attempt running.
  pub fn new(config: &GameConfig, library: Arc<ContentLibrary>, store: Box<dyn ProgressStore>, rng: StdRng) -> Self {
    let chapters = if config.chapters.is_empty() { default_chapters() } else { config.chapters.clone() };
    let chapter = store
      .current_chapter()
      .and_then(|id| chapters.iter().find(|c| c.id == id).cloned())
      .unwrap_or_else(|| chapters[0].clone());
    let level_id = resume_level(&library, store.as_ref(), &chapter.id);
    info!(target: "dynasty_words", chapter = %chapter.id, level = level_id, "Controller ready");

    Self {
      chapters,
      unlock_threshold: config.unlock_threshold,
      library,
      store,
      rng,
      chapter,
      level_id,
      session: None,
    }
  }

  fn chapter_info(&self, id: &str) -> GameResult<ChapterInfo> {
    self
      .chapters
      .iter()
      .find(|c| c.id == id)
      .cloned()
      .ok_or_else(|| GameError::InvalidChapter(id.to_string()))
  }

  pub fn chapters(&self) -> Vec<ChapterSummary> {
    self
      .chapters
      .iter()
      .map(|c| {
        let ids: Vec<u32> = self.library.catalog(&c.id).map(|cat| cat.level_ids().collect()).unwrap_or_default();
        let earned_stars = ids
          .iter()
          .filter_map(|id| self.store.best_result(&c.id, *id))
          .map(|b| u32::from(b.stars))
          .sum();
        ChapterSummary {
          id: c.id.clone(),
          name: c.name.clone(),
          level_count: ids.len(),
          earned_stars,
          total_stars: ids.len() as u32 * 3,
        }
      })
      .collect()
  }

  pub fn levels(&self, chapter: &str) -> GameResult<Vec<LevelEntry>> {
    self.chapter_info(chapter)?;
    let Some(catalog) = self.library.catalog(chapter) else {
      return Ok(Vec::new());
    };
    Ok(
      catalog
        .level_ids()
        .map(|id| {
          let best = self.store.best_result(chapter, id).unwrap_or_default();
          LevelEntry { id, unlocked: self.store.is_unlocked(chapter, id), stars: best.stars, best_score: best.score }
        })
        .collect(),
    )
  }

  pub fn view(&self) -> GameView {
    GameView {
      chapter: self.chapter.clone(),
      level_id: self.level_id,
      session: self.session.as_ref().map(LevelSession::snapshot),
      best: self.store.best_result(&self.chapter.id, self.level_id),
      can_advance: self.can_advance(),
    }
  }

  /// Make `chapter` active. Any running attempt is discarded and the level
  /// context goes back to level 1 of the new chapter.
  #[instrument(level = "info", skip(self))]
  pub fn switch_chapter(&mut self, chapter: &str) -> GameResult<()> {
    let info = self.chapter_info(chapter)?;
    if let Err(e) = self.store.set_current_chapter(&info.id) {
      error!(target: "progress", error = %e, "Failed to save current chapter");
    }
    self.chapter = info;
    self.level_id = FIRST_LEVEL;
    self.session = None;
    info!(target: "session", chapter, "Switched chapter");
    Ok(())
  }

  /// Start a fresh attempt. On any error the previous state is left untouched.
  #[instrument(level = "info", skip(self))]
  pub fn start_level(&mut self, chapter: &str, level_id: u32) -> GameResult<()> {
    let info = self.chapter_info(chapter)?;
    let level = self.library.level(chapter, level_id)?.clone();
    if !self.store.is_unlocked(chapter, level_id) {
      return Err(GameError::LevelLocked { chapter: chapter.to_string(), level: level_id });
    }
    self.begin_level(info, level);
    Ok(())
  }

  /// Build the pool and session for an already authorized level.
  fn begin_level(&mut self, info: ChapterInfo, level: LevelDefinition) {
    if info.id != self.chapter.id {
      if let Err(e) = self.store.set_current_chapter(&info.id) {
        error!(target: "progress", error = %e, "Failed to save current chapter");
      }
      self.chapter = info;
    }
    let level_id = level.id;
    let pool = build_pool(&level.target, level.distractor_count, self.library.corpus().chars(), &mut self.rng);
    let session = LevelSession::new(self.chapter.id.clone(), level, pool);
    info!(target: "session", chapter = %self.chapter.id, level = level_id, phrase = %session.level().target_text(), attempt = %session.attempt_id(), pool = session.pool_size(), "Level started");
    self.level_id = level_id;
    self.session = Some(session);
  }

  /// Same level, fresh shuffle, score and mistakes reset.
  pub fn restart_level(&mut self) -> GameResult<()> {
    let session = self.session.as_ref().ok_or(GameError::NoActiveLevel)?;
    let level = session.level().clone();
    let pool = build_pool(&level.target, level.distractor_count, self.library.corpus().chars(), &mut self.rng);
    let fresh = LevelSession::new(session.chapter_id().to_string(), level, pool);
    info!(target: "session", chapter = %self.chapter.id, level = self.level_id, attempt = %fresh.attempt_id(), "Level restarted");
    self.session = Some(fresh);
    Ok(())
  }

  /// Forward a selection. `attempt` pins the event to the attempt it was issued for.
  pub fn select_candidate(&mut self, index: usize, attempt: Option<Uuid>) -> GameResult<SelectOutcome> {
    let Some(session) = self.live_session(attempt) else {
      return Ok(SelectOutcome::Ignored);
    };
    let outcome = session.select_candidate(index)?;
    debug!(
      target: "session",
      index,
      ?outcome,
      score = session.score(),
      mistakes_remaining = session.mistakes_remaining(),
      state = ?session.state(),
      "Selection applied"
    );
    // Won/Lost are only reported on the transition, so each attempt is recorded once.
    let finished = match outcome {
      SelectOutcome::Won { .. } | SelectOutcome::Lost { .. } => session.outcome(),
      _ => None,
    };
    if let Some(result) = finished {
      self.record_outcome(result);
    }
    Ok(outcome)
  }

  pub fn undo_last_wrong_selection(&mut self, attempt: Option<Uuid>) -> UndoOutcome {
    match self.live_session(attempt) {
      Some(session) => session.undo_last_wrong_selection(),
      None => UndoOutcome::Nothing,
    }
  }

  pub fn toggle_hint(&mut self) -> GameResult<HintStage> {
    let session = self.session.as_mut().ok_or(GameError::NoActiveLevel)?;
    Ok(session.toggle_hint())
  }

  fn has_next_level(&self) -> bool {
    self.library.level(&self.chapter.id, self.level_id + 1).is_ok()
  }

  fn can_advance(&self) -> bool {
    self
      .session
      .as_ref()
      .and_then(LevelSession::outcome)
      .is_some_and(|o| o.score >= self.unlock_threshold)
      && self.has_next_level()
  }

  /// Move to `level + 1` after a passing result. A failing result must restart instead.
  ///
  /// The passing result itself opens the next level, so a lost unlock write does not block this.
  pub fn advance_to_next_level(&mut self) -> GameResult<()> {
    let session = self.session.as_ref().ok_or(GameError::NoActiveLevel)?;
    let Some(outcome) = session.outcome() else {
      return Err(GameError::AdvanceNotAllowed("level still in progress".into()));
    };
    if outcome.score < self.unlock_threshold {
      return Err(GameError::AdvanceNotAllowed(format!(
        "score {} is below {}; restart the level",
        outcome.score, self.unlock_threshold
      )));
    }
    let next = match self.library.level(&self.chapter.id, self.level_id + 1) {
      Ok(level) => level.clone(),
      Err(_) => {
        return Err(GameError::AdvanceNotAllowed(format!(
          "level {} is the last level of '{}'",
          self.level_id, self.chapter.id
        )))
      }
    };
    self.begin_level(self.chapter.clone(), next);
    Ok(())
  }

  pub fn settings(&self) -> AudioSettings {
    self.store.settings()
  }

  pub fn set_settings(&mut self, settings: AudioSettings) -> GameResult<()> {
    self.store.set_settings(settings)
  }

  pub fn clear_progress(&mut self) -> GameResult<()> {
    self.store.clear()?;
    self.session = None;
    self.level_id = FIRST_LEVEL;
    Ok(())
  }

  /// The running attempt, if `attempt` (when given) still refers to it.
  fn live_session(&mut self, attempt: Option<Uuid>) -> Option<&mut LevelSession> {
    let session = self.session.as_mut()?;
    match attempt {
      Some(id) if id != session.attempt_id() => {
        warn!(target: "session", stale = %id, live = %session.attempt_id(), "Ignoring event for an old attempt");
        None
      }
      _ => Some(session),
    }
  }

  fn record_outcome(&mut self, outcome: TerminalOutcome) {
    let chapter = self.chapter.id.clone();
    let level = self.level_id;
    info!(target: "session", %chapter, level, state = ?outcome.state, score = outcome.score, stars = outcome.stars, "Attempt finished");

    if let Err(e) = self.store.record_result(&chapter, level, outcome.score) {
      error!(target: "progress", %chapter, level, error = %e, "Failed to save result");
    }
    if outcome.score >= self.unlock_threshold {
      if let Err(e) = self.store.unlock(&chapter, level + 1) {
        error!(target: "progress", %chapter, level = level + 1, error = %e, "Failed to save unlock");
      }
    }
  }
}

/// Highest unlocked level of `chapter` that the catalog still has, or level 1.
fn resume_level(library: &ContentLibrary, store: &dyn ProgressStore, chapter: &str) -> u32 {
  library
    .catalog(chapter)
    .and_then(|cat| cat.level_ids().filter(|id| store.is_unlocked(chapter, *id)).max())
    .unwrap_or(FIRST_LEVEL)
}
