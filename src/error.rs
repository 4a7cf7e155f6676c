//! Error taxonomy for loading content, persisting progress and driving the controller.
//!
//! Gameplay no-ops (selecting an already used candidate, events against a finished
//! attempt) are not errors; they surface as `SelectOutcome::Ignored`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
  #[error("level {level} not found in chapter '{chapter}'")]
  NotFound { chapter: String, level: u32 },

  #[error("unknown chapter '{0}'")]
  InvalidChapter(String),

  #[error("level {level} of chapter '{chapter}' is locked")]
  LevelLocked { chapter: String, level: u32 },

  #[error("malformed level row at line {line}: {reason}")]
  MalformedDefinition { line: usize, reason: String },

  #[error("candidate index {index} out of range (pool size {pool_size})")]
  IndexOutOfRange { index: usize, pool_size: usize },

  #[error("cannot advance: {0}")]
  AdvanceNotAllowed(String),

  #[error("no level is active")]
  NoActiveLevel,

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("TOML error: {0}")]
  Toml(#[from] toml::de::Error),
}

pub type GameResult<T> = Result<T, GameError>;
