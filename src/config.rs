//! Loading game configuration (content locations, chapters, thresholds) from TOML.
//!
//! See `GameConfig` for the expected schema. Every field has a default, so an
//! empty file (or no file at all) yields a playable setup.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::ChapterInfo;
use crate::error::GameResult;
use crate::seeds::{default_chapters, default_legacy_aliases};

/// Score required on a level to unlock the next one.
pub const DEFAULT_UNLOCK_THRESHOLD: u32 = 60;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GameConfig {
  /// Directory holding one `<chapter_id>.csv` level table per chapter.
  pub levels_dir: PathBuf,
  /// Common-character list used as distractor source.
  pub corpus_path: PathBuf,
  /// JSON save file for unlocked levels and best scores.
  pub progress_path: PathBuf,
  /// Front-end bundle served with an index.html fallback.
  pub static_dir: PathBuf,
  pub unlock_threshold: u32,
  pub chapters: Vec<ChapterInfo>,
  /// Old chapter id -> current chapter id, applied when progress is loaded.
  pub legacy_chapter_aliases: HashMap<String, String>,
}

impl Default for GameConfig {
  fn default() -> Self {
    Self {
      levels_dir: PathBuf::from("configs"),
      corpus_path: PathBuf::from("3500word.txt"),
      progress_path: PathBuf::from("save/progress.json"),
      static_dir: PathBuf::from("static"),
      unlock_threshold: DEFAULT_UNLOCK_THRESHOLD,
      chapters: default_chapters(),
      legacy_chapter_aliases: default_legacy_aliases(),
    }
  }
}

impl GameConfig {
  pub fn from_toml_str(s: &str) -> GameResult<Self> {
    Ok(toml::from_str::<GameConfig>(s)?)
  }
}

/// Load `GameConfig` from GAME_CONFIG_PATH. On any IO/parse error, logs and returns defaults.
pub fn load_game_config_from_env() -> GameConfig {
  let Ok(path) = std::env::var("GAME_CONFIG_PATH") else {
    info!(target: "dynasty_words", "GAME_CONFIG_PATH not set; using default configuration");
    return GameConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match GameConfig::from_toml_str(&s) {
      Ok(cfg) => {
        info!(target: "dynasty_words", %path, chapters = cfg.chapters.len(), "Loaded game config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "dynasty_words", %path, error = %e, "Failed to parse TOML config; using defaults");
        GameConfig::default()
      }
    },
    Err(e) => {
      error!(target: "dynasty_words", %path, error = %e, "Failed to read TOML config file; using defaults");
      GameConfig::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_toml_yields_defaults() {
    let cfg = GameConfig::from_toml_str("").expect("parse");
    assert_eq!(cfg.unlock_threshold, 60);
    assert_eq!(cfg.chapters.len(), 8);
    assert_eq!(cfg.chapters[0].id, "xianqin");
    assert_eq!(cfg.legacy_chapter_aliases.get("weijin").map(String::as_str), Some("sanguo"));
  }

  #[test]
  fn chapters_and_paths_can_be_overridden() {
    let cfg = GameConfig::from_toml_str(
      r#"
levels_dir = "data/levels"
unlock_threshold = 70

[[chapters]]
id = "tang"
name = "隋唐"
"#,
    )
    .expect("parse");
    assert_eq!(cfg.levels_dir, PathBuf::from("data/levels"));
    assert_eq!(cfg.unlock_threshold, 70);
    assert_eq!(cfg.chapters.len(), 1);
    assert_eq!(cfg.chapters[0], ChapterInfo { id: "tang".into(), name: "隋唐".into() });
    assert_eq!(cfg.corpus_path, PathBuf::from("3500word.txt"));
  }

  #[test]
  fn bad_toml_is_an_error() {
    assert!(GameConfig::from_toml_str("unlock_threshold = \"lots\"").is_err());
  }
}
