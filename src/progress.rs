//! Progress store: unlocked levels, best results and the last played chapter.
//!
//! Two implementations:
//!   - `MemoryProgressStore`: no persistence (tests, or when the save file is unusable)
//!   - `JsonFileProgressStore`: a JSON document rewritten atomically on every change
//!
//! Legacy chapter ids are folded into their current id once, when a save is loaded.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::domain::{AudioSettings, BestResult};
use crate::error::GameResult;

/// Level 1 of every chapter is always playable.
pub const FIRST_LEVEL: u32 = 1;

pub trait ProgressStore: Send {
  /// Stored unlocks for a chapter, always including level 1.
  fn unlocked_levels(&self, chapter: &str) -> BTreeSet<u32>;
  /// Returns true when the level was not unlocked before. Idempotent.
  fn unlock(&mut self, chapter: &str, level: u32) -> GameResult<bool>;
  fn best_result(&self, chapter: &str, level: u32) -> Option<BestResult>;
  /// Keep the higher score. Returns true when the stored best changed.
  fn record_result(&mut self, chapter: &str, level: u32, score: u32) -> GameResult<bool>;
  fn current_chapter(&self) -> Option<String>;
  fn set_current_chapter(&mut self, chapter: &str) -> GameResult<()>;
  fn settings(&self) -> AudioSettings;
  fn set_settings(&mut self, settings: AudioSettings) -> GameResult<()>;
  /// Forget unlocks, results and the current chapter. Audio settings survive.
  fn clear(&mut self) -> GameResult<()>;

  /// Unlocked if level 1, explicitly unlocked, or already scored above zero.
  fn is_unlocked(&self, chapter: &str, level: u32) -> bool {
    self.unlocked_levels(chapter).contains(&level)
      || self.best_result(chapter, level).is_some_and(|b| b.score > 0)
  }
}

/// Serialized save document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressData {
  #[serde(default)] pub unlocked: BTreeMap<String, BTreeSet<u32>>,
  #[serde(default)] pub best: BTreeMap<String, BTreeMap<u32, BestResult>>,
  #[serde(default)] pub current_chapter: Option<String>,
  #[serde(default)] pub settings: AudioSettings,
}

impl ProgressData {
  fn unlocked_levels(&self, chapter: &str) -> BTreeSet<u32> {
    let mut set = self.unlocked.get(chapter).cloned().unwrap_or_default();
    set.insert(FIRST_LEVEL);
    set
  }

  fn unlock(&mut self, chapter: &str, level: u32) -> bool {
    self.unlocked.entry(chapter.to_string()).or_default().insert(level)
  }

  fn cleared(&self) -> Self {
    Self { settings: self.settings, ..Self::default() }
  }

  fn best_result(&self, chapter: &str, level: u32) -> Option<BestResult> {
    self.best.get(chapter).and_then(|m| m.get(&level)).copied()
  }

  fn record_result(&mut self, chapter: &str, level: u32, score: u32) -> bool {
    let levels = self.best.entry(chapter.to_string()).or_default();
    match levels.get(&level) {
      Some(prev) if score <= prev.score => false,
      _ => {
        levels.insert(level, BestResult::from_score(score));
        true
      }
    }
  }

  /// Fold legacy chapter ids into their replacements. Returns true if anything moved.
  pub fn migrate_legacy(&mut self, aliases: &HashMap<String, String>) -> bool {
    let mut changed = false;
    for (old, new) in aliases {
      let mut moved = false;
      if let Some(levels) = self.unlocked.remove(old) {
        self.unlocked.entry(new.clone()).or_default().extend(levels);
        moved = true;
      }
      if let Some(results) = self.best.remove(old) {
        let target = self.best.entry(new.clone()).or_default();
        for (level, result) in results {
          match target.get(&level) {
            Some(existing) if existing.score >= result.score => {}
            _ => {
              target.insert(level, result);
            }
          }
        }
        moved = true;
      }
      if self.current_chapter.as_deref() == Some(old.as_str()) {
        self.current_chapter = Some(new.clone());
        moved = true;
      }
      if moved {
        info!(target: "progress", from = %old, to = %new, "Migrated legacy chapter id");
        changed = true;
      }
    }
    changed
  }
}

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
  data: ProgressData,
}

impl MemoryProgressStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl ProgressStore for MemoryProgressStore {
  fn unlocked_levels(&self, chapter: &str) -> BTreeSet<u32> {
    self.data.unlocked_levels(chapter)
  }

  fn unlock(&mut self, chapter: &str, level: u32) -> GameResult<bool> {
    Ok(self.data.unlock(chapter, level))
  }

  fn best_result(&self, chapter: &str, level: u32) -> Option<BestResult> {
    self.data.best_result(chapter, level)
  }

  fn record_result(&mut self, chapter: &str, level: u32, score: u32) -> GameResult<bool> {
    Ok(self.data.record_result(chapter, level, score))
  }

  fn current_chapter(&self) -> Option<String> {
    self.data.current_chapter.clone()
  }

  fn set_current_chapter(&mut self, chapter: &str) -> GameResult<()> {
    self.data.current_chapter = Some(chapter.to_string());
    Ok(())
  }

  fn settings(&self) -> AudioSettings {
    self.data.settings
  }

  fn set_settings(&mut self, settings: AudioSettings) -> GameResult<()> {
    self.data.settings = settings;
    Ok(())
  }

  fn clear(&mut self) -> GameResult<()> {
    self.data = self.data.cleared();
    Ok(())
  }
}

/// JSON save file. Writes go to a temp file in the same directory, then replace the target.
#[derive(Debug)]
pub struct JsonFileProgressStore {
  path: PathBuf,
  data: ProgressData,
}

impl JsonFileProgressStore {
  /// Open (or start) a save file. A missing file is an empty save; an unreadable
  /// or corrupt one is an error so the caller can avoid overwriting it.
  #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
  pub fn open(path: impl AsRef<Path>, aliases: &HashMap<String, String>) -> GameResult<Self> {
    let path = path.as_ref().to_path_buf();
    let mut data = match fs::read_to_string(&path) {
      Ok(s) => serde_json::from_str::<ProgressData>(&s)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        info!(target: "progress", "No save file yet; starting fresh");
        ProgressData::default()
      }
      Err(e) => return Err(e.into()),
    };

    let migrated = data.migrate_legacy(aliases);
    let store = Self { path, data };
    if migrated {
      store.save()?;
    }
    info!(
      target: "progress",
      chapters = store.data.unlocked.len(),
      scored_chapters = store.data.best.len(),
      "Progress loaded"
    );
    Ok(store)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Blocking write, done under the controller lock. The document stays a few KB.
  fn save(&self) -> GameResult<()> {
    let parent = match self.path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p,
      _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    serde_json::to_writer_pretty(&mut temp, &self.data)?;
    temp.as_file().sync_all()?;
    temp.persist(&self.path).map_err(|e| e.error)?;
    debug!(target: "progress", path = %self.path.display(), "Progress written");
    Ok(())
  }
}

impl ProgressStore for JsonFileProgressStore {
  fn unlocked_levels(&self, chapter: &str) -> BTreeSet<u32> {
    self.data.unlocked_levels(chapter)
  }

  fn unlock(&mut self, chapter: &str, level: u32) -> GameResult<bool> {
    let added = self.data.unlock(chapter, level);
    if added {
      self.save()?;
      info!(target: "progress", chapter, level, "Level unlocked");
    }
    Ok(added)
  }

  fn best_result(&self, chapter: &str, level: u32) -> Option<BestResult> {
    self.data.best_result(chapter, level)
  }

  fn record_result(&mut self, chapter: &str, level: u32, score: u32) -> GameResult<bool> {
    let improved = self.data.record_result(chapter, level, score);
    if improved {
      self.save()?;
      info!(target: "progress", chapter, level, score, "New best result");
    } else {
      debug!(target: "progress", chapter, level, score, "Score did not beat stored best");
    }
    Ok(improved)
  }

  fn current_chapter(&self) -> Option<String> {
    self.data.current_chapter.clone()
  }

  fn set_current_chapter(&mut self, chapter: &str) -> GameResult<()> {
    if self.data.current_chapter.as_deref() == Some(chapter) {
      return Ok(());
    }
    self.data.current_chapter = Some(chapter.to_string());
    self.save()
  }

  fn settings(&self) -> AudioSettings {
    self.data.settings
  }

  fn set_settings(&mut self, settings: AudioSettings) -> GameResult<()> {
    if self.data.settings == settings {
      return Ok(());
    }
    self.data.settings = settings;
    debug!(target: "progress", music = settings.music_enabled, sound = settings.sound_enabled, "Audio settings changed");
    self.save()
  }

  fn clear(&mut self) -> GameResult<()> {
    warn!(target: "progress", path = %self.path.display(), "Clearing all progress");
    self.data = self.data.cleared();
    self.save()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::default_legacy_aliases;

  #[test]
  fn level_one_always_unlocked() {
    let store = MemoryProgressStore::new();
    assert!(store.is_unlocked("tang", 1));
    assert!(!store.is_unlocked("tang", 2));
    assert_eq!(store.unlocked_levels("qing"), BTreeSet::from([1]));
  }

  #[test]
  fn unlock_is_idempotent() {
    let mut store = MemoryProgressStore::new();
    assert!(store.unlock("han", 2).expect("unlock"));
    assert!(!store.unlock("han", 2).expect("unlock"));
    assert_eq!(store.unlocked_levels("han"), BTreeSet::from([1, 2]));
  }

  #[test]
  fn best_result_only_improves() {
    let mut store = MemoryProgressStore::new();
    assert!(store.record_result("han", 1, 70).expect("record"));
    assert!(!store.record_result("han", 1, 40).expect("record"));
    assert!(!store.record_result("han", 1, 70).expect("record"));
    assert_eq!(store.best_result("han", 1), Some(BestResult { score: 70, stars: 1 }));
    assert!(store.record_result("han", 1, 100).expect("record"));
    assert_eq!(store.best_result("han", 1), Some(BestResult { score: 100, stars: 3 }));
  }

  #[test]
  fn scored_level_counts_as_unlocked() {
    let mut store = MemoryProgressStore::new();
    store.record_result("song", 5, 10).expect("record");
    assert!(store.is_unlocked("song", 5));
    store.record_result("song", 6, 0).expect("record");
    assert!(!store.is_unlocked("song", 6));
  }

  #[test]
  fn legacy_chapter_is_folded() {
    let mut data = ProgressData::default();
    data.unlocked.insert("weijin".into(), BTreeSet::from([1, 2, 3]));
    data.unlocked.insert("sanguo".into(), BTreeSet::from([1, 5]));
    data.best.insert("weijin".into(), BTreeMap::from([(1, BestResult::from_score(90)), (2, BestResult::from_score(40))]));
    data.best.insert("sanguo".into(), BTreeMap::from([(1, BestResult::from_score(60))]));
    data.current_chapter = Some("weijin".into());

    assert!(data.migrate_legacy(&default_legacy_aliases()));
    assert!(!data.unlocked.contains_key("weijin"));
    assert_eq!(data.unlocked["sanguo"], BTreeSet::from([1, 2, 3, 5]));
    assert_eq!(data.best["sanguo"][&1u32].score, 90);
    assert_eq!(data.best["sanguo"][&2u32].score, 40);
    assert_eq!(data.current_chapter.as_deref(), Some("sanguo"));
    assert!(!data.migrate_legacy(&default_legacy_aliases()));
  }

  #[test]
  fn file_store_round_trips_and_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("progress.json");
    let aliases = default_legacy_aliases();
    {
      let mut store = JsonFileProgressStore::open(&path, &aliases).expect("open");
      store.unlock("tang", 2).expect("unlock");
      store.record_result("tang", 1, 85).expect("record");
      store.set_current_chapter("tang").expect("chapter");
    }
    let store = JsonFileProgressStore::open(&path, &aliases).expect("reopen");
    assert_eq!(store.unlocked_levels("tang"), BTreeSet::from([1, 2]));
    assert_eq!(store.best_result("tang", 1), Some(BestResult { score: 85, stars: 2 }));
    assert_eq!(store.current_chapter().as_deref(), Some("tang"));
  }

  #[test]
  fn file_store_migrates_on_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.json");
    std::fs::write(&path, r#"{"unlocked":{"weijin":[1,2]},"current_chapter":"weijin"}"#).expect("write");
    let store = JsonFileProgressStore::open(&path, &default_legacy_aliases()).expect("open");
    assert_eq!(store.unlocked_levels("sanguo"), BTreeSet::from([1, 2]));
    let on_disk = std::fs::read_to_string(&path).expect("read");
    assert!(!on_disk.contains("weijin"));
  }

  #[test]
  fn corrupt_save_is_reported_not_overwritten() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.json");
    std::fs::write(&path, "{not json").expect("write");
    assert!(JsonFileProgressStore::open(&path, &HashMap::new()).is_err());
    assert_eq!(std::fs::read_to_string(&path).expect("read"), "{not json");
  }

  #[test]
  fn settings_persist_and_survive_clear() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.json");
    let quiet = AudioSettings { music_enabled: false, sound_enabled: false };
    {
      let mut store = JsonFileProgressStore::open(&path, &HashMap::new()).expect("open");
      assert_eq!(store.settings(), AudioSettings::default());
      store.set_settings(quiet).expect("settings");
      store.unlock("han", 2).expect("unlock");
      store.clear().expect("clear");
    }
    let store = JsonFileProgressStore::open(&path, &HashMap::new()).expect("reopen");
    assert_eq!(store.settings(), quiet);
    assert!(!store.is_unlocked("han", 2));
  }

  #[test]
  fn old_save_without_settings_defaults_to_sound_on() {
    let data: ProgressData = serde_json::from_str(r#"{"unlocked":{"han":[1,2]}}"#).expect("parse");
    assert_eq!(data.settings, AudioSettings::default());
  }

  #[test]
  fn clear_resets_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.json");
    let mut store = JsonFileProgressStore::open(&path, &HashMap::new()).expect("open");
    store.unlock("ming", 4).expect("unlock");
    store.clear().expect("clear");
    let store = JsonFileProgressStore::open(&path, &HashMap::new()).expect("reopen");
    assert_eq!(store.unlocked_levels("ming"), BTreeSet::from([1]));
  }
}
