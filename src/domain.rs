//! Domain models used by the engine: level definitions, chapters, results and star ratings.

use serde::{Deserialize, Serialize};

/// One row of a chapter's level table. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
  pub id: u32,
  /// Target phrase as individual characters, already normalized.
  pub target: Vec<char>,
  pub distractor_count: usize,
  pub max_mistakes: u32,
  #[serde(default)] pub hint_primary: String,
  #[serde(default)] pub hint_secondary: String,
}

impl LevelDefinition {
  pub fn target_text(&self) -> String {
    self.target.iter().collect()
  }
}

/// A themed group of levels ("dynasty") with its own unlock namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
  pub id: String,
  pub name: String,
}

/// Display stars for a score: 100 → 3, 80 → 2, 60 → 1, otherwise 0.
///
/// Independent from the unlock gate, which is a flat threshold configured separately.
pub fn stars_for_score(score: u32) -> u8 {
  match score {
    s if s >= 100 => 3,
    s if s >= 80 => 2,
    s if s >= 60 => 1,
    _ => 0,
  }
}

/// Best result recorded for one level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestResult {
  pub score: u32,
  pub stars: u8,
}

impl BestResult {
  pub fn from_score(score: u32) -> Self {
    Self { score, stars: stars_for_score(score) }
  }
}

/// Selection status of one candidate in the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
  Unselected,
  CorrectlyPlaced,
  WronglySelected,
}

/// Lifecycle of a level attempt. `Won` and `Lost` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
  InProgress,
  Won,
  Lost,
}

impl SessionState {
  pub fn is_terminal(self) -> bool {
    !matches!(self, SessionState::InProgress)
  }
}

/// Hint reveal cycle: first press shows hint 1, second shows both, third hides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintStage {
  #[default]
  Hidden,
  Primary,
  Both,
}

impl HintStage {
  pub fn next(self) -> Self {
    match self {
      HintStage::Hidden => HintStage::Primary,
      HintStage::Primary => HintStage::Both,
      HintStage::Both => HintStage::Hidden,
    }
  }
}

/// Player audio switches. Playback itself lives in the front-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
  pub music_enabled: bool,
  pub sound_enabled: bool,
}

impl Default for AudioSettings {
  fn default() -> Self {
    Self { music_enabled: true, sound_enabled: true }
  }
}

/// Final result of a finished attempt, handed to the progress store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TerminalOutcome {
  pub state: SessionState,
  pub score: u32,
  pub stars: u8,
}
