//! Level session: the per-attempt scoring and state engine.
//!
//! A session owns the shuffled candidate pool for one level attempt and applies
//! selection/undo events to it:
//!   - a correct pick fills the leftmost open slot needing that character and
//!     earns that slot's positional award (awards over a full phrase sum to 100)
//!   - a wrong pick (or a pick of a character whose slots are all filled) costs
//!     one mistake and a length-dependent penalty
//!   - the attempt is `Won` once every slot is filled, `Lost` when mistakes run out
//!
//! Score is clamped to [0, 100] after every update. Events against a finished
//! attempt, or against an already used candidate, are ignored.

use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::{
  stars_for_score, CandidateStatus, HintStage, LevelDefinition, SessionState, TerminalOutcome,
};
use crate::error::{GameError, GameResult};
use crate::pinyin::char_pinyin;

pub const MAX_SCORE: u32 = 100;

/// Award for filling slot `slot` (0-based) of a phrase of `len` characters.
///
/// `100 / len` each, with the first `100 % len` slots earning one extra point.
pub fn positional_award(len: usize, slot: usize) -> u32 {
  if len == 0 {
    return 0;
  }
  let len = len as u32;
  let base = MAX_SCORE / len;
  let remainder = (MAX_SCORE % len) as usize;
  if slot < remainder { base + 1 } else { base }
}

/// Penalty for one wrong selection; depends only on the phrase length.
pub fn wrong_penalty(len: usize) -> u32 {
  match len {
    0..=2 => 15,
    3..=4 => 20,
    5..=6 => 25,
    _ => 30,
  }
}

/// What a selection did, for the presentation layer to animate / play sounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectOutcome {
  /// Stale or repeated event; nothing changed.
  Ignored,
  Placed { slot: usize, award: u32 },
  /// `duplicate` is set when the character belongs to the phrase but all its slots are full.
  Wrong { penalty: u32, duplicate: bool },
  Won { slot: usize, award: u32 },
  Lost { penalty: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndoOutcome {
  Nothing,
  Undone { index: usize, restored: u32 },
}

#[derive(Clone, Copy, Debug)]
enum Selection {
  Placed,
  /// `deducted` is what actually came off the score (the penalty may have been clamped at 0).
  Wrong { index: usize, deducted: u32 },
}

#[derive(Clone, Debug)]
pub struct LevelSession {
  attempt_id: Uuid,
  chapter_id: String,
  level: LevelDefinition,
  candidates: Vec<char>,
  statuses: Vec<CandidateStatus>,
  /// Candidate index that filled each target slot.
  slots: Vec<Option<usize>>,
  score: u32,
  mistakes_remaining: u32,
  history: Vec<Selection>,
  /// Only the latest wrong pick is undoable, and only once.
  undo_armed: bool,
  state: SessionState,
  hint_stage: HintStage,
}

impl LevelSession {
  pub fn new(chapter_id: impl Into<String>, level: LevelDefinition, candidates: Vec<char>) -> Self {
    let n = candidates.len();
    let slots = vec![None; level.target.len()];
    let mistakes_remaining = level.max_mistakes;
    Self {
      attempt_id: Uuid::new_v4(),
      chapter_id: chapter_id.into(),
      level,
      candidates,
      statuses: vec![CandidateStatus::Unselected; n],
      slots,
      score: 0,
      mistakes_remaining,
      history: Vec::new(),
      undo_armed: false,
      state: SessionState::InProgress,
      hint_stage: HintStage::Hidden,
    }
  }

  pub fn attempt_id(&self) -> Uuid {
    self.attempt_id
  }

  pub fn chapter_id(&self) -> &str {
    &self.chapter_id
  }

  pub fn level(&self) -> &LevelDefinition {
    &self.level
  }

  pub fn score(&self) -> u32 {
    self.score
  }

  pub fn mistakes_remaining(&self) -> u32 {
    self.mistakes_remaining
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn pool_size(&self) -> usize {
    self.candidates.len()
  }

  pub fn can_undo(&self) -> bool {
    self.state == SessionState::InProgress && self.undo_armed
  }

  /// Final score and stars once the attempt is over.
  pub fn outcome(&self) -> Option<TerminalOutcome> {
    self
      .state
      .is_terminal()
      .then(|| TerminalOutcome { state: self.state, score: self.score, stars: stars_for_score(self.score) })
  }

  #[instrument(level = "debug", skip(self), fields(attempt = %self.attempt_id, level = self.level.id))]
  pub fn select_candidate(&mut self, index: usize) -> GameResult<SelectOutcome> {
    let pool_size = self.candidates.len();
    if index >= pool_size {
      return Err(GameError::IndexOutOfRange { index, pool_size });
    }
    if self.state.is_terminal() || self.statuses[index] != CandidateStatus::Unselected {
      debug!(target: "session", index, state = ?self.state, "Ignoring selection");
      return Ok(SelectOutcome::Ignored);
    }

    let ch = self.candidates[index];
    let open_slot = self
      .level
      .target
      .iter()
      .zip(&self.slots)
      .position(|(t, filled)| *t == ch && filled.is_none());

    match open_slot {
      Some(slot) => {
        let award = positional_award(self.level.target.len(), slot);
        self.slots[slot] = Some(index);
        self.statuses[index] = CandidateStatus::CorrectlyPlaced;
        self.history.push(Selection::Placed);
        self.score = (self.score + award).min(MAX_SCORE);
        debug!(target: "session", index, slot, award, score = self.score, "Correct placement");

        if self.slots.iter().all(Option::is_some) {
          self.state = SessionState::Won;
          info!(target: "session", chapter = %self.chapter_id, level = self.level.id, score = self.score, "Level won");
          Ok(SelectOutcome::Won { slot, award })
        } else {
          Ok(SelectOutcome::Placed { slot, award })
        }
      }
      None => {
        let duplicate = self.level.target.contains(&ch);
        let penalty = wrong_penalty(self.level.target.len());
        let before = self.score;
        self.score = before.saturating_sub(penalty);
        self.mistakes_remaining = self.mistakes_remaining.saturating_sub(1);
        self.statuses[index] = CandidateStatus::WronglySelected;
        self.history.push(Selection::Wrong { index, deducted: before - self.score });
        self.undo_armed = true;
        debug!(target: "session", index, penalty, duplicate, score = self.score, mistakes_remaining = self.mistakes_remaining, "Wrong selection");

        if self.mistakes_remaining == 0 {
          self.state = SessionState::Lost;
          info!(target: "session", chapter = %self.chapter_id, level = self.level.id, score = self.score, "Level lost");
          Ok(SelectOutcome::Lost { penalty })
        } else {
          Ok(SelectOutcome::Wrong { penalty, duplicate })
        }
      }
    }
  }

  /// Revert the most recent wrong selection: candidate back to unselected,
  /// one mistake returned, and the score it cost restored.
  #[instrument(level = "debug", skip(self), fields(attempt = %self.attempt_id))]
  pub fn undo_last_wrong_selection(&mut self) -> UndoOutcome {
    if !self.can_undo() {
      return UndoOutcome::Nothing;
    }
    let Some(pos) = self.history.iter().rposition(|s| matches!(s, Selection::Wrong { .. })) else {
      self.undo_armed = false;
      return UndoOutcome::Nothing;
    };
    let Selection::Wrong { index, deducted } = self.history.remove(pos) else {
      return UndoOutcome::Nothing;
    };

    self.statuses[index] = CandidateStatus::Unselected;
    self.mistakes_remaining += 1;
    self.score = (self.score + deducted).min(MAX_SCORE);
    self.undo_armed = false;
    debug!(target: "session", index, restored = deducted, score = self.score, "Undid wrong selection");
    UndoOutcome::Undone { index, restored: deducted }
  }

  pub fn toggle_hint(&mut self) -> HintStage {
    self.hint_stage = self.hint_stage.next();
    self.hint_stage
  }

  /// Immutable view for the presentation layer.
  pub fn snapshot(&self) -> SessionSnapshot {
    let candidates = self
      .candidates
      .iter()
      .zip(&self.statuses)
      .enumerate()
      .map(|(index, (ch, status))| CandidateView { index, ch: ch.to_string(), pinyin: char_pinyin(*ch), status: *status })
      .collect();
    let slots = self.slots.iter().map(|s| s.map(|i| self.candidates[i].to_string())).collect();
    let hints = match self.hint_stage {
      HintStage::Hidden => vec![],
      HintStage::Primary => vec![self.level.hint_primary.clone()],
      HintStage::Both => vec![self.level.hint_primary.clone(), self.level.hint_secondary.clone()],
    };

    SessionSnapshot {
      attempt_id: self.attempt_id,
      chapter_id: self.chapter_id.clone(),
      level_id: self.level.id,
      target_len: self.level.target.len(),
      candidates,
      slots,
      score: self.score,
      stars: stars_for_score(self.score),
      mistakes_remaining: self.mistakes_remaining,
      max_mistakes: self.level.max_mistakes,
      state: self.state,
      can_undo: self.can_undo(),
      hint_stage: self.hint_stage,
      hints,
    }
  }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
  pub index: usize,
  pub ch: String,
  pub pinyin: Option<String>,
  pub status: CandidateStatus,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
  pub attempt_id: Uuid,
  pub chapter_id: String,
  pub level_id: u32,
  pub target_len: usize,
  pub candidates: Vec<CandidateView>,
  /// Filled slots carry their character; open slots are `null`.
  pub slots: Vec<Option<String>>,
  pub score: u32,
  pub stars: u8,
  pub mistakes_remaining: u32,
  pub max_mistakes: u32,
  pub state: SessionState,
  pub can_undo: bool,
  pub hint_stage: HintStage,
  pub hints: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn level(target: &str, max_mistakes: u32) -> LevelDefinition {
    LevelDefinition {
      id: 1,
      target: target.chars().collect(),
      distractor_count: 0,
      max_mistakes,
      hint_primary: "hint one".into(),
      hint_secondary: "hint two".into(),
    }
  }

  fn session(target: &str, pool: &str, max_mistakes: u32) -> LevelSession {
    LevelSession::new("xianqin", level(target, max_mistakes), pool.chars().collect())
  }

  fn index_of(s: &LevelSession, ch: char) -> usize {
    s.snapshot()
      .candidates
      .iter()
      .find(|c| c.ch == ch.to_string() && c.status == CandidateStatus::Unselected)
      .map(|c| c.index)
      .expect("candidate present")
  }

  #[test]
  fn awards_sum_to_100_for_every_length() {
    for len in 1..=20 {
      let total: u32 = (0..len).map(|p| positional_award(len, p)).sum();
      assert_eq!(total, 100, "len={len}");
    }
    assert_eq!(positional_award(3, 0), 34);
    assert_eq!(positional_award(3, 2), 33);
  }

  #[test]
  fn penalty_table() {
    assert_eq!(wrong_penalty(1), 15);
    assert_eq!(wrong_penalty(2), 15);
    assert_eq!(wrong_penalty(3), 20);
    assert_eq!(wrong_penalty(4), 20);
    assert_eq!(wrong_penalty(5), 25);
    assert_eq!(wrong_penalty(6), 25);
    assert_eq!(wrong_penalty(7), 30);
    assert_eq!(wrong_penalty(40), 30);
  }

  #[test]
  fn two_char_level_won_in_either_order() {
    for order in [['天', '地'], ['地', '天']] {
      let mut s = session("天地", "玄天黄地", 3);
      let first = s.select_candidate(index_of(&s, order[0])).expect("select");
      assert!(matches!(first, SelectOutcome::Placed { award: 50, .. }));
      let second = s.select_candidate(index_of(&s, order[1])).expect("select");
      assert!(matches!(second, SelectOutcome::Won { award: 50, .. }));
      assert_eq!(s.score(), 100);
      let out = s.outcome().expect("terminal");
      assert_eq!(out.state, SessionState::Won);
      assert_eq!(out.stars, 3);
    }
  }

  #[test]
  fn duplicate_characters_fill_leftmost_open_slot() {
    let mut s = session("人山人", "人人山", 3);
    let r = s.select_candidate(0).expect("select");
    assert_eq!(r, SelectOutcome::Placed { slot: 0, award: 34 });
    let r = s.select_candidate(1).expect("select");
    assert_eq!(r, SelectOutcome::Placed { slot: 2, award: 33 });
    let snap = s.snapshot();
    assert_eq!(snap.slots, vec![Some("人".to_string()), None, Some("人".to_string())]);
  }

  #[test]
  fn selecting_exhausted_correct_character_is_a_mistake() {
    let mut s = session("天地", "天天地", 3);
    s.select_candidate(0).expect("select");
    let r = s.select_candidate(1).expect("select");
    assert_eq!(r, SelectOutcome::Wrong { penalty: 15, duplicate: true });
    assert_eq!(s.mistakes_remaining(), 2);
    assert_eq!(s.score(), 35);
    assert_eq!(s.snapshot().candidates[1].status, CandidateStatus::WronglySelected);
  }

  #[test]
  fn repeated_and_out_of_range_selections() {
    let mut s = session("天地", "天地玄", 3);
    s.select_candidate(0).expect("select");
    assert_eq!(s.select_candidate(0).expect("select"), SelectOutcome::Ignored);
    assert!(matches!(s.select_candidate(3), Err(GameError::IndexOutOfRange { index: 3, pool_size: 3 })));
  }

  #[test]
  fn wrong_penalty_then_undo_restores_exactly() {
    let mut s = session("学而时习之", "学而时习之甲乙", 3);
    for ch in ['学', '而', '时'] {
      s.select_candidate(index_of(&s, ch)).expect("select");
    }
    assert_eq!(s.score(), 60);
    let wrong = index_of(&s, '甲');
    assert_eq!(s.select_candidate(wrong).expect("select"), SelectOutcome::Wrong { penalty: 25, duplicate: false });
    assert_eq!(s.score(), 35);
    assert_eq!(s.mistakes_remaining(), 2);

    assert_eq!(s.undo_last_wrong_selection(), UndoOutcome::Undone { index: wrong, restored: 25 });
    assert_eq!(s.score(), 60);
    assert_eq!(s.mistakes_remaining(), 3);
    assert_eq!(s.snapshot().candidates[wrong].status, CandidateStatus::Unselected);
    assert_eq!(s.undo_last_wrong_selection(), UndoOutcome::Nothing);
  }

  #[test]
  fn undo_twice_only_reverts_latest_wrong() {
    let mut s = session("天地", "天地甲乙丙", 5);
    s.select_candidate(index_of(&s, '甲')).expect("select");
    s.select_candidate(index_of(&s, '乙')).expect("select");
    assert_eq!(s.mistakes_remaining(), 3);
    assert!(matches!(s.undo_last_wrong_selection(), UndoOutcome::Undone { .. }));
    assert_eq!(s.undo_last_wrong_selection(), UndoOutcome::Nothing);
    assert_eq!(s.mistakes_remaining(), 4);
  }

  #[test]
  fn undo_restores_clamped_penalty_to_pre_penalty_score() {
    let mut s = session("一二三四五六七八九十", "一二甲", 5);
    s.select_candidate(0).expect("select");
    assert_eq!(s.score(), 10);
    s.select_candidate(2).expect("select");
    assert_eq!(s.score(), 0);
    s.undo_last_wrong_selection();
    assert_eq!(s.score(), 10);
  }

  #[test]
  fn undo_keeps_later_correct_placements() {
    let mut s = session("天地人", "天地人甲", 3);
    s.select_candidate(0).expect("select");
    s.select_candidate(3).expect("select");
    assert_eq!(s.score(), 14);
    s.select_candidate(1).expect("select");
    assert_eq!(s.score(), 47);
    s.undo_last_wrong_selection();
    assert_eq!(s.score(), 67);
    assert_eq!(s.mistakes_remaining(), 3);
    let snap = s.snapshot();
    assert_eq!(snap.candidates[0].status, CandidateStatus::CorrectlyPlaced);
    assert_eq!(snap.candidates[1].status, CandidateStatus::CorrectlyPlaced);
    assert_eq!(snap.candidates[3].status, CandidateStatus::Unselected);
  }

  #[test]
  fn single_mistake_allowance_loses_immediately() {
    let mut s = session("天地", "天地甲", 1);
    assert_eq!(s.select_candidate(2).expect("select"), SelectOutcome::Lost { penalty: 15 });
    assert_eq!(s.state(), SessionState::Lost);
    assert_eq!(s.select_candidate(0).expect("select"), SelectOutcome::Ignored);
    assert_eq!(s.undo_last_wrong_selection(), UndoOutcome::Nothing);
    let out = s.outcome().expect("terminal");
    assert_eq!(out.score, 0);
  }

  #[test]
  fn hints_cycle_in_snapshot() {
    let mut s = session("天地", "天地", 1);
    assert!(s.snapshot().hints.is_empty());
    s.toggle_hint();
    assert_eq!(s.snapshot().hints, vec!["hint one".to_string()]);
    s.toggle_hint();
    assert_eq!(s.snapshot().hints.len(), 2);
    assert_eq!(s.toggle_hint(), HintStage::Hidden);
    assert!(s.snapshot().hints.is_empty());
  }

  #[test]
  fn snapshot_reports_progress() {
    let mut s = session("天地", "地天", 2);
    s.select_candidate(1).expect("select");
    let snap = s.snapshot();
    assert_eq!(snap.target_len, 2);
    assert_eq!(snap.slots, vec![Some("天".to_string()), None]);
    assert_eq!(snap.score, 50);
    assert_eq!(snap.stars, 0);
    assert_eq!(snap.state, SessionState::InProgress);
    assert_eq!(snap.candidates[1].pinyin.as_deref(), Some("tiān"));
  }

  proptest! {
    #[test]
    fn score_stays_in_range_and_won_iff_all_slots_filled(
      target in "[天地人山水]{1,8}",
      picks in proptest::collection::vec(0usize..12, 0..40),
      max_mistakes in 1u32..5,
      undo_mask in proptest::collection::vec(any::<bool>(), 40),
    ) {
      let mut pool: Vec<char> = target.chars().collect();
      pool.extend("甲乙丙".chars());
      pool.extend("天地".chars());
      let size = pool.len();
      let mut s = LevelSession::new("han", level(&target, max_mistakes), pool);

      for (i, p) in picks.into_iter().enumerate() {
        let _ = s.select_candidate(p % size).expect("index in range");
        prop_assert!(s.score() <= MAX_SCORE);
        if undo_mask[i] {
          let before = (s.score(), s.mistakes_remaining());
          if let UndoOutcome::Undone { .. } = s.undo_last_wrong_selection() {
            prop_assert!(s.mistakes_remaining() == before.1 + 1);
          }
          prop_assert!(s.score() <= MAX_SCORE);
        }
        let snap = s.snapshot();
        let all_filled = snap.slots.iter().all(Option::is_some);
        prop_assert_eq!(s.state() == SessionState::Won, all_filled);
        if s.state() == SessionState::Lost {
          prop_assert_eq!(s.mistakes_remaining(), 0);
          prop_assert!(!all_filled);
        }
      }
    }

    #[test]
    fn penalty_is_pure_in_length(len in 1usize..64) {
      prop_assert_eq!(wrong_penalty(len), wrong_penalty(len));
      prop_assert!([15, 20, 25, 30].contains(&wrong_penalty(len)));
    }
  }
}
