//! Candidate pool construction: common-character corpus + distractor sampling.

use std::collections::HashSet;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error, info, instrument};

use crate::util::is_blank;

/// Shared list of common characters used as distractor source.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
  chars: Vec<char>,
}

impl Corpus {
  /// Every non-blank character is one entry; duplicates keep their first position.
  pub fn from_text(text: &str) -> Self {
    let mut seen = HashSet::new();
    let chars = text.chars().filter(|c| !is_blank(*c) && seen.insert(*c)).collect();
    Self { chars }
  }

  /// Read the corpus file. A failure degrades to an empty corpus.
  #[instrument(level = "info", skip(path), fields(path = %path.display()))]
  pub async fn load(path: &Path) -> Self {
    match tokio::fs::read_to_string(path).await {
      Ok(text) => {
        let corpus = Self::from_text(&text);
        info!(target: "dynasty_words", size = corpus.len(), "Loaded common-character corpus");
        corpus
      }
      Err(e) => {
        error!(target: "dynasty_words", error = %e, "Failed to read corpus; pools will have no distractors");
        Self::default()
      }
    }
  }

  pub fn chars(&self) -> &[char] {
    &self.chars
  }

  pub fn len(&self) -> usize {
    self.chars.len()
  }
}

/// Build a shuffled candidate pool: every target character (duplicates kept)
/// plus up to `distractor_count` distinct corpus characters absent from the target.
///
/// A corpus too small for the request just yields fewer distractors.
pub fn build_pool<R: Rng + ?Sized>(target: &[char], distractor_count: usize, corpus: &[char], rng: &mut R) -> Vec<char> {
  let in_target: HashSet<char> = target.iter().copied().collect();
  let available: Vec<char> = corpus.iter().copied().filter(|c| !in_target.contains(c)).collect();

  let mut pool = target.to_vec();
  pool.extend(available.choose_multiple(rng, distractor_count.min(available.len())).copied());
  pool.shuffle(rng);

  debug!(target: "session", target_len = target.len(), requested = distractor_count, drawn = pool.len() - target.len(), "Built candidate pool");
  pool
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashMap;

  fn counts(chars: &[char]) -> HashMap<char, usize> {
    let mut m = HashMap::new();
    for c in chars {
      *m.entry(*c).or_insert(0) += 1;
    }
    m
  }

  #[test]
  fn corpus_dedups_and_drops_blanks() {
    let c = Corpus::from_text("天 地\n天\u{200B}玄");
    assert_eq!(c.chars(), &['天', '地', '玄']);
  }

  #[test]
  fn pool_keeps_target_multiset_and_excludes_target_from_distractors() {
    let mut rng = StdRng::seed_from_u64(7);
    let target = ['人', '人', '山'];
    let corpus: Vec<char> = "人山水火木金土日月".chars().collect();
    let pool = build_pool(&target, 4, &corpus, &mut rng);
    assert_eq!(pool.len(), 7);

    let pc = counts(&pool);
    assert_eq!(pc[&'人'], 2);
    assert_eq!(pc[&'山'], 1);
    let distractors: Vec<char> = pool.iter().copied().filter(|c| !target.contains(c)).collect();
    assert_eq!(distractors.len(), 4);
    let unique: HashSet<char> = distractors.iter().copied().collect();
    assert_eq!(unique.len(), 4, "drawn without replacement");
  }

  #[test]
  fn small_corpus_is_not_an_error() {
    let mut rng = StdRng::seed_from_u64(1);
    let pool = build_pool(&['天', '地'], 10, &['天', '玄'], &mut rng);
    assert_eq!(pool.len(), 3);
    assert!(pool.contains(&'玄'));

    let pool = build_pool(&['天'], 5, &[], &mut rng);
    assert_eq!(pool, vec!['天']);
  }

  #[test]
  fn zero_distractors_is_a_permutation_of_target() {
    let mut rng = StdRng::seed_from_u64(3);
    let target: Vec<char> = "学而时习之".chars().collect();
    let pool = build_pool(&target, 0, &['一', '二'], &mut rng);
    assert_eq!(counts(&pool), counts(&target));
  }
}
