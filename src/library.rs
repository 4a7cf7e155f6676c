//! Content library: every chapter's level catalog plus the shared distractor corpus.
//!
//! Loaded once at startup. Missing files degrade to empty catalogs / an empty corpus,
//! so a broken data directory shows empty level lists instead of failing the service.

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use crate::catalog::LevelCatalog;
use crate::config::GameConfig;
use crate::domain::LevelDefinition;
use crate::error::{GameError, GameResult};
use crate::pool::Corpus;

#[derive(Clone, Debug, Default)]
pub struct ContentLibrary {
  catalogs: HashMap<String, LevelCatalog>,
  corpus: Corpus,
}

impl ContentLibrary {
  pub fn new(catalogs: HashMap<String, LevelCatalog>, corpus: Corpus) -> Self {
    Self { catalogs, corpus }
  }

  #[instrument(level = "info", skip_all, fields(levels_dir = %config.levels_dir.display()))]
  pub async fn load(config: &GameConfig) -> Self {
    let mut catalogs = HashMap::new();
    for chapter in &config.chapters {
      let catalog = LevelCatalog::load(&config.levels_dir, &chapter.id).await;
      if catalog.is_empty() {
        warn!(target: "catalog", chapter = %chapter.id, "Chapter has no playable levels");
      }
      catalogs.insert(chapter.id.clone(), catalog);
    }
    let corpus = Corpus::load(&config.corpus_path).await;

    let total: usize = catalogs.values().map(LevelCatalog::len).sum();
    info!(target: "dynasty_words", chapters = catalogs.len(), levels = total, corpus = corpus.len(), "Content library ready");
    Self::new(catalogs, corpus)
  }

  pub fn catalog(&self, chapter: &str) -> Option<&LevelCatalog> {
    self.catalogs.get(chapter)
  }

  /// Look up one level definition.
  pub fn level(&self, chapter: &str, level: u32) -> GameResult<&LevelDefinition> {
    self
      .catalog(chapter)
      .ok_or_else(|| GameError::InvalidChapter(chapter.to_string()))?
      .get(level)
      .ok_or_else(|| GameError::NotFound { chapter: chapter.to_string(), level })
  }

  pub fn corpus(&self) -> &Corpus {
    &self.corpus
  }
}
