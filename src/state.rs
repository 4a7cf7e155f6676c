//! Application state: configuration plus the single game controller.
//!
//! Startup order: config (TOML via env), content library (level tables + corpus),
//! progress store (JSON save file, or memory when the file is unusable).

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::config::{load_game_config_from_env, GameConfig};
use crate::controller::ChapterController;
use crate::library::ContentLibrary;
use crate::progress::{JsonFileProgressStore, MemoryProgressStore, ProgressStore};

pub struct AppState {
    pub config: GameConfig,
    /// One player, one controller. Events are serialized through this lock.
    pub game: Mutex<ChapterController>,
}

impl AppState {
    /// Build state from env: load config, content and saved progress.
    #[instrument(level = "info", skip_all)]
    pub async fn new() -> Self {
        let config = load_game_config_from_env();
        let library = ContentLibrary::load(&config).await;
        let store = open_progress_store(&config);
        Self::with_parts(config, library, store, StdRng::from_entropy())
    }

    pub fn with_parts(config: GameConfig, library: ContentLibrary, store: Box<dyn ProgressStore>, rng: StdRng) -> Self {
        let controller = ChapterController::new(&config, Arc::new(library), store, rng);
        Self { config, game: Mutex::new(controller) }
    }
}

/// A corrupt or unreadable save is left on disk untouched; the session then runs unsaved.
fn open_progress_store(config: &GameConfig) -> Box<dyn ProgressStore> {
    match JsonFileProgressStore::open(&config.progress_path, &config.legacy_chapter_aliases) {
        Ok(store) => {
            info!(target: "progress", path = %store.path().display(), "Using JSON progress file");
            Box::new(store)
        }
        Err(e) => {
            error!(target: "progress", path = %config.progress_path.display(), error = %e, "Cannot use progress file; progress will not be saved");
            Box::new(MemoryProgressStore::new())
        }
    }
}
