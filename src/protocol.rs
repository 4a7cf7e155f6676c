//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::controller::{ChapterSummary, GameView, LevelEntry};
use crate::domain::{AudioSettings, HintStage};
use crate::session::{SelectOutcome, UndoOutcome};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    ListChapters,
    ListLevels {
        #[serde(rename = "chapterId")]
        chapter_id: String,
    },
    SwitchChapter {
        #[serde(rename = "chapterId")]
        chapter_id: String,
    },
    StartLevel {
        #[serde(rename = "chapterId")]
        chapter_id: String,
        #[serde(rename = "levelId")]
        level_id: u32,
    },
    SelectCandidate {
        index: usize,
        #[serde(rename = "attemptId", default)]
        attempt_id: Option<Uuid>,
    },
    Undo {
        #[serde(rename = "attemptId", default)]
        attempt_id: Option<Uuid>,
    },
    Restart,
    Advance,
    Hint,
    Snapshot,
    ClearProgress,
    GetSettings,
    SaveSettings {
        settings: AudioSettings,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Chapters {
        chapters: Vec<ChapterSummary>,
    },
    Levels {
        #[serde(rename = "chapterId")]
        chapter_id: String,
        levels: Vec<LevelEntry>,
    },
    /// Game state after an event, plus what that event did (if anything).
    Game {
        view: GameView,
        #[serde(skip_serializing_if = "Option::is_none")]
        event: Option<EventOut>,
    },
    Settings {
        settings: AudioSettings,
    },
    Error {
        message: String,
    },
}

/// Effect of one gameplay event, for the front-end's sounds and animations.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventOut {
    Select { outcome: SelectOutcome },
    Undo { outcome: UndoOutcome },
    Hint { stage: HintStage },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct ChapterIn {
    #[serde(rename = "chapterId")]
    pub chapter_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StartLevelIn {
    #[serde(rename = "chapterId")]
    pub chapter_id: String,
    #[serde(rename = "levelId")]
    pub level_id: u32,
}

#[derive(Debug, Deserialize)]
pub struct SelectIn {
    pub index: usize,
    #[serde(rename = "attemptId", default)]
    pub attempt_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UndoIn {
    #[serde(rename = "attemptId", default)]
    pub attempt_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ChaptersOut {
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Serialize)]
pub struct LevelsOut {
    #[serde(rename = "chapterId")]
    pub chapter_id: String,
    pub levels: Vec<LevelEntry>,
}

#[derive(Serialize)]
pub struct GameOut {
    pub view: GameView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventOut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsBody {
    pub settings: AudioSettings,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
