//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::GameResult;
use crate::logic;
use crate::protocol::{ClientWsMessage, GameOut, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "dynasty_words", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "dynasty_words", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "dynasty_words", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "dynasty_words", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "dynasty_words", "WebSocket disconnected");
}

fn game_reply(result: GameResult<GameOut>) -> ServerWsMessage {
  match result {
    Ok(GameOut { view, event }) => ServerWsMessage::Game { view, event },
    Err(e) => {
      warn!(target: "dynasty_words", error = %e, "WS event rejected");
      ServerWsMessage::Error { message: e.to_string() }
    }
  }
}

#[instrument(level = "debug", skip(state))]
pub async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::ListChapters => ServerWsMessage::Chapters { chapters: logic::list_chapters(state).await },

    ClientWsMessage::ListLevels { chapter_id } => match logic::list_levels(state, &chapter_id).await {
      Ok(levels) => ServerWsMessage::Levels { chapter_id, levels },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::SwitchChapter { chapter_id } => game_reply(logic::switch_chapter(state, &chapter_id).await),

    ClientWsMessage::StartLevel { chapter_id, level_id } => {
      game_reply(logic::start_level(state, &chapter_id, level_id).await)
    }

    ClientWsMessage::SelectCandidate { index, attempt_id } => {
      game_reply(logic::select_candidate(state, index, attempt_id).await)
    }

    ClientWsMessage::Undo { attempt_id } => game_reply(Ok(logic::undo(state, attempt_id).await)),

    ClientWsMessage::Restart => game_reply(logic::restart(state).await),

    ClientWsMessage::Advance => game_reply(logic::advance(state).await),

    ClientWsMessage::Hint => game_reply(logic::toggle_hint(state).await),

    ClientWsMessage::Snapshot => game_reply(Ok(logic::snapshot(state).await)),

    ClientWsMessage::ClearProgress => game_reply(logic::clear_progress(state).await),

    ClientWsMessage::GetSettings => ServerWsMessage::Settings { settings: logic::settings(state).await },

    ClientWsMessage::SaveSettings { settings } => match logic::save_settings(state, settings).await {
      Ok(settings) => ServerWsMessage::Settings { settings },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },
  }
}
