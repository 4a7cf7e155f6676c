//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - JSON API under `/api/v1/...`, one endpoint per game event
/// - Static front-end from `config.static_dir` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let static_service = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/chapters", get(http::http_get_chapters))
        .route("/api/v1/chapters/:chapter_id/levels", get(http::http_get_levels))
        .route("/api/v1/chapter", post(http::http_post_chapter))
        .route("/api/v1/game", get(http::http_get_game))
        .route("/api/v1/level/start", post(http::http_post_start))
        .route("/api/v1/level/select", post(http::http_post_select))
        .route("/api/v1/level/undo", post(http::http_post_undo))
        .route("/api/v1/level/restart", post(http::http_post_restart))
        .route("/api/v1/level/advance", post(http::http_post_advance))
        .route("/api/v1/level/hint", post(http::http_post_hint))
        .route("/api/v1/progress", delete(http::http_delete_progress))
        .route("/api/v1/settings", get(http::http_get_settings).put(http::http_put_settings))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}
