//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::snapshot;
use crate::util::time::uptime_secs;
use crate::ws::handler::{ws_default_handler, ws_room_handler};
use crate::ws::protocol::ServerMsg;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // No configured origins means any page may connect
    let cors = if state.config.client_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let allowed_origins: Vec<HeaderValue> = state
            .config
            .client_origins
            .iter()
            .filter_map(|s| s.parse::<HeaderValue>().ok())
            .collect();
        cors.allow_origin(allowed_origins)
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws/game", get(ws_default_handler))
        .route("/ws/game/", get(ws_default_handler))
        .route("/ws/game/:room", get(ws_room_handler))
        .route("/rooms/:room", get(room_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_rooms: usize,
    active_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_rooms: state.sessions.active_rooms(),
        active_players: state.sessions.total_players(),
    })
}

// ============================================================================
// Room inspection
// ============================================================================

/// Latest `game_event` for a room, as a late joiner would see it
async fn room_handler(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<ServerMsg>, AppError> {
    let room = state
        .sessions
        .get(&room)
        .ok_or_else(|| AppError::NotFound(format!("room {room}")))?;

    let event = snapshot::game_event(&room.lock());
    Ok(Json(event))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
