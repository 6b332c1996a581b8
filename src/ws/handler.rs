//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::ws::broadcast::OUTBOX_CAPACITY;
use crate::ws::connection::{Connection, ConnectionEvent};

/// Upgrade into the default room
pub async fn ws_default_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let room = state.config.default_room.clone();
    upgrade(ws, state, room)
}

/// Upgrade into a named room
pub async fn ws_room_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<AppState>,
) -> Response {
    upgrade(ws, state, room)
}

/// Take a seat before accepting the socket; a full room is refused outright
fn upgrade(ws: WebSocketUpgrade, state: AppState, room: String) -> Response {
    let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);

    match Connection::admit(state, &room, outbox_tx) {
        Ok(connection) => ws
            .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
            .on_upgrade(move |socket| handle_socket(socket, connection, outbox_rx)),
        Err(e) => {
            warn!(room = %room, error = %e, "Connection refused");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    mut connection: Connection,
    mut outbox_rx: mpsc::Receiver<String>,
) {
    let player_id = connection.player_id();
    let connection_id = connection.id();
    info!(player_id, connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Writer task: room broadcasts -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(text) = outbox_rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                debug!(player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    connection.activate();

    // Reader loop: WebSocket -> connection state machine
    while let Some(result) = ws_stream.next().await {
        let event = match result {
            Ok(Message::Text(text)) => ConnectionEvent::Text(text),
            Ok(Message::Binary(bytes)) => ConnectionEvent::Binary(bytes.len()),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(player_id, "Client initiated close");
                ConnectionEvent::Disconnected
            }
            Err(e) => {
                error!(player_id, error = %e, "WebSocket error");
                ConnectionEvent::Disconnected
            }
        };

        if !connection.handle(event) {
            break;
        }
    }

    // Stream ended without a close frame
    connection.handle(ConnectionEvent::Disconnected);
    writer_handle.abort();

    info!(player_id, connection_id = %connection_id, "WebSocket connection closed");
}
