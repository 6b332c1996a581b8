//! Snapshot building for broadcast

use crate::ws::protocol::ServerMsg;

use super::session::RoomState;

/// Full room state as a `game_event`
pub fn game_event(room: &RoomState) -> ServerMsg {
    ServerMsg::GameEvent {
        game_finished: room.finished,
        player1: room.players.get(&1).cloned(),
        player2: room.players.get(&2).cloned(),
    }
}
