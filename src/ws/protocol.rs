//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{Controls, PlayerId, PlayerState};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Held keys for one or both seats. The server only reads the
    /// sender's own seat.
    PlayerInput {
        #[serde(default)]
        player1: Option<Controls>,
        #[serde(default)]
        player2: Option<Controls>,
    },
}

impl ClientMsg {
    pub fn parse(text: &str) -> Result<Self, InputError> {
        serde_json::from_str(text).map_err(InputError::Malformed)
    }

    /// Controls addressed to `player_id`
    pub fn controls_for(&self, player_id: PlayerId) -> Result<Controls, InputError> {
        match self {
            ClientMsg::PlayerInput { player1, player2 } => {
                let controls = match player_id {
                    1 => player1,
                    2 => player2,
                    _ => &None,
                };
                controls.ok_or(InputError::MissingControls(player_id))
            }
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// A player took a seat
    PlayerJoined { player_id: PlayerId },

    /// A player disconnected
    PlayerLeft { player_id: PlayerId },

    /// Room state after a step
    GameEvent {
        game_finished: bool,
        player1: Option<PlayerState>,
        player2: Option<PlayerState>,
    },
}

/// Input that could not be turned into controls for the sender
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Malformed input: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Input carries no controls for player {0}")]
    MissingControls(PlayerId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_browser_input() {
        let text = r#"{
            "type": "player_input",
            "player1": {"ArrowUp": true, "ArrowDown": false, "ArrowLeft": false, "ArrowRight": true},
            "player2": {"w": false, "s": true, "a": false, "d": false}
        }"#;
        let msg = ClientMsg::parse(text).unwrap();

        let p1 = msg.controls_for(1).unwrap();
        assert!(p1.accelerate() && p1.steer_right());
        let p2 = msg.controls_for(2).unwrap();
        assert!(p2.brake() && !p2.accelerate());
    }

    #[test]
    fn missing_own_seat_is_rejected() {
        let msg = ClientMsg::parse(r#"{"type":"player_input","player1":{"w":true}}"#).unwrap();
        assert!(msg.controls_for(1).is_ok());
        assert!(matches!(
            msg.controls_for(2),
            Err(InputError::MissingControls(2))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        for text in [
            "not json",
            r#"{"player1":{"w":true}}"#,
            r#"{"type":"chat","text":"hi"}"#,
            r#"{"type":"player_input","player1":{"w":1}}"#,
        ] {
            assert!(
                matches!(ClientMsg::parse(text), Err(InputError::Malformed(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn server_messages_match_wire_shape() {
        let joined = serde_json::to_value(ServerMsg::PlayerJoined { player_id: 2 }).unwrap();
        assert_eq!(joined, json!({"type": "player_joined", "player_id": 2}));

        let left = serde_json::to_value(ServerMsg::PlayerLeft { player_id: 1 }).unwrap();
        assert_eq!(left, json!({"type": "player_left", "player_id": 1}));

        let event = serde_json::to_value(ServerMsg::GameEvent {
            game_finished: false,
            player1: Some(PlayerState::new(1)),
            player2: None,
        })
        .unwrap();
        assert_eq!(event["type"], "game_event");
        assert_eq!(event["game_finished"], false);
        assert_eq!(event["player1"]["x"], 200.0);
        assert!(event["player2"].is_null());
    }
}
