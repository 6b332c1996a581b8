//! Per-connection session state machine
//!
//! `Connecting -> Admitted -> Active -> Closed`. A connection that finds its
//! room full never leaves `Connecting`; the socket is refused and no
//! `Connection` is created.

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{simulation, snapshot, Controls, PlayerId, SessionError, SlotGuard};

use super::broadcast::Outbox;
use super::protocol::{ClientMsg, InputError, ServerMsg};

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Admitted,
    Active,
    Closed,
}

/// Something the transport handed us
#[derive(Debug)]
pub enum ConnectionEvent {
    Text(String),
    Binary(usize),
    Disconnected,
}

/// Why an inbound message produced no step
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One admitted client
pub struct Connection {
    id: Uuid,
    room: String,
    seat: Option<SlotGuard>,
    player_id: PlayerId,
    state: ConnectionState,
    app: AppState,
}

impl Connection {
    /// Seat a client in `room` and subscribe its outbox to the room.
    pub fn admit(app: AppState, room: &str, outbox: Outbox) -> Result<Self, SessionError> {
        let seat = app.sessions.admit(room)?;
        let player_id = seat.player_id();
        let id = Uuid::new_v4();

        app.broadcaster.join(room, id, outbox);

        info!(room = %room, player_id, connection_id = %id, "Player admitted");

        Ok(Self {
            id,
            room: room.to_string(),
            seat: Some(seat),
            player_id,
            state: ConnectionState::Admitted,
            app,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Announce the player to the room once the socket is accepted
    pub fn activate(&mut self) {
        if self.state != ConnectionState::Admitted {
            return;
        }
        self.state = ConnectionState::Active;
        self.app.broadcaster.send(
            &self.room,
            &ServerMsg::PlayerJoined {
                player_id: self.player_id,
            },
        );
    }

    /// Feed one transport event through the state machine.
    /// Returns false once the connection is closed.
    pub fn handle(&mut self, event: ConnectionEvent) -> bool {
        match event {
            ConnectionEvent::Text(text) => {
                if let Err(e) = self.dispatch(&text) {
                    warn!(
                        room = %self.room,
                        player_id = self.player_id,
                        error = %e,
                        "Dropped client message"
                    );
                }
            }
            ConnectionEvent::Binary(len) => {
                debug!(player_id = self.player_id, len, "Ignoring binary message");
            }
            ConnectionEvent::Disconnected => self.close(),
        }
        self.state != ConnectionState::Closed
    }

    fn dispatch(&mut self, text: &str) -> Result<(), DispatchError> {
        if self.state != ConnectionState::Active {
            debug!(player_id = self.player_id, state = ?self.state, "Input outside active session");
            return Ok(());
        }

        match ClientMsg::parse(text)? {
            msg @ ClientMsg::PlayerInput { .. } => {
                let controls = msg.controls_for(self.player_id)?;
                self.step(controls)
            }
        }
    }

    /// Apply input, advance the room and broadcast the result as one unit
    fn step(&self, controls: Controls) -> Result<(), DispatchError> {
        let Some(seat) = &self.seat else {
            return Err(SessionError::UnknownPlayer(self.player_id).into());
        };

        let mut room = seat.room().lock();
        room.apply_input(self.player_id, controls)?;
        simulation::step(&mut room, &self.app.rules);
        self.app
            .broadcaster
            .send(&self.room, &snapshot::game_event(&room));
        Ok(())
    }

    /// Free the seat, leave the room and tell whoever is left
    pub fn close(&mut self) {
        let announce = match self.state {
            ConnectionState::Closed => return,
            ConnectionState::Admitted => false,
            ConnectionState::Active => true,
        };
        self.state = ConnectionState::Closed;

        if let Some(seat) = self.seat.take() {
            seat.release();
        }
        self.app.sessions.prune(&self.room);
        self.app.broadcaster.leave(&self.room, self.id);

        if announce {
            self.app.broadcaster.send(
                &self.room,
                &ServerMsg::PlayerLeft {
                    player_id: self.player_id,
                },
            );
        }

        info!(
            room = %self.room,
            player_id = self.player_id,
            connection_id = %self.id,
            "Player disconnected"
        );
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
