//! Room membership and slot assignment

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::player::{Controls, PlayerId, PlayerState};

/// Seats per room
pub const MAX_PLAYERS: usize = 2;

/// Slot pool; admission always takes the lowest free one
const SLOTS: [PlayerId; MAX_PLAYERS] = [1, 2];

/// Session errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Room {room} is full")]
    CapacityExceeded { room: String },

    #[error("Player {0} is not in the room")]
    UnknownPlayer(PlayerId),
}

/// Everything the server knows about one race
#[derive(Debug, Clone)]
pub struct RoomState {
    pub name: String,
    /// Keyed by slot so iteration is in ascending id order
    pub players: BTreeMap<PlayerId, PlayerState>,
    /// Latched once any player reaches the lap target
    pub finished: bool,
}

impl RoomState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            players: BTreeMap::new(),
            finished: false,
        }
    }

    fn free_slot(&self) -> Option<PlayerId> {
        SLOTS
            .iter()
            .copied()
            .find(|slot| !self.players.contains_key(slot))
    }

    /// Seat a new player on the lowest free slot
    pub fn admit(&mut self) -> Result<PlayerId, SessionError> {
        let id = self
            .free_slot()
            .ok_or_else(|| SessionError::CapacityExceeded {
                room: self.name.clone(),
            })?;

        self.players.insert(id, PlayerState::new(id));
        Ok(id)
    }

    /// Remove a player. Missing players are ignored.
    pub fn evict(&mut self, id: PlayerId) -> Option<PlayerState> {
        self.players.remove(&id)
    }

    /// Replace a player's held keys wholesale
    pub fn apply_input(
        &mut self,
        id: PlayerId,
        controls: Controls,
    ) -> Result<&PlayerState, SessionError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(SessionError::UnknownPlayer(id))?;
        player.controls = controls;
        Ok(player)
    }
}

/// A room and the lock serializing every read-modify-write on it
#[derive(Debug)]
pub struct Room {
    name: String,
    state: Mutex<RoomState>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            state: Mutex::new(RoomState::new(name.clone())),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exclusive access to the room. Hold it across input, step and
    /// broadcast enqueue so both players' steps never interleave.
    pub fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock()
    }

    pub fn player_count(&self) -> usize {
        self.state.lock().players.len()
    }
}

/// A seat held by a connection. Dropping it frees the seat.
#[derive(Debug)]
pub struct SlotGuard {
    room: Arc<Room>,
    player_id: PlayerId,
    released: bool,
}

impl SlotGuard {
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    /// Free the seat now
    pub fn release(mut self) -> Option<PlayerState> {
        self.released = true;
        self.room.lock().evict(self.player_id)
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                room = %self.room.name(),
                player_id = self.player_id,
                "Seat abandoned before session ended"
            );
            self.room.lock().evict(self.player_id);
        }
    }
}

/// All rooms. A room is created on first connection and dropped again once
/// its last player leaves, except the default room which lives until shutdown.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    rooms: DashMap<String, Arc<Room>>,
    default_room: String,
}

impl SessionRegistry {
    pub fn new(default_room: impl Into<String>) -> Self {
        Self {
            rooms: DashMap::new(),
            default_room: default_room.into(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.get(name).map(|r| r.value().clone())
    }

    /// Take a seat in `room`
    pub fn admit(&self, room: &str) -> Result<SlotGuard, SessionError> {
        // The map entry stays locked until the seat is taken, so `prune`
        // cannot drop the room in between. Lock order: map shard, then room.
        let entry = self.rooms.entry(room.to_string()).or_insert_with(|| {
            debug!(room = %room, "Creating room");
            Arc::new(Room::new(room))
        });
        let room = entry.value().clone();
        let player_id = room.lock().admit()?;
        drop(entry);

        info!(room = %room.name(), player_id, "Player seated");

        Ok(SlotGuard {
            room,
            player_id,
            released: false,
        })
    }

    /// Drop `room` if nobody is seated in it. The default room is kept.
    /// Returns whether the room was removed.
    pub fn prune(&self, room: &str) -> bool {
        if room == self.default_room {
            return false;
        }
        let removed = self
            .rooms
            .remove_if(room, |_, r| r.player_count() == 0)
            .is_some();
        if removed {
            debug!(room = %room, "Dropped empty room");
        }
        removed
    }

    /// Remove a player from `room`. Unknown rooms and players are ignored.
    pub fn evict(&self, room: &str, player_id: PlayerId) -> Option<PlayerState> {
        self.get(room).and_then(|r| r.lock().evict(player_id))
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().player_count()).sum()
    }
}
