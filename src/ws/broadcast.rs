//! Room fan-out
//!
//! Each connection registers an outbox with the room it sits in. Sending to
//! a room serializes the message once and queues it on every outbox without
//! waiting; a full or closed outbox only loses that member's copy.

use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use super::protocol::ServerMsg;

/// Per-connection outbound queue depth
pub const OUTBOX_CAPACITY: usize = 64;

/// Outbound queue feeding one connection's socket writer
pub type Outbox = mpsc::Sender<String>;

/// Named groups of connections
#[derive(Debug, Default)]
pub struct RoomBroadcaster {
    groups: DashMap<String, HashMap<Uuid, Outbox>>,
}

impl RoomBroadcaster {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    pub fn join(&self, room: &str, connection_id: Uuid, outbox: Outbox) {
        self.groups
            .entry(room.to_string())
            .or_default()
            .insert(connection_id, outbox);
        debug!(room = %room, connection_id = %connection_id, "Joined broadcast group");
    }

    /// Unsubscribe a connection. The group goes away with its last member.
    pub fn leave(&self, room: &str, connection_id: Uuid) {
        if let Some(mut members) = self.groups.get_mut(room) {
            if members.remove(&connection_id).is_some() {
                debug!(room = %room, connection_id = %connection_id, "Left broadcast group");
            }
        }
        self.groups.remove_if(room, |_, members| members.is_empty());
    }

    /// Queue `msg` for every member of `room`, sender included.
    /// Returns how many members accepted it.
    pub fn send(&self, room: &str, msg: &ServerMsg) -> usize {
        let Some(members) = self.groups.get(room) else {
            return 0;
        };

        let text = match serde_json::to_string(msg) {
            Ok(text) => text,
            Err(e) => {
                error!(room = %room, error = %e, "Failed to serialize broadcast");
                return 0;
            }
        };

        let mut delivered = 0;
        for (connection_id, outbox) in members.iter() {
            match outbox.try_send(text.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        room = %room,
                        connection_id = %connection_id,
                        "Outbox full, dropping message"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(room = %room, connection_id = %connection_id, "Outbox closed");
                }
            }
        }

        trace!(room = %room, delivered, "Broadcast sent");
        delivered
    }

    pub fn member_count(&self, room: &str) -> usize {
        self.groups.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
