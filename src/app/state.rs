//! Application state shared across routes and connections

use std::sync::Arc;

use crate::config::Config;
use crate::game::{RaceRules, SessionRegistry};
use crate::ws::broadcast::RoomBroadcaster;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rules: Arc<RaceRules>,
    pub sessions: Arc<SessionRegistry>,
    pub broadcaster: Arc<RoomBroadcaster>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let rules = Arc::new(config.rules.clone());
        let sessions = Arc::new(SessionRegistry::new(config.default_room.clone()));

        Self {
            config: Arc::new(config),
            rules,
            sessions,
            broadcaster: Arc::new(RoomBroadcaster::new()),
        }
    }
}
