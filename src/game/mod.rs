//! Race simulation modules

pub mod physics;
pub mod player;
pub mod session;
pub mod simulation;
pub mod snapshot;

pub use player::{Controls, PlayerId, PlayerState};
pub use session::{SessionError, SessionRegistry, SlotGuard};
pub use simulation::RaceRules;
