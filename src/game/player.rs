//! Authoritative per-player state

use serde::{Deserialize, Serialize};

use super::physics::{Dimensions, Vec2, START_POINTS};

/// Seat number within a room (1 or 2)
pub type PlayerId = u8;

/// Held keys. Either key set drives the car; the browser sends both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    #[serde(rename = "ArrowUp")]
    pub arrow_up: bool,
    #[serde(rename = "ArrowDown")]
    pub arrow_down: bool,
    #[serde(rename = "ArrowLeft")]
    pub arrow_left: bool,
    #[serde(rename = "ArrowRight")]
    pub arrow_right: bool,
    pub w: bool,
    pub s: bool,
    pub a: bool,
    pub d: bool,
}

impl Controls {
    pub fn accelerate(&self) -> bool {
        self.arrow_up || self.w
    }

    pub fn brake(&self) -> bool {
        self.arrow_down || self.s
    }

    pub fn steer_left(&self) -> bool {
        self.arrow_left || self.a
    }

    pub fn steer_right(&self) -> bool {
        self.arrow_right || self.d
    }
}

/// Player state in a room (authoritative)
#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub x: f64,
    pub y: f64,
    /// Heading in radians
    #[serde(rename = "angle")]
    pub heading: f64,
    pub speed: f64,
    pub width: f64,
    pub height: f64,
    pub controls: Controls,
    pub laps: u32,

    /// Whether the car was inside each lap zone after its previous step
    #[serde(skip)]
    pub in_zone: [bool; START_POINTS.len()],
}

impl PlayerState {
    /// A stationary car parked on its slot's start point
    pub fn new(id: PlayerId) -> Self {
        let spawn = START_POINTS[usize::from(id.saturating_sub(1)) % START_POINTS.len()];
        Self::at(id, spawn)
    }

    pub fn at(id: PlayerId, position: Vec2) -> Self {
        let dims = Dimensions::default();
        Self {
            id,
            x: position.x,
            y: position.y,
            heading: 0.0,
            speed: 0.0,
            width: dims.width,
            height: dims.height,
            controls: Controls::default(),
            laps: 0,
            in_zone: [false; START_POINTS.len()],
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.x = position.x;
        self.y = position.y;
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}
