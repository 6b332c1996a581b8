//! Car kinematics constants and collision predicates

/// Reverse speed floor
pub const MIN_SPEED: f64 = -2.5;
/// Speed gained/lost per step while the throttle or brake is held
pub const ACCELERATION: f64 = 0.1;
/// Heading change per step while steering
pub const TURN_RATE: f64 = 0.05;
/// Multiplier applied to speed at the end of every step
pub const FRICTION: f64 = 0.98;
/// Speed multiplier when the car hits a track wall
pub const WALL_BOUNCE: f64 = -0.3;
/// Speed damping applied when two cars exchange speeds
pub const CAR_BOUNCE_DAMPING: f64 = 0.5;
/// Distance each car is pushed along its heading after a car collision
pub const CAR_SEPARATION: f64 = 10.0;
/// Radius of a lap trigger zone
pub const LAP_ZONE_RADIUS: f64 = 50.0;

/// A point in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move `distance` units along `heading` (radians)
    pub fn advance(self, heading: f64, distance: f64) -> Vec2 {
        Vec2::new(
            self.x + heading.cos() * distance,
            self.y + heading.sin() * distance,
        )
    }
}

/// Car footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    /// Radius of the circle circumscribing the car
    pub fn bounding_radius(&self) -> f64 {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        (hw * hw + hh * hh).sqrt()
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 60.0,
            height: 30.0,
        }
    }
}

/// The annular race track
#[derive(Debug, Clone, Copy)]
pub struct TrackGeometry {
    pub center: Vec2,
    pub outer_radius: f64,
    pub inner_radius: f64,
}

/// The only track the game ships with (800x800 canvas)
pub const TRACK: TrackGeometry = TrackGeometry {
    center: Vec2::new(400.0, 400.0),
    outer_radius: 400.0,
    inner_radius: 250.0,
};

/// Spawn points, indexed by slot - 1. They double as lap trigger zones.
pub const START_POINTS: [Vec2; 2] = [
    // northwest
    Vec2::new(200.0, 100.0),
    // northeast
    Vec2::new(650.0, 150.0),
];

/// Stateless collision and zone predicates
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Whether a car at `position` would leave the corridor between the walls.
    /// The car is approximated by its circumscribing circle.
    pub fn track_collision(track: &TrackGeometry, position: Vec2, dims: &Dimensions) -> bool {
        let d = track.center.distance(position);
        let r = dims.bounding_radius();
        d + r > track.outer_radius || d - r < track.inner_radius
    }

    /// Whether two cars overlap
    pub fn car_collision(a: Vec2, a_dims: &Dimensions, b: Vec2, b_dims: &Dimensions) -> bool {
        let threshold = ((a_dims.width + b_dims.width) / 2.0
            + (a_dims.height + b_dims.height) / 2.0)
            * 0.5;
        a.distance(b) < threshold
    }

    /// Whether `position` lies inside the lap zone centred on `zone`
    pub fn in_lap_zone(position: Vec2, zone: Vec2) -> bool {
        position.distance(zone) < LAP_ZONE_RADIUS
    }
}
