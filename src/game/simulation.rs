//! Authoritative race step
//!
//! The room advances one step per accepted input message. There is no
//! wall-clock tick: an idle room does not move and does not decay.

use tracing::{debug, info};

use super::physics::{
    PhysicsSystem, ACCELERATION, CAR_BOUNCE_DAMPING, CAR_SEPARATION, FRICTION, MIN_SPEED,
    START_POINTS, TRACK, TURN_RATE, WALL_BOUNCE,
};
use super::player::PlayerState;
use super::session::RoomState;

/// Tunables for a race
#[derive(Debug, Clone)]
pub struct RaceRules {
    /// Forward speed cap
    pub max_speed: f64,
    /// Laps needed to finish the race
    pub laps_to_win: u32,
    /// Count a lap only when a car enters a zone, not on every step inside it
    pub lap_debounce: bool,
}

impl Default for RaceRules {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            laps_to_win: 3,
            lap_debounce: true,
        }
    }
}

/// Advance every car in the room by one step and return the finished flag.
///
/// Cars are driven in ascending id order, then the pair (if any) is checked
/// for contact using the post-move positions, then laps are counted and
/// friction applied.
pub fn step(room: &mut RoomState, rules: &RaceRules) -> bool {
    for player in room.players.values_mut() {
        drive(player, rules);
    }

    {
        let mut cars = room.players.values_mut();
        if let (Some(a), Some(b)) = (cars.next(), cars.next()) {
            resolve_car_contact(a, b);
        }
    }

    let was_finished = room.finished;
    for player in room.players.values_mut() {
        count_laps(player, rules);
        if player.laps >= rules.laps_to_win {
            room.finished = true;
        }
        player.speed *= FRICTION;
    }

    if room.finished && !was_finished {
        info!(room = %room.name, "Race finished");
    }

    room.finished
}

/// Throttle, steering and wall contact for a single car
fn drive(player: &mut PlayerState, rules: &RaceRules) {
    let controls = player.controls;

    // Both may be held; brake is applied after throttle
    if controls.accelerate() {
        player.speed = (player.speed + ACCELERATION).min(rules.max_speed);
    }
    if controls.brake() {
        player.speed = (player.speed - ACCELERATION).max(MIN_SPEED);
    }

    // No rotating in place
    if player.speed != 0.0 {
        if controls.steer_left() {
            player.heading -= TURN_RATE;
        }
        if controls.steer_right() {
            player.heading += TURN_RATE;
        }
    }

    let candidate = player.position().advance(player.heading, player.speed);
    if PhysicsSystem::track_collision(&TRACK, candidate, &player.dimensions()) {
        debug!(player_id = player.id, speed = player.speed, "Wall contact");
        player.speed *= WALL_BOUNCE;
    } else {
        player.set_position(candidate);
    }
}

/// Swap damped speeds and push both cars apart along their own headings
fn resolve_car_contact(a: &mut PlayerState, b: &mut PlayerState) {
    if !PhysicsSystem::car_collision(a.position(), &a.dimensions(), b.position(), &b.dimensions()) {
        return;
    }

    debug!(a = a.id, b = b.id, "Car contact");

    let (a_speed, b_speed) = (a.speed, b.speed);
    a.speed = b_speed * CAR_BOUNCE_DAMPING;
    b.speed = a_speed * CAR_BOUNCE_DAMPING;

    a.set_position(a.position().advance(a.heading, CAR_SEPARATION));
    b.set_position(b.position().advance(b.heading, -CAR_SEPARATION));
}

fn count_laps(player: &mut PlayerState, rules: &RaceRules) {
    let position = player.position();
    for (zone, was_inside) in START_POINTS.iter().zip(player.in_zone.iter_mut()) {
        let inside = PhysicsSystem::in_lap_zone(position, *zone);
        if inside && (!rules.lap_debounce || !*was_inside) {
            player.laps += 1;
            debug!(player_id = player.id, laps = player.laps, "Lap counted");
        }
        *was_inside = inside;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::Vec2;
    use crate::game::player::Controls;

    const EPS: f64 = 1e-9;

    fn room_with(players: Vec<PlayerState>) -> RoomState {
        let mut room = RoomState::new("test");
        for player in players {
            room.players.insert(player.id, player);
        }
        room
    }

    /// A point on the racing line, well away from both lap zones
    fn open_track() -> Vec2 {
        Vec2::new(400.0, 725.0)
    }

    #[test]
    fn steering_at_rest_does_not_rotate() {
        let mut player = PlayerState::at(1, open_track());
        player.controls = Controls {
            arrow_left: true,
            d: true,
            ..Default::default()
        };
        let mut room = room_with(vec![player]);
        step(&mut room, &RaceRules::default());

        let player = &room.players[&1];
        assert_eq!(player.heading, 0.0);
        assert_eq!(player.position(), open_track());
    }

    #[test]
    fn steering_while_moving_rotates() {
        let mut player = PlayerState::at(1, open_track());
        player.speed = 1.0;
        player.controls.a = true;
        let mut room = room_with(vec![player]);
        step(&mut room, &RaceRules::default());

        assert!((room.players[&1].heading + TURN_RATE).abs() < EPS);
    }

    #[test]
    fn throttle_adds_acceleration_then_friction() {
        let mut player = PlayerState::at(1, open_track());
        player.controls.w = true;
        let mut room = room_with(vec![player]);
        step(&mut room, &RaceRules::default());

        let player = &room.players[&1];
        assert!((player.speed - 0.1 * FRICTION).abs() < EPS);
        assert!((player.x - (open_track().x + 0.1)).abs() < EPS);
    }

    #[test]
    fn throttle_is_capped_at_max_speed() {
        let mut player = PlayerState::at(1, open_track());
        player.speed = 4.95;
        player.controls.arrow_up = true;
        let mut room = room_with(vec![player]);
        step(&mut room, &RaceRules::default());

        assert!((room.players[&1].speed - 5.0 * FRICTION).abs() < EPS);
    }

    #[test]
    fn reverse_is_floored() {
        let mut player = PlayerState::at(1, open_track());
        player.speed = -2.45;
        player.controls.s = true;
        let mut room = room_with(vec![player]);
        step(&mut room, &RaceRules::default());

        assert!((room.players[&1].speed - MIN_SPEED * FRICTION).abs() < EPS);
    }

    #[test]
    fn throttle_and_brake_cancel() {
        let mut player = PlayerState::at(1, open_track());
        player.speed = 1.0;
        player.controls.w = true;
        player.controls.s = true;
        let mut room = room_with(vec![player]);
        step(&mut room, &RaceRules::default());

        assert!((room.players[&1].speed - 1.0 * FRICTION).abs() < EPS);
    }

    #[test]
    fn friction_decays_geometrically() {
        let mut player = PlayerState::at(1, open_track());
        player.speed = 3.0;
        let mut room = room_with(vec![player]);
        let rules = RaceRules::default();

        for _ in 0..20 {
            step(&mut room, &rules);
        }

        let expected = 3.0 * FRICTION.powi(20);
        assert!((room.players[&1].speed - expected).abs() < 1e-9);
    }

    #[test]
    fn wall_contact_bounces_without_moving() {
        let dims = PlayerState::at(1, open_track()).dimensions();
        let edge = TRACK.outer_radius - dims.bounding_radius() - 1.0;
        let start = TRACK.center.advance(0.0, edge);

        let mut player = PlayerState::at(1, start);
        player.speed = 2.0;
        let mut room = room_with(vec![player]);
        step(&mut room, &RaceRules::default());

        let player = &room.players[&1];
        assert_eq!(player.position(), start);
        assert!((player.speed - 2.0 * WALL_BOUNCE * FRICTION).abs() < EPS);
    }

    #[test]
    fn car_contact_swaps_damped_speeds_and_separates() {
        let mut a = PlayerState::at(1, open_track());
        a.speed = 2.0;
        let mut b = PlayerState::at(2, Vec2::new(open_track().x + 10.0, open_track().y));
        b.speed = 0.0;
        let mut room = room_with(vec![a, b]);
        step(&mut room, &RaceRules::default());

        let a = &room.players[&1];
        let b = &room.players[&2];
        // a moved 2 forward then 10 more; b pushed 10 back along heading 0
        assert!((a.x - (open_track().x + 12.0)).abs() < EPS);
        assert!((b.x - open_track().x).abs() < EPS);
        assert!((a.speed - 0.0).abs() < EPS);
        assert!((b.speed - 2.0 * CAR_BOUNCE_DAMPING * FRICTION).abs() < EPS);
    }

    #[test]
    fn distant_cars_do_not_interact() {
        let mut a = PlayerState::at(1, open_track());
        a.speed = 1.0;
        let b = PlayerState::at(2, Vec2::new(400.0, 75.0));
        let mut room = room_with(vec![a, b]);
        step(&mut room, &RaceRules::default());

        assert!((room.players[&1].speed - FRICTION).abs() < EPS);
        assert_eq!(room.players[&2].speed, 0.0);
    }

    #[test]
    fn entering_lap_zone_counts_once() {
        let mut room = room_with(vec![PlayerState::at(1, START_POINTS[0])]);
        let rules = RaceRules::default();

        step(&mut room, &rules);
        assert_eq!(room.players[&1].laps, 1);

        // Parked inside the zone: no further laps
        step(&mut room, &rules);
        step(&mut room, &rules);
        assert_eq!(room.players[&1].laps, 1);
    }

    #[test]
    fn literal_lap_counting_counts_every_step() {
        let mut room = room_with(vec![PlayerState::at(1, START_POINTS[0])]);
        let rules = RaceRules {
            lap_debounce: false,
            ..Default::default()
        };

        step(&mut room, &rules);
        step(&mut room, &rules);
        assert_eq!(room.players[&1].laps, 2);
    }

    #[test]
    fn finish_latches_after_leaving_zone() {
        let mut room = room_with(vec![PlayerState::at(1, START_POINTS[0])]);
        let rules = RaceRules::default();

        for lap in 1..=3 {
            let player = room.players.get_mut(&1).unwrap();
            player.set_position(START_POINTS[0]);
            let finished = step(&mut room, &rules);
            assert_eq!(room.players[&1].laps, lap);
            assert_eq!(finished, lap == 3);

            room.players.get_mut(&1).unwrap().set_position(open_track());
            step(&mut room, &rules);
        }

        room.players.get_mut(&1).unwrap().set_position(open_track());
        for _ in 0..5 {
            assert!(step(&mut room, &rules));
        }
        assert!(room.finished);
    }

    #[test]
    fn empty_room_steps_cleanly() {
        let mut room = RoomState::new("empty");
        assert!(!step(&mut room, &RaceRules::default()));
    }
}
