//! Flipit - asteroid arcade simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (kinematics, collisions, AI, tractor beam)
//! - `settings`: Data-driven run configuration
//!
//! Rendering, audio and persistence live outside this crate. They read
//! [`sim::WorldState`] and drain its events; the core never calls out.

pub mod settings;
pub mod sim;

pub use settings::{Difficulty, Settings, SettingsError};

use glam::Vec2;

/// Game configuration constants
///
/// Speeds are in pixels per tick, timers in ticks unless suffixed `_MS`.
pub mod consts {
    use std::f32::consts::PI;

    /// Fixed simulation timestep in milliseconds (60 Hz)
    pub const TICK_MS: f64 = 1000.0 / 60.0;

    /// Toroidal play field
    pub const FIELD_WIDTH: f32 = 960.0;
    pub const FIELD_HEIGHT: f32 = 720.0;

    /// Player craft
    pub const PLAYER_RADIUS: f32 = 12.0;
    pub const PLAYER_MAX_HEALTH: f32 = 100.0;
    pub const PLAYER_MAX_FUEL: f32 = 100.0;
    pub const FUEL_LOW: f32 = 30.0;
    pub const FUEL_CRITICAL: f32 = 10.0;
    /// Fixed burn per thrusting tick
    pub const FUEL_IDLE_BURN: f32 = 0.01;
    /// Additional burn proportional to thrust power
    pub const FUEL_THRUST_BURN: f32 = 0.04;
    pub const PLAYER_ROTATION_STEP: f32 = 0.1;
    pub const PLAYER_THRUST: f32 = 0.15;
    pub const PLAYER_FRICTION: f32 = 0.98;
    pub const PLAYER_SPAWN_INVULN_TICKS: u32 = 180;
    pub const PLAYER_START_LIVES: u32 = 3;
    pub const PLAYER_FIRE_COOLDOWN_TICKS: u32 = 10;
    pub const PLAYER_MISSILE_COOLDOWN_TICKS: u32 = 30;
    pub const MISSILE_SEGMENTS_PER_MISSILE: u32 = 5;
    pub const MAX_MISSILE_SEGMENTS: u32 = 25;
    pub const UPGRADE_DURATION_TICKS: u32 = 600;
    pub const MAX_UPGRADE_STACKS: u32 = 3;
    pub const SHIELD_DURATION_TICKS: u32 = 480;
    pub const DASH_DURATION_TICKS: u32 = 12;
    pub const DASH_COOLDOWN_TICKS: u32 = 90;
    pub const DASH_SPEED: f32 = 11.0;
    pub const DASH_FUEL_COST: f32 = 3.0;
    pub const PLAYER_MASS: f32 = 3.0;
    pub const PLAYER_HIT_INVULN_TICKS: u32 = 45;
    pub const ASTEROID_IMPACT_DAMAGE: f32 = 15.0;
    pub const ALIEN_RAM_DAMAGE: f32 = 20.0;

    /// Projectiles
    pub const BULLET_SPEED: f32 = 9.0;
    pub const BULLET_RADIUS: f32 = 2.0;
    pub const BULLET_LIFE_TICKS: u32 = 60;
    pub const BULLET_DAMAGE: f32 = 1.0;
    pub const DOUBLE_SHOT_SPACING: f32 = 6.0;
    pub const ALIEN_BULLET_SPEED: f32 = 5.0;
    pub const ALIEN_BULLET_LIFE_TICKS: u32 = 90;
    pub const ALIEN_BULLET_DAMAGE: f32 = 10.0;
    pub const MISSILE_SPEED: f32 = 6.0;
    pub const MISSILE_RADIUS: f32 = 4.0;
    pub const MISSILE_LIFE_TICKS: u32 = 180;
    pub const MISSILE_WARMUP_TICKS: u32 = 15;
    pub const MISSILE_TURN_RATE: f32 = 0.08;
    pub const MISSILE_LOCK_RANGE: f32 = 420.0;
    pub const MISSILE_LOST_LIMIT: u32 = 30;
    pub const MISSILE_DAMAGE_MULTIPLIER: f32 = 3.0;
    pub const MISSILE_EXPLOSION_RADIUS: f32 = 60.0;
    pub const ALIEN_MISSILE_SPEED: f32 = 4.5;
    pub const ALIEN_MISSILE_TURN_RATE: f32 = 0.04;
    pub const ALIEN_MISSILE_DAMAGE: f32 = 25.0;

    /// Asteroids
    pub const ASTEROID_RADIUS_LARGE: f32 = 48.0;
    pub const ASTEROID_RADIUS_MEDIUM: f32 = 28.0;
    pub const ASTEROID_RADIUS_SMALL: f32 = 14.0;
    pub const ASTEROID_DENSITY: f32 = 0.01;
    pub const ASTEROID_SPIN_MAX: f32 = 0.03;
    pub const ASTEROID_SPEED_MIN: f32 = 0.6;
    pub const ASTEROID_SPEED_MAX: f32 = 1.6;
    pub const ASTEROID_SPAWN_CLEARANCE: f32 = 180.0;
    pub const STAGE_BASE_ASTEROIDS: u32 = 3;
    pub const MAX_STAGE_ASTEROIDS: u32 = 12;
    pub const ARTIFACT_STAGE_CHANCE: f64 = 0.7;
    /// Artifact health is baseline x3, then doubled again
    pub const ARTIFACT_DURABILITY: f32 = 3.0;
    pub const ARTIFACT_DURABILITY_BONUS: f32 = 2.0;
    pub const FLIPIT_CHANCE_MIN: f32 = 0.05;
    pub const FLIPIT_CHANCE_MAX: f32 = 0.35;
    pub const ARTIFACT_SCALE_MIN: f32 = 0.9;
    pub const ARTIFACT_SCALE_MAX: f32 = 1.25;
    pub const ARTIFACT_PATTERN_COUNT: u8 = 4;
    /// Radius at or above which an asteroid counts as extra-large
    pub const HUGE_ASTEROID_RADIUS: f32 = 50.0;
    pub const FRAGMENT_SPREAD: f32 = PI / 3.0; // 60 degrees
    pub const FRAGMENT_JITTER: f32 = PI / 12.0;
    pub const FRAGMENT_SPEED_BASE: f32 = 3.0;
    pub const FRAGMENT_SPEED_BASE_HUGE: f32 = 2.5;
    pub const FRAGMENT_SPEED_RANDOM: f32 = 1.5;
    pub const RESTITUTION: f32 = 0.6;
    pub const BONUS_DROP_CHANCE: f64 = 0.15;

    /// Bonuses
    pub const BONUS_RADIUS: f32 = 10.0;
    pub const BONUS_LIFE_TICKS: u32 = 600;
    pub const BONUS_SPIN: f32 = 0.02;
    pub const BONUS_DRIFT_SPEED: f32 = 0.8;
    pub const HEAL_MIN: f32 = 15.0;
    pub const HEAL_MAX: f32 = 35.0;
    pub const BONUS_MISSILE_SEGMENTS: u32 = 5;

    /// Alien ships
    pub const ALIEN_RADIUS: f32 = 16.0;
    pub const SCIENCE_RADIUS: f32 = 20.0;
    pub const ALIEN_MAX_HEALTH: f32 = 3.0;
    pub const SCIENCE_MAX_HEALTH: f32 = 5.0;
    pub const ALIEN_MASS: f32 = 4.0;
    pub const ALIEN_SPEED: f32 = 1.0;
    pub const MISSILE_TYPE_SPEED: f32 = 1.3;
    pub const SCIENCE_SPEED: f32 = 0.7;
    pub const ALIEN_THRUST_GAIN: f32 = 0.08;
    pub const ALIEN_KNOCKED_THRUST_GAIN: f32 = 0.04;
    pub const ALIEN_DRAG: f32 = 0.96;
    pub const ALIEN_TURN_RATE: f32 = 0.06;
    pub const ALIEN_KNOCKED_TURN_RATE: f32 = 0.035;
    pub const ALIEN_KNOCK_TICKS: u32 = 30;
    pub const RETHINK_MIN_TICKS: u32 = 120;
    pub const RETHINK_MAX_TICKS: u32 = 300;
    pub const FLIP_BIAS_CHANCE: f32 = 0.35;
    /// Cumulative with the flip chance
    pub const ORBIT_WAYPOINT_CHANCE: f32 = 0.80;
    pub const ORBIT_RADIUS_MIN: f32 = 120.0;
    pub const ORBIT_RADIUS_MAX: f32 = 320.0;
    pub const ORBIT_WAYPOINT_MIN_TICKS: u32 = 120;
    pub const ORBIT_WAYPOINT_MAX_TICKS: u32 = 240;
    pub const ROAM_WAYPOINT_MIN_TICKS: u32 = 90;
    pub const ROAM_WAYPOINT_MAX_TICKS: u32 = 180;
    pub const WAYPOINT_ARRIVE_DIST: f32 = 25.0;
    pub const ORBIT_LATERAL_WEIGHT: f32 = 0.5;
    /// Orbit pull fades to zero beyond this distance from the goal
    pub const ORBIT_ENGAGE_DIST: f32 = 320.0;
    pub const AVOID_LOOK_AHEAD: f32 = 140.0;
    pub const AVOID_CONE_MARGIN: f32 = 24.0;
    pub const AVOID_STEER_WEIGHT: f32 = 1.5;
    pub const AVOID_REPULSE_MARGIN: f32 = 90.0;
    pub const AVOID_REPULSE_WEIGHT: f32 = 2.0;
    pub const KNOCKED_AVOID_SCALE: f32 = 0.6;
    pub const ALIEN_FIRE_RANGE: f32 = 420.0;
    pub const ALIEN_FIRE_INTERVAL_TICKS: f32 = 120.0;
    pub const ALIEN_AIM_JITTER: f32 = 0.25;
    pub const DOOM_COUNTDOWN_TICKS: u32 = 1800;
    pub const MISSILE_TYPE_DOOM_COUNTDOWN_TICKS: u32 = 1200;
    pub const DOOM_STAGES: u8 = 3;
    pub const DOOM_STAGE_TICKS: u32 = 90;
    pub const MISSILE_TYPE_DOOM_STAGE_TICKS: u32 = 45;
    pub const SCIENCE_DOCK_GAP: f32 = 40.0;
    pub const SCIENCE_DOCK_RATE: f32 = 0.5;
    pub const SCIENCE_PATROL_TICKS: u32 = 240;
    pub const SCIENCE_SPAWN_CHANCE: f32 = 0.15;
    /// Cumulative with the science chance
    pub const MISSILE_TYPE_SPAWN_CHANCE: f32 = 0.40;

    /// Tractor beam
    pub const TRACTOR_RANGE: f32 = 260.0;
    pub const TRACTOR_BREAK_RANGE: f32 = 420.0;
    pub const TRACTOR_ORBIT_GAP: f32 = 30.0;
    pub const TRACTOR_PULL: f32 = 0.12;
    pub const TRACTOR_LOCK_DIST: f32 = 12.0;
    pub const TRACTOR_LOCK_MS: f64 = 500.0;
    pub const TRACTOR_ORBIT_SPEED: f32 = 0.03;
    pub const TRACTOR_DISPLAY_MS: f64 = 1500.0;
    pub const TRACTOR_PUSH_MS: f64 = 400.0;
    pub const TRACTOR_PUSH_SPEED: f32 = 4.0;

    /// Grid-scan mini-game
    pub const GRID_REVEAL_RATE: f32 = 30.0; // cells per second
    pub const GRID_RETRACT_MS: f64 = 600.0;
    /// Share of the asteroid radius covered by the scan grid
    pub const GRID_SCAN_RADIUS_FACTOR: f32 = 0.85;

    /// Off-screen stations
    pub const WORLD_MIN_TILE: i32 = -4;
    pub const WORLD_MAX_TILE: i32 = 4;
    pub const STATION_RADIUS: f32 = 36.0;
    pub const STATION_DRIFT_MAX: f32 = 0.4;
    pub const STATION_DESPAWN_MS: f64 = 20_000.0;
    pub const STATION_RESPAWN_MS: f64 = 15_000.0;
    pub const STATION_REFUEL_RATE: f32 = 0.5;
    pub const STATION_REWARD_SEGMENTS: u32 = 10;

    /// Scoring
    pub const SCORE_LARGE_ASTEROID: u64 = 20;
    pub const SCORE_MEDIUM_ASTEROID: u64 = 50;
    pub const SCORE_SMALL_ASTEROID: u64 = 100;
    pub const SCORE_ALIEN: u64 = 200;
    pub const SCORE_ARTIFACT_DECODE: u64 = 500;

    /// Velocity cap floor used when a config asks for a non-positive cap
    pub const MIN_CAP_SPEED: f32 = 0.01;

    /// Unwired n-body gravity tuning
    pub const GRAVITY_CONSTANT: f32 = 0.5;
    pub const GRAVITY_MIN_DIST: f32 = 10.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Angle wrapped to [0, 2π), used where rotation is consumed
#[inline]
pub fn wrap_rotation(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    angle.rem_euclid(std::f32::consts::TAU)
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Heading angle of a vector
#[inline]
pub fn heading_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Unit vector for a rotation
#[inline]
pub fn direction(rotation: f32) -> Vec2 {
    Vec2::new(rotation.cos(), rotation.sin())
}

/// Toroidal wrap into [0, width) x [0, height)
#[inline]
pub fn wrap_position(pos: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(wrap_axis(pos.x, width), wrap_axis(pos.y, height))
}

#[inline]
fn wrap_axis(v: f32, extent: f32) -> f32 {
    let wrapped = v.rem_euclid(extent);
    // rem_euclid can round up to exactly `extent` for tiny negatives
    if wrapped >= extent { 0.0 } else { wrapped }
}

/// Shortest offset from `from` to `to` on the wrapped field
///
/// Each component lands in `[-extent/2, extent/2)`.
#[inline]
pub fn toroidal_delta(from: Vec2, to: Vec2, width: f32, height: f32) -> Vec2 {
    let d = to - from;
    Vec2::new(
        wrap_axis(d.x + width / 2.0, width) - width / 2.0,
        wrap_axis(d.y + height / 2.0, height) - height / 2.0,
    )
}

/// Euclidean distance between two points
#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// Rescale a vector to `magnitude`, keeping its heading
#[inline]
pub fn with_magnitude(v: Vec2, magnitude: f32) -> Vec2 {
    v.normalize_or_zero() * magnitude
}

/// Newtonian attraction exerted on `a` by `b`
///
/// Not part of the tick; kept for tools that preview orbital drift.
pub fn gravitational_force(a_pos: Vec2, a_mass: f32, b_pos: Vec2, b_mass: f32) -> Vec2 {
    use consts::{GRAVITY_CONSTANT, GRAVITY_MIN_DIST};
    let delta = b_pos - a_pos;
    let dist = delta.length().max(GRAVITY_MIN_DIST);
    let magnitude = GRAVITY_CONSTANT * a_mass * b_mass / (dist * dist);
    delta.normalize_or_zero() * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(2.5 * PI) - PI / 2.0).abs() < 1e-5);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
    }

    #[test]
    fn test_wrap_rotation() {
        assert!((wrap_rotation(-PI / 2.0) - 1.5 * PI).abs() < 1e-5);
        assert!(wrap_rotation(7.0) < std::f32::consts::TAU);
    }

    #[test]
    fn test_wrap_position() {
        let p = wrap_position(Vec2::new(-10.0, 730.0), 960.0, 720.0);
        assert!((p.x - 950.0).abs() < 1e-4);
        assert!((p.y - 10.0).abs() < 1e-4);

        let p = wrap_position(Vec2::new(960.0, 0.0), 960.0, 720.0);
        assert_eq!(p.x, 0.0);
    }

    #[test]
    fn test_toroidal_delta_takes_short_way() {
        let d = toroidal_delta(Vec2::new(950.0, 10.0), Vec2::new(10.0, 700.0), 960.0, 720.0);
        assert!((d.x - 20.0).abs() < 1e-3);
        assert!((d.y + 30.0).abs() < 1e-3);

        let d = toroidal_delta(Vec2::new(100.0, 100.0), Vec2::new(160.0, 80.0), 960.0, 720.0);
        assert!((d.x - 60.0).abs() < 1e-4);
        assert!((d.y + 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_with_magnitude_keeps_heading() {
        let v = with_magnitude(Vec2::new(3.0, 4.0), 10.0);
        assert!((v.x - 6.0).abs() < 1e-5);
        assert!((v.y - 8.0).abs() < 1e-5);
        assert_eq!(with_magnitude(Vec2::ZERO, 5.0), Vec2::ZERO);
    }

    #[test]
    fn test_gravity_points_toward_other_body() {
        let f = gravitational_force(Vec2::ZERO, 2.0, Vec2::new(100.0, 0.0), 3.0);
        assert!(f.x > 0.0);
        assert!(f.y.abs() < 1e-6);

        // Clamped at the minimum distance, never infinite
        let f = gravitational_force(Vec2::ZERO, 1.0, Vec2::ZERO, 1.0);
        assert!(f.is_finite());
    }
}
