//! Shared movable-entity shape
//!
//! Every simulated object carries a [`KineticBody`]. The velocity cap
//! bookkeeping rides along so the controller can treat all bodies alike.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{direction, wrap_position};

/// Overspeed bookkeeping used by the velocity cap controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapTracking {
    /// Timestamp (ms) of the first tick this body was seen over its cap
    pub overspeed_since: Option<f64>,
    /// Set once the grace period has passed and the body is slowing down
    pub deceleration_started: bool,
}

impl CapTracking {
    pub fn clear(&mut self) {
        self.overspeed_since = None;
        self.deceleration_started = false;
    }
}

/// Minimal movable entity: position, velocity, rotation, collision radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KineticBody {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Radians. Only wrapped where consumed.
    pub rotation: f32,
    /// Collision radius, always > 0
    pub radius: f32,
    #[serde(default)]
    pub cap: CapTracking,
}

impl KineticBody {
    pub fn new(pos: Vec2, vel: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel,
            rotation: 0.0,
            radius: radius.max(f32::EPSILON),
            cap: CapTracking::default(),
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Unit vector the body is facing
    #[inline]
    pub fn facing(&self) -> Vec2 {
        direction(self.rotation)
    }

    /// Advance position by one tick of velocity
    #[inline]
    pub fn integrate(&mut self) {
        self.pos += self.vel;
    }

    /// Advance position and re-enter from the opposite edge
    #[inline]
    pub fn integrate_wrapped(&mut self, width: f32, height: f32) {
        self.pos = wrap_position(self.pos + self.vel, width, height);
    }

    /// True when two bodies' collision circles overlap
    #[inline]
    pub fn overlaps(&self, other: &KineticBody) -> bool {
        let reach = self.radius + other.radius;
        self.pos.distance_squared(other.pos) < reach * reach
    }

    /// Malformed bodies (NaN/inf) are skipped by the tick
    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite() && self.rotation.is_finite()
    }

    pub fn is_on_field(&self, width: f32, height: f32) -> bool {
        let r = self.radius;
        self.pos.x >= -r && self.pos.x <= width + r && self.pos.y >= -r && self.pos.y <= height + r
    }
}
