//! Asteroid creation, motion and fragmentation

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::body::KineticBody;
use super::state::{Artifact, Asteroid, AsteroidSize, EntityIds, SimEvent, WorldState};
use super::velocity_cap::{SpeedClass, apply_class_cap};
use crate::consts::*;
use crate::{direction, heading_of, wrap_position};

/// Mass from collision radius (uniform density disc)
#[inline]
pub fn mass_for_radius(radius: f32) -> f32 {
    std::f32::consts::PI * radius * radius * ASTEROID_DENSITY
}

impl Asteroid {
    pub fn new(id: u32, size: AsteroidSize, pos: Vec2, vel: Vec2, rng: &mut impl Rng) -> Self {
        let radius = size.radius();
        let health = size.base_health();
        Self {
            id,
            body: KineticBody::new(pos, vel, radius).with_rotation(rng.random_range(0.0..TAU)),
            size,
            mass: mass_for_radius(radius),
            health,
            max_health: health,
            rotation_speed: rng.random_range(-ASTEROID_SPIN_MAX..=ASTEROID_SPIN_MAX),
            shape_seed: rng.random(),
            artifact: None,
        }
    }

    /// Turn this asteroid into the stage artifact
    ///
    /// The artifact's look and reward are rolled here and never again.
    pub fn make_artifact(&mut self, rng: &mut impl Rng) {
        let artifact = Artifact::roll(rng);
        self.body.radius = self.size.radius() * artifact.scale();
        self.mass = mass_for_radius(self.body.radius);
        self.max_health = self.size.base_health() * ARTIFACT_DURABILITY * ARTIFACT_DURABILITY_BONUS;
        self.health = self.max_health;
        self.artifact = Some(artifact);
    }

    pub fn speed_class(&self) -> SpeedClass {
        SpeedClass::for_asteroid(self.body.radius, self.is_artifact())
    }

    pub fn update(&mut self, width: f32, height: f32, now_ms: f64) {
        self.body.rotation += self.rotation_speed;
        let class = self.speed_class();
        apply_class_cap(&mut self.body, class, now_ms);
        self.body.integrate_wrapped(width, height);
    }

    /// Subtract damage; returns true if this hit destroyed it
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if self.is_destroyed() || !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        self.health -= amount;
        self.is_destroyed()
    }
}

/// Split a destroyed asteroid into the next tier down
///
/// Non-small parents yield exactly two fragments, small ones none. With an
/// impact velocity the pair fans out ±60° around it, otherwise the split
/// axis is random. Both start at the parent's position and never carry the
/// artifact.
pub fn fragment(
    parent: &Asteroid,
    impact: Option<Vec2>,
    rng: &mut impl Rng,
    ids: &mut EntityIds,
) -> Vec<Asteroid> {
    let Some(child_size) = parent.size.smaller() else {
        return Vec::new();
    };

    let base_speed = if parent.body.radius >= HUGE_ASTEROID_RADIUS {
        FRAGMENT_SPEED_BASE_HUGE
    } else {
        FRAGMENT_SPEED_BASE
    };

    let axis = match impact.filter(|v| v.is_finite() && v.length_squared() > f32::EPSILON) {
        Some(v) => heading_of(v),
        None => rng.random_range(0.0..TAU),
    };

    [-FRAGMENT_SPREAD, FRAGMENT_SPREAD]
        .into_iter()
        .map(|spread| {
            let angle = axis + spread + rng.random_range(-FRAGMENT_JITTER..=FRAGMENT_JITTER);
            let speed = base_speed + rng.random_range(0.0..=FRAGMENT_SPEED_RANDOM);
            Asteroid::new(ids.next_id(), child_size, parent.body.pos, direction(angle) * speed, rng)
        })
        .collect()
}

/// Keep at most one artifact; the first one in list order wins
///
/// Returns how many extra artifacts were cleared.
pub fn enforce_single_artifact(asteroids: &mut [Asteroid]) -> usize {
    let mut seen = false;
    let mut cleared = 0;
    for asteroid in asteroids.iter_mut().filter(|a| a.is_artifact()) {
        if seen {
            log::warn!("Asteroid {} had a second artifact; cleared", asteroid.id);
            asteroid.artifact = None;
            asteroid.body.radius = asteroid.size.radius();
            asteroid.mass = mass_for_radius(asteroid.body.radius);
            asteroid.max_health = asteroid.size.base_health();
            asteroid.health = asteroid.health.min(asteroid.max_health);
            cleared += 1;
        }
        seen = true;
    }
    cleared
}

/// Random spawn point away from the player
fn spawn_point(world: &mut WorldState) -> Vec2 {
    let player = world.player.body.pos;
    for _ in 0..16 {
        let p = Vec2::new(
            world.rng.random_range(0.0..world.width),
            world.rng.random_range(0.0..world.height),
        );
        if p.distance(player) >= ASTEROID_SPAWN_CLEARANCE {
            return p;
        }
    }
    // Opposite corner of the torus
    wrap_position(player + Vec2::new(world.width, world.height) / 2.0, world.width, world.height)
}

/// Fill the field with the current stage's large asteroids
///
/// Stage `n` starts with `3 + n` asteroids (capped). One of them may be the
/// stage artifact.
pub fn generate_stage(world: &mut WorldState) {
    let count = (STAGE_BASE_ASTEROIDS + world.stage).min(MAX_STAGE_ASTEROIDS);
    let artifact_slot = if world.rng.random_bool(ARTIFACT_STAGE_CHANCE) {
        Some(world.rng.random_range(0..count))
    } else {
        None
    };

    for slot in 0..count {
        let pos = spawn_point(world);
        let heading = world.rng.random_range(0.0..TAU);
        let speed = world.rng.random_range(ASTEROID_SPEED_MIN..=ASTEROID_SPEED_MAX);
        let id = world.next_entity_id();
        let mut asteroid = Asteroid::new(id, AsteroidSize::Large, pos, direction(heading) * speed, &mut world.rng);
        if artifact_slot == Some(slot) {
            asteroid.make_artifact(&mut world.rng);
        }
        world.asteroids.push(asteroid);
    }
    enforce_single_artifact(&mut world.asteroids);

    let artifact = world.asteroids.iter().any(|a| a.is_artifact());
    log::info!("Stage {}: {} asteroids, artifact={}", world.stage, count, artifact);
    world.emit(SimEvent::StageStarted {
        stage: world.stage,
        artifact,
    });
}
