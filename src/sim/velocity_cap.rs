//! Delayed velocity cap
//!
//! Entities may exceed their class cap briefly (dashes, collision kicks,
//! fresh fragments). Sustained overspeed is tolerated for a grace period and
//! then eased back down to the cap over a fixed window.
//!
//! The controller is type-agnostic: callers pick a [`SpeedClass`] and hand the
//! body over. Time comes in as `now` (ms) so the whole thing stays pure.

use serde::{Deserialize, Serialize};

use super::body::KineticBody;
use crate::consts::{HUGE_ASTEROID_RADIUS, MIN_CAP_SPEED};

/// Rounding slack so a body eased exactly onto its cap reads as under it
const CAP_EPSILON: f32 = 1e-4;

/// Cap parameters for one entity class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapConfig {
    /// Maximum sustained speed (px/tick)
    pub cap_speed: f32,
    /// Grace period before deceleration begins (ms)
    pub delay_ms: f64,
    /// Time to ease from the observed speed down to the cap (ms)
    pub deceleration_ms: f64,
}

impl CapConfig {
    pub const fn new(cap_speed: f32, delay_ms: f64, deceleration_ms: f64) -> Self {
        Self {
            cap_speed,
            delay_ms,
            deceleration_ms,
        }
    }
}

/// Every entity class with its own cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedClass {
    Player,
    /// Player with a weapon upgrade running
    PlayerBoosted,
    AsteroidHuge,
    AsteroidLarge,
    AsteroidMedium,
    AsteroidSmall,
    Artifact,
    Alien,
    MissileAlien,
    ScienceVessel,
    PlayerBullet,
    AlienBullet,
    PlayerMissile,
    AlienMissile,
    Bonus,
    Debris,
}

impl SpeedClass {
    pub const fn config(self) -> CapConfig {
        match self {
            SpeedClass::Player => CapConfig::new(6.0, 300.0, 600.0),
            SpeedClass::PlayerBoosted => CapConfig::new(7.5, 300.0, 600.0),
            SpeedClass::AsteroidHuge => CapConfig::new(3.0, 500.0, 1200.0),
            SpeedClass::AsteroidLarge => CapConfig::new(3.5, 500.0, 1200.0),
            SpeedClass::AsteroidMedium => CapConfig::new(4.5, 500.0, 1000.0),
            SpeedClass::AsteroidSmall => CapConfig::new(5.5, 500.0, 800.0),
            SpeedClass::Artifact => CapConfig::new(2.5, 400.0, 800.0),
            SpeedClass::Alien => CapConfig::new(4.0, 250.0, 500.0),
            SpeedClass::MissileAlien => CapConfig::new(5.0, 250.0, 500.0),
            SpeedClass::ScienceVessel => CapConfig::new(2.5, 250.0, 500.0),
            SpeedClass::PlayerBullet => CapConfig::new(10.0, 100.0, 200.0),
            SpeedClass::AlienBullet => CapConfig::new(6.0, 100.0, 200.0),
            SpeedClass::PlayerMissile => CapConfig::new(8.0, 100.0, 200.0),
            SpeedClass::AlienMissile => CapConfig::new(6.0, 100.0, 200.0),
            SpeedClass::Bonus => CapConfig::new(2.0, 200.0, 400.0),
            SpeedClass::Debris => CapConfig::new(7.0, 200.0, 800.0),
        }
    }

    /// Asteroid tier from collision radius; artifacts have their own tier
    pub fn for_asteroid(radius: f32, artifact: bool) -> Self {
        if artifact {
            SpeedClass::Artifact
        } else if radius >= HUGE_ASTEROID_RADIUS {
            SpeedClass::AsteroidHuge
        } else if radius >= 35.0 {
            SpeedClass::AsteroidLarge
        } else if radius >= 20.0 {
            SpeedClass::AsteroidMedium
        } else {
            SpeedClass::AsteroidSmall
        }
    }
}

/// Clamp a body toward its cap after the grace period
///
/// - At or under cap: tracking cleared, nothing else.
/// - First overspeed observation: `now` recorded, no deceleration this call.
/// - Inside the grace period: no-op.
/// - Afterwards: speed eased linearly from the current speed toward the cap
///   by `progress`, heading preserved. Tracking clears once `progress` hits 1.
pub fn apply_cap(body: &mut KineticBody, config: &CapConfig, now: f64) {
    let cap = config.cap_speed.max(MIN_CAP_SPEED);
    let speed = body.speed();

    if !speed.is_finite() || speed <= cap + CAP_EPSILON {
        body.cap.clear();
        return;
    }

    let Some(since) = body.cap.overspeed_since else {
        body.cap.overspeed_since = Some(now);
        return;
    };

    let delay = config.delay_ms.max(0.0);
    let overspeed_for = now - since;
    if overspeed_for < delay {
        return;
    }

    let progress = if config.deceleration_ms <= 0.0 {
        1.0
    } else {
        ((overspeed_for - delay) / config.deceleration_ms).clamp(0.0, 1.0)
    };

    let new_speed = speed + (cap - speed) * progress as f32;
    body.vel *= new_speed / speed;
    body.cap.deceleration_started = true;

    if progress >= 1.0 {
        body.cap.clear();
    }
}

/// Shorthand for `apply_cap(body, &class.config(), now)`
#[inline]
pub fn apply_class_cap(body: &mut KineticBody, class: SpeedClass, now: f64) {
    apply_cap(body, &class.config(), now);
}
