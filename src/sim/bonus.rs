//! Pickups dropped by destroyed asteroids

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::body::KineticBody;
use super::state::{Bonus, BonusKind, EntityId};
use super::velocity_cap::{SpeedClass, apply_class_cap};
use crate::consts::*;
use crate::direction;

impl BonusKind {
    /// Uniform pick over all kinds
    pub fn roll(rng: &mut impl Rng) -> Self {
        match rng.random_range(0..4) {
            0 => BonusKind::Shield,
            1 => BonusKind::Heal,
            2 => BonusKind::DoubleShooter,
            _ => BonusKind::Missile,
        }
    }
}

impl Bonus {
    pub fn spawn(id: EntityId, kind: BonusKind, pos: Vec2, rng: &mut impl Rng) -> Self {
        let vel = direction(rng.random_range(0.0..TAU)) * rng.random_range(0.2..=BONUS_DRIFT_SPEED);
        let heal_amount = match kind {
            BonusKind::Heal => Some(rng.random_range(HEAL_MIN..=HEAL_MAX)),
            _ => None,
        };
        Self {
            id,
            body: KineticBody::new(pos, vel, BONUS_RADIUS),
            kind,
            life: 0,
            max_life: BONUS_LIFE_TICKS,
            heal_amount,
        }
    }

    /// Drift and spin; bonuses do not wrap
    pub fn update(&mut self, now_ms: f64) {
        self.body.rotation += BONUS_SPIN;
        apply_class_cap(&mut self.body, SpeedClass::Bonus, now_ms);
        self.body.integrate();
        self.life += 1;
    }

    /// Timed out or drifted off the field
    pub fn expired(&self, width: f32, height: f32) -> bool {
        self.life >= self.max_life || !self.body.is_on_field(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_heal_amount_rolled_once() {
        let mut rng = Pcg32::seed_from_u64(1);
        let heal = Bonus::spawn(1, BonusKind::Heal, Vec2::new(100.0, 100.0), &mut rng);
        let amount = heal.heal_amount.unwrap();
        assert!((HEAL_MIN..=HEAL_MAX).contains(&amount));

        let shield = Bonus::spawn(2, BonusKind::Shield, Vec2::new(100.0, 100.0), &mut rng);
        assert!(shield.heal_amount.is_none());
    }

    #[test]
    fn test_bonus_leaves_field_without_wrapping() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut bonus = Bonus::spawn(1, BonusKind::Missile, Vec2::new(959.0, 100.0), &mut rng);
        bonus.body.vel = Vec2::new(2.0, 0.0);
        for _ in 0..(BONUS_RADIUS as usize + 2) {
            bonus.update(0.0);
        }
        assert!(bonus.body.pos.x > FIELD_WIDTH);
        assert!(bonus.expired(FIELD_WIDTH, FIELD_HEIGHT));
    }

    #[test]
    fn test_bonus_spins_and_times_out() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut bonus = Bonus::spawn(1, BonusKind::Shield, Vec2::new(480.0, 360.0), &mut rng);
        bonus.body.vel = Vec2::ZERO;
        bonus.update(0.0);
        assert!((bonus.body.rotation - BONUS_SPIN).abs() < 1e-6);
        bonus.life = BONUS_LIFE_TICKS;
        assert!(bonus.expired(FIELD_WIDTH, FIELD_HEIGHT));
    }
}
