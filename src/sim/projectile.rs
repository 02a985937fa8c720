//! Bullets and homing missiles

use glam::Vec2;

use super::body::KineticBody;
use super::state::{AlienShip, Asteroid, Bullet, EntityId, Missile, MissilePhase, MissileTarget, Owner};
use super::velocity_cap::{SpeedClass, apply_class_cap};
use crate::consts::*;
use crate::{direction, heading_of, normalize_angle};

impl Bullet {
    pub fn new(pos: Vec2, vel: Vec2, owner: Owner) -> Self {
        let (max_life, damage) = match owner {
            Owner::Player => (BULLET_LIFE_TICKS, BULLET_DAMAGE),
            Owner::Alien => (ALIEN_BULLET_LIFE_TICKS, ALIEN_BULLET_DAMAGE),
        };
        Self {
            body: KineticBody::new(pos, vel, BULLET_RADIUS).with_rotation(heading_of(vel)),
            life: 0,
            max_life,
            owner,
            damage,
        }
    }

    pub fn update(&mut self, width: f32, height: f32, now_ms: f64) {
        let class = match self.owner {
            Owner::Player => SpeedClass::PlayerBullet,
            Owner::Alien => SpeedClass::AlienBullet,
        };
        apply_class_cap(&mut self.body, class, now_ms);
        self.body.integrate_wrapped(width, height);
        self.life += 1;
    }
}

/// Read-only view of everything a missile may chase
pub struct TargetField<'a> {
    pub asteroids: &'a [Asteroid],
    pub aliens: &'a [AlienShip],
    pub player: Option<Vec2>,
}

impl TargetField<'_> {
    pub fn position(&self, target: MissileTarget) -> Option<Vec2> {
        match target {
            MissileTarget::Asteroid(id) => self
                .asteroids
                .iter()
                .find(|a| a.id == id && !a.is_destroyed())
                .map(|a| a.body.pos),
            MissileTarget::Alien(id) => self
                .aliens
                .iter()
                .find(|a| a.id == id && !a.is_destroyed())
                .map(|a| a.body.pos),
            MissileTarget::Player => self.player,
        }
    }

    /// Closest valid target for a missile fired by `owner`
    pub fn nearest(&self, owner: Owner, from: Vec2, range: f32) -> Option<(MissileTarget, Vec2)> {
        match owner {
            Owner::Alien => self
                .player
                .filter(|p| p.distance(from) <= range)
                .map(|p| (MissileTarget::Player, p)),
            Owner::Player => {
                let asteroids = self
                    .asteroids
                    .iter()
                    .filter(|a| !a.is_destroyed())
                    .map(|a| (MissileTarget::Asteroid(a.id), a.body.pos));
                let aliens = self
                    .aliens
                    .iter()
                    .filter(|a| !a.is_destroyed())
                    .map(|a| (MissileTarget::Alien(a.id), a.body.pos));
                asteroids
                    .chain(aliens)
                    .map(|(t, p)| (t, p, p.distance(from)))
                    .filter(|(_, _, d)| *d <= range)
                    .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(t, p, _)| (t, p))
            }
        }
    }
}

impl Missile {
    /// Launch along `heading`, inheriting the launcher's velocity
    pub fn launch(
        id: EntityId,
        pos: Vec2,
        heading: f32,
        launcher_vel: Vec2,
        owner: Owner,
        target: Option<MissileTarget>,
    ) -> Self {
        let (speed, turn_rate, damage_multiplier) = match owner {
            Owner::Player => (MISSILE_SPEED, MISSILE_TURN_RATE, MISSILE_DAMAGE_MULTIPLIER),
            Owner::Alien => (ALIEN_MISSILE_SPEED, ALIEN_MISSILE_TURN_RATE, 1.0),
        };
        Self {
            id,
            body: KineticBody::new(pos, direction(heading) * speed + launcher_vel, MISSILE_RADIUS)
                .with_rotation(heading),
            life: 0,
            max_life: MISSILE_LIFE_TICKS,
            owner,
            homing: true,
            turn_rate,
            damage_multiplier,
            explosion_radius: MISSILE_EXPLOSION_RADIUS,
            locked: false,
            lost_frames: 0,
            target,
            phase: MissilePhase::Straight,
            detonated: false,
        }
    }

    fn speed_class(&self) -> SpeedClass {
        match self.owner {
            Owner::Player => SpeedClass::PlayerMissile,
            Owner::Alien => SpeedClass::AlienMissile,
        }
    }

    /// Advance one tick: warm-up, then turn-limited homing
    pub fn update(&mut self, targets: &TargetField<'_>, width: f32, height: f32, now_ms: f64) {
        self.life += 1;
        if self.phase == MissilePhase::Straight && self.life >= MISSILE_WARMUP_TICKS {
            self.phase = MissilePhase::Homing;
        }

        if self.homing && self.phase == MissilePhase::Homing {
            self.steer(targets);
        }

        let class = self.speed_class();
        apply_class_cap(&mut self.body, class, now_ms);
        self.body.integrate_wrapped(width, height);
    }

    fn steer(&mut self, targets: &TargetField<'_>) {
        let pos = self.body.pos;
        let tracked = self
            .target
            .and_then(|t| targets.position(t))
            .filter(|p| p.distance(pos) <= MISSILE_LOCK_RANGE);

        let aim = match tracked {
            Some(p) => Some(p),
            None => targets.nearest(self.owner, pos, MISSILE_LOCK_RANGE).map(|(t, p)| {
                self.target = Some(t);
                p
            }),
        };

        let Some(aim) = aim else {
            self.lost_frames += 1;
            if self.lost_frames >= MISSILE_LOST_LIMIT {
                self.locked = false;
                self.target = None;
            }
            return;
        };

        self.locked = true;
        self.lost_frames = 0;

        let desired = heading_of(aim - pos);
        let delta = normalize_angle(desired - self.body.rotation).clamp(-self.turn_rate, self.turn_rate);
        self.body.rotation = normalize_angle(self.body.rotation + delta);
        let speed = self.body.speed();
        self.body.vel = direction(self.body.rotation) * speed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::AsteroidSize;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn empty_field() -> TargetField<'static> {
        TargetField { asteroids: &[], aliens: &[], player: None }
    }

    #[test]
    fn test_bullet_ages_and_wraps() {
        let mut bullet = Bullet::new(Vec2::new(958.0, 10.0), Vec2::new(5.0, 0.0), Owner::Player);
        bullet.update(FIELD_WIDTH, FIELD_HEIGHT, 0.0);
        assert!((bullet.body.pos.x - 3.0).abs() < 1e-3);
        assert_eq!(bullet.life, 1);
        assert!(!bullet.expired());
        bullet.life = bullet.max_life;
        assert!(bullet.expired());
    }

    #[test]
    fn test_missile_flies_straight_during_warmup() {
        let mut rng = Pcg32::seed_from_u64(1);
        let asteroid = Asteroid::new(9, AsteroidSize::Small, Vec2::new(100.0, 300.0), Vec2::ZERO, &mut rng);
        let asteroids = [asteroid];
        let field = TargetField { asteroids: &asteroids, aliens: &[], player: None };

        let mut missile = Missile::launch(1, Vec2::new(100.0, 100.0), 0.0, Vec2::ZERO, Owner::Player, None);
        for _ in 0..MISSILE_WARMUP_TICKS - 1 {
            missile.update(&field, FIELD_WIDTH, FIELD_HEIGHT, 0.0);
            assert_eq!(missile.body.rotation, 0.0);
        }
        missile.update(&field, FIELD_WIDTH, FIELD_HEIGHT, 0.0);
        assert_eq!(missile.phase, MissilePhase::Homing);
        assert!(missile.locked);
        assert_eq!(missile.target, Some(MissileTarget::Asteroid(9)));
        // Turned toward the target, no more than the turn limit
        assert!(missile.body.rotation > 0.0);
        assert!(missile.body.rotation <= MISSILE_TURN_RATE + 1e-6);
    }

    #[test]
    fn test_missile_loses_lock_without_targets() {
        let mut missile = Missile::launch(1, Vec2::new(100.0, 100.0), 0.0, Vec2::ZERO, Owner::Player, None);
        missile.phase = MissilePhase::Homing;
        missile.locked = true;
        missile.target = Some(MissileTarget::Alien(42));
        let field = empty_field();
        for _ in 0..MISSILE_LOST_LIMIT {
            missile.update(&field, FIELD_WIDTH, FIELD_HEIGHT, 0.0);
        }
        assert!(!missile.locked);
        assert_eq!(missile.target, None);
        assert_eq!(missile.lost_frames, MISSILE_LOST_LIMIT);
    }

    #[test]
    fn test_alien_missile_only_targets_player() {
        let field = TargetField { asteroids: &[], aliens: &[], player: Some(Vec2::new(50.0, 0.0)) };
        let found = field.nearest(Owner::Alien, Vec2::ZERO, 100.0);
        assert_eq!(found, Some((MissileTarget::Player, Vec2::new(50.0, 0.0))));
        assert_eq!(field.nearest(Owner::Player, Vec2::ZERO, 100.0), None);
    }
}
