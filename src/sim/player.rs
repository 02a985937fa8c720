//! Player craft kinematics, weapons and pickups

use glam::Vec2;

use super::body::KineticBody;
use super::state::{Bonus, BonusKind, Bullet, DashKind, DashState, EntityId, Missile, Owner, Player};
use super::tick::TickInput;
use super::velocity_cap::{SpeedClass, apply_class_cap};
use crate::consts::*;

impl Player {
    /// Fresh craft for a new life
    ///
    /// Every transient timer starts at zero apart from the spawn
    /// invulnerability window.
    pub fn spawn(pos: Vec2) -> Self {
        Self {
            body: KineticBody::new(pos, Vec2::ZERO, PLAYER_RADIUS)
                .with_rotation(-std::f32::consts::FRAC_PI_2), // Nose up
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            fuel: PLAYER_MAX_FUEL,
            max_fuel: PLAYER_MAX_FUEL,
            shield_timer: 0,
            invuln_timer: PLAYER_SPAWN_INVULN_TICKS,
            upgrade_stacks: 0,
            upgrade_timer: 0,
            missile_segments: 0,
            fire_cooldown: 0,
            missile_cooldown: 0,
            dash: DashState::default(),
            controls_reversed: false,
            thrusting: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub fn fuel_low(&self) -> bool {
        self.fuel <= FUEL_LOW
    }

    pub fn fuel_critical(&self) -> bool {
        self.fuel <= FUEL_CRITICAL
    }

    /// Whole missiles available (what the HUD shows)
    pub fn visible_missiles(&self) -> u32 {
        self.missile_segments / MISSILE_SEGMENTS_PER_MISSILE
    }

    pub fn is_protected(&self) -> bool {
        self.invuln_timer > 0 || self.shield_timer > 0
    }

    fn speed_class(&self) -> SpeedClass {
        if self.upgrade_timer > 0 {
            SpeedClass::PlayerBoosted
        } else {
            SpeedClass::Player
        }
    }

    /// Advance the craft by one tick
    pub fn update(&mut self, input: &TickInput, width: f32, height: f32, now_ms: f64) {
        self.tick_timers();

        // Rotation
        let mut turn = 0.0;
        if input.left {
            turn -= PLAYER_ROTATION_STEP;
        }
        if input.right {
            turn += PLAYER_ROTATION_STEP;
        }
        if self.controls_reversed {
            turn = -turn;
        }
        self.body.rotation += turn;

        if let Some(kind) = input.dash {
            self.try_dash(kind);
        }

        // Thrust or coast
        let thrust = if input.thrust.is_finite() {
            input.thrust.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.thrusting = thrust > 0.0 && self.fuel > 0.0;
        if self.thrusting {
            self.fuel = (self.fuel - (FUEL_IDLE_BURN + FUEL_THRUST_BURN * thrust)).max(0.0);
            self.body.vel += self.body.facing() * PLAYER_THRUST * thrust;
        } else {
            self.body.vel *= PLAYER_FRICTION;
        }

        if self.dash.active {
            self.body.vel = self.dash.dir * DASH_SPEED;
            self.dash.remaining = self.dash.remaining.saturating_sub(1);
            if self.dash.remaining == 0 {
                self.dash.active = false;
            }
        }

        let class = self.speed_class();
        apply_class_cap(&mut self.body, class, now_ms);
        self.body.integrate_wrapped(width, height);
    }

    fn tick_timers(&mut self) {
        self.invuln_timer = self.invuln_timer.saturating_sub(1);
        self.shield_timer = self.shield_timer.saturating_sub(1);
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);
        self.missile_cooldown = self.missile_cooldown.saturating_sub(1);
        self.dash.cooldown = self.dash.cooldown.saturating_sub(1);
        if self.upgrade_timer > 0 {
            self.upgrade_timer -= 1;
            if self.upgrade_timer == 0 {
                self.upgrade_stacks = 0;
            }
        }
    }

    /// Start a dash if off cooldown and fueled
    pub fn try_dash(&mut self, kind: DashKind) -> bool {
        if self.dash.active || self.dash.cooldown > 0 || self.fuel < DASH_FUEL_COST {
            return false;
        }
        let facing = self.body.facing();
        let dir = match kind {
            DashKind::Forward => facing,
            DashKind::Reverse => -facing,
            DashKind::StrafeLeft => -facing.perp(),
            DashKind::StrafeRight => facing.perp(),
        };
        self.fuel -= DASH_FUEL_COST;
        self.dash = DashState {
            active: true,
            remaining: DASH_DURATION_TICKS,
            cooldown: DASH_COOLDOWN_TICKS,
            dir,
            kind,
        };
        true
    }

    /// Fire the main gun; two parallel shots while any upgrade stack is held
    ///
    /// Extra stacks only extend how long the upgrade lasts.
    pub fn fire_bullets(&mut self) -> Vec<Bullet> {
        if self.fire_cooldown > 0 {
            return Vec::new();
        }
        self.fire_cooldown = PLAYER_FIRE_COOLDOWN_TICKS;

        let facing = self.body.facing();
        let side = facing.perp();
        let count: u32 = if self.upgrade_stacks > 0 { 2 } else { 1 };
        let muzzle = self.body.pos + facing * self.body.radius;

        (0..count)
            .map(|i| {
                let offset = (i as f32 - (count - 1) as f32 / 2.0) * DOUBLE_SHOT_SPACING;
                Bullet::new(
                    muzzle + side * offset,
                    facing * BULLET_SPEED + self.body.vel,
                    Owner::Player,
                )
            })
            .collect()
    }

    /// Launch a missile if a whole one is loaded
    pub fn fire_missile(&mut self, id: EntityId) -> Option<Missile> {
        if self.missile_cooldown > 0 || self.missile_segments < MISSILE_SEGMENTS_PER_MISSILE {
            return None;
        }
        self.missile_segments -= MISSILE_SEGMENTS_PER_MISSILE;
        self.missile_cooldown = PLAYER_MISSILE_COOLDOWN_TICKS;
        let muzzle = self.body.pos + self.body.facing() * self.body.radius;
        Some(Missile::launch(id, muzzle, self.body.rotation, self.body.vel, Owner::Player, None))
    }

    /// Apply damage unless shielded or invulnerable; returns damage taken
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if self.is_protected() || !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        self.health = (self.health - amount).max(0.0);
        amount
    }

    pub fn add_fuel(&mut self, amount: f32) {
        self.fuel = (self.fuel + amount).min(self.max_fuel);
    }

    pub fn add_missile_segments(&mut self, segments: u32) {
        self.missile_segments = (self.missile_segments + segments).min(MAX_MISSILE_SEGMENTS);
    }

    /// Pickup effects
    pub fn apply_bonus(&mut self, bonus: &Bonus) {
        match bonus.kind {
            BonusKind::Shield => self.shield_timer = SHIELD_DURATION_TICKS,
            BonusKind::Heal => {
                let amount = bonus.heal_amount.unwrap_or(HEAL_MIN);
                self.health = (self.health + amount).min(self.max_health);
            }
            BonusKind::DoubleShooter => {
                self.upgrade_stacks = (self.upgrade_stacks + 1).min(MAX_UPGRADE_STACKS);
                self.upgrade_timer = UPGRADE_DURATION_TICKS;
            }
            BonusKind::Missile => self.add_missile_segments(BONUS_MISSILE_SEGMENTS),
        }
    }
}
