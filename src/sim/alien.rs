//! Alien ships
//!
//! Steering is a continuous controller over a handful of timers and biases
//! in [`Steering`]. Patrol, orbit and avoid behaviour falls out of the blend:
//!
//! 1. Side bias and rethink timer are seeded on first update.
//! 2. When the rethink timer runs out, roll: flip bias, orbit waypoint around
//!    the goal, or random roam point.
//! 3. Base heading toward the waypoint, else toward the goal with a lateral
//!    orbit term.
//! 4. Avoidance: look-ahead cone steer-away plus radial repulsion.
//! 5. Proportional turn, thrust, drag, wrap.
//!
//! Science vessels run the same controller with their docking asteroid as
//! the goal.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::body::KineticBody;
use super::state::{
    AlienRole, AlienShip, Asteroid, Bullet, CombatExt, EntityId, Missile, MissileTarget, Owner,
    ScienceExt, ScienceMode, SimEvent, Steering, WorldState,
};
use super::velocity_cap::{SpeedClass, apply_class_cap};
use crate::consts::*;
use crate::{direction, heading_of, normalize_angle, polar_to_cartesian, wrap_position};

/// What kind of ship a spawn produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlienKind {
    Combat,
    MissileCombat,
    Science,
}

impl AlienKind {
    pub fn roll(rng: &mut impl Rng) -> Self {
        let roll: f32 = rng.random();
        if roll < SCIENCE_SPAWN_CHANCE {
            AlienKind::Science
        } else if roll < MISSILE_TYPE_SPAWN_CHANCE {
            AlienKind::MissileCombat
        } else {
            AlienKind::Combat
        }
    }
}

/// Result of one doom-sequence step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoomStep {
    Waiting,
    /// Entered this doom stage (1-based)
    Stage(u8),
    Complete,
}

impl AlienShip {
    pub fn spawn(id: EntityId, kind: AlienKind, pos: Vec2, difficulty: f32) -> Self {
        let difficulty = if difficulty.is_finite() && difficulty > 0.0 { difficulty } else { 1.0 };
        let (radius, health, speed, role) = match kind {
            AlienKind::Combat => (
                ALIEN_RADIUS,
                ALIEN_MAX_HEALTH,
                ALIEN_SPEED,
                AlienRole::Combat(CombatExt {
                    missile_type: false,
                    doom_countdown: DOOM_COUNTDOWN_TICKS,
                    doom_stage: 0,
                    doom_stage_timer: 0,
                }),
            ),
            AlienKind::MissileCombat => (
                ALIEN_RADIUS,
                ALIEN_MAX_HEALTH,
                MISSILE_TYPE_SPEED,
                AlienRole::Combat(CombatExt {
                    missile_type: true,
                    doom_countdown: MISSILE_TYPE_DOOM_COUNTDOWN_TICKS,
                    doom_stage: 0,
                    doom_stage_timer: 0,
                }),
            ),
            AlienKind::Science => (
                SCIENCE_RADIUS,
                SCIENCE_MAX_HEALTH,
                SCIENCE_SPEED,
                AlienRole::Science(ScienceExt {
                    mode: ScienceMode::Approaching,
                    target: None,
                    docking_progress: 0.0,
                    patrol_timer: 0,
                }),
            ),
        };
        Self {
            id,
            body: KineticBody::new(pos, Vec2::ZERO, radius),
            health,
            max_health: health,
            speed,
            fire_rate: ALIEN_FIRE_INTERVAL_TICKS,
            fire_cooldown: ALIEN_FIRE_INTERVAL_TICKS as u32,
            difficulty,
            steering: Steering::default(),
            knocked_timer: 0,
            role,
        }
    }

    pub fn speed_class(&self) -> SpeedClass {
        match self.role {
            AlienRole::Science(_) => SpeedClass::ScienceVessel,
            AlienRole::Combat(CombatExt { missile_type: true, .. }) => SpeedClass::MissileAlien,
            AlienRole::Combat(_) => SpeedClass::Alien,
        }
    }

    #[inline]
    pub fn is_knocked(&self) -> bool {
        self.knocked_timer > 0
    }

    /// Reduce agility for a while after an impact
    pub fn knock(&mut self) {
        self.knocked_timer = ALIEN_KNOCK_TICKS;
    }

    /// Returns true if this hit destroyed the ship
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if self.is_destroyed() || !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        self.health -= amount;
        self.is_destroyed()
    }

    /// Unit heading toward the waypoint, else toward `goal` with orbit pull
    ///
    /// The lateral term fades out with distance so a far-off ship flies
    /// straight at its goal.
    pub fn base_heading(&self, goal: Vec2) -> Vec2 {
        let pos = self.body.pos;
        if let Some(waypoint) = self.steering.waypoint {
            return (waypoint - pos).normalize_or(self.body.facing());
        }

        let to_goal = goal - pos;
        let dist = to_goal.length();
        let Some(dir) = to_goal.try_normalize() else {
            return self.body.facing();
        };
        let closeness = (1.0 - dist / ORBIT_ENGAGE_DIST).clamp(0.0, 1.0);
        let lateral = dir.perp() * self.steering.side_bias * ORBIT_LATERAL_WEIGHT * closeness;
        (dir + lateral).normalize_or(dir)
    }

    /// Steer-away vector from nearby asteroids (zero when clear)
    pub fn avoidance(&self, asteroids: &[Asteroid]) -> Vec2 {
        let pos = self.body.pos;
        let forward = self.body.facing();
        let mut avoid = Vec2::ZERO;

        for asteroid in asteroids.iter().filter(|a| a.body.is_finite()) {
            let to_asteroid = asteroid.body.pos - pos;
            let reach = AVOID_LOOK_AHEAD + asteroid.body.radius;

            // Forward cone
            let ahead = to_asteroid.dot(forward);
            if ahead > 0.0 && ahead < reach {
                let lateral = forward.perp_dot(to_asteroid);
                let clearance = asteroid.body.radius + self.body.radius + AVOID_CONE_MARGIN;
                if lateral.abs() < clearance {
                    let closeness = 1.0 - ahead / reach;
                    let away = if lateral >= 0.0 { -1.0 } else { 1.0 };
                    avoid += forward.perp() * away * closeness * AVOID_STEER_WEIGHT;
                }
            }

            // Radial repulsion
            let dist = to_asteroid.length();
            let repulse = asteroid.body.radius + AVOID_REPULSE_MARGIN;
            if dist > 0.0 && dist < repulse {
                let depth = (repulse - dist) / repulse;
                avoid -= to_asteroid / dist * depth * AVOID_REPULSE_WEIGHT;
            }
        }

        if self.is_knocked() {
            avoid *= KNOCKED_AVOID_SCALE;
        }
        avoid
    }

    fn rethink(&mut self, goal: Vec2, rng: &mut impl Rng, width: f32, height: f32) {
        let s = &mut self.steering;
        let roll: f32 = rng.random();
        if roll < FLIP_BIAS_CHANCE {
            s.side_bias = -s.side_bias;
        } else if roll < ORBIT_WAYPOINT_CHANCE {
            let radius = rng.random_range(ORBIT_RADIUS_MIN..=ORBIT_RADIUS_MAX);
            let bearing = heading_of(self.body.pos - goal) + s.side_bias * rng.random_range(0.3..=1.2);
            s.waypoint = Some(wrap_position(goal + polar_to_cartesian(radius, bearing), width, height));
            s.waypoint_timer = rng.random_range(ORBIT_WAYPOINT_MIN_TICKS..=ORBIT_WAYPOINT_MAX_TICKS);
        } else {
            s.waypoint = Some(Vec2::new(rng.random_range(0.0..width), rng.random_range(0.0..height)));
            s.waypoint_timer = rng.random_range(ROAM_WAYPOINT_MIN_TICKS..=ROAM_WAYPOINT_MAX_TICKS);
        }
        s.rethink_timer = rng.random_range(RETHINK_MIN_TICKS..=RETHINK_MAX_TICKS);
    }

    /// One tick of steering toward `goal`
    pub fn steer(
        &mut self,
        goal: Vec2,
        asteroids: &[Asteroid],
        rng: &mut impl Rng,
        width: f32,
        height: f32,
        now_ms: f64,
    ) {
        if !self.steering.initialized {
            self.steering.side_bias = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            self.steering.rethink_timer = rng.random_range(RETHINK_MIN_TICKS..=RETHINK_MAX_TICKS);
            self.steering.initialized = true;
        }

        self.steering.rethink_timer = self.steering.rethink_timer.saturating_sub(1);
        if self.steering.rethink_timer == 0 {
            self.rethink(goal, rng, width, height);
        }

        if let Some(waypoint) = self.steering.waypoint {
            self.steering.waypoint_timer = self.steering.waypoint_timer.saturating_sub(1);
            if self.steering.waypoint_timer == 0 || self.body.pos.distance(waypoint) < WAYPOINT_ARRIVE_DIST {
                self.steering.waypoint = None;
            }
        }

        let base = self.base_heading(goal);
        let desired = (base + self.avoidance(asteroids)).normalize_or(base);

        let knocked = self.is_knocked();
        let turn_rate = if knocked { ALIEN_KNOCKED_TURN_RATE } else { ALIEN_TURN_RATE };
        let delta = normalize_angle(heading_of(desired) - self.body.rotation);
        self.body.rotation += delta * turn_rate;

        let gain = if knocked { ALIEN_KNOCKED_THRUST_GAIN } else { ALIEN_THRUST_GAIN };
        self.body.vel += self.body.facing() * gain * self.speed;
        self.body.vel *= ALIEN_DRAG;

        let class = self.speed_class();
        apply_class_cap(&mut self.body, class, now_ms);
        self.body.integrate_wrapped(width, height);
        self.knocked_timer = self.knocked_timer.saturating_sub(1);
    }

    /// Aimed shot at the player when in range and off cooldown
    pub fn try_fire(&mut self, player_pos: Vec2, rng: &mut impl Rng) -> Option<Bullet> {
        if self.is_science() {
            return None;
        }
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);
        if self.fire_cooldown > 0 || self.body.pos.distance(player_pos) > ALIEN_FIRE_RANGE {
            return None;
        }

        let jitter = ALIEN_AIM_JITTER / self.difficulty;
        let aim = heading_of(player_pos - self.body.pos) + rng.random_range(-jitter..=jitter);
        self.fire_cooldown = (self.fire_rate / self.difficulty).round().max(10.0) as u32;

        let dir = direction(aim);
        Some(Bullet::new(
            self.body.pos + dir * self.body.radius,
            dir * ALIEN_BULLET_SPEED,
            Owner::Alien,
        ))
    }

    /// Count down to the doom sequence and walk its stages
    pub fn advance_doom(&mut self) -> DoomStep {
        let AlienRole::Combat(combat) = &mut self.role else {
            return DoomStep::Waiting;
        };
        let stage_ticks = if combat.missile_type {
            MISSILE_TYPE_DOOM_STAGE_TICKS
        } else {
            DOOM_STAGE_TICKS
        };

        if combat.doom_stage == 0 {
            combat.doom_countdown = combat.doom_countdown.saturating_sub(1);
            if combat.doom_countdown > 0 {
                return DoomStep::Waiting;
            }
            combat.doom_stage = 1;
            combat.doom_stage_timer = stage_ticks;
            return DoomStep::Stage(1);
        }

        combat.doom_stage_timer = combat.doom_stage_timer.saturating_sub(1);
        if combat.doom_stage_timer > 0 {
            return DoomStep::Waiting;
        }
        if combat.doom_stage >= DOOM_STAGES {
            return DoomStep::Complete;
        }
        combat.doom_stage += 1;
        combat.doom_stage_timer = stage_ticks;
        DoomStep::Stage(combat.doom_stage)
    }

    /// Science vessel bookkeeping; returns the steering goal
    fn update_science(&mut self, asteroids: &[Asteroid], fallback: Vec2) -> Vec2 {
        let ship_pos = self.body.pos;
        let ship_radius = self.body.radius;
        let AlienRole::Science(science) = &mut self.role else {
            return fallback;
        };

        let target = science
            .target
            .and_then(|id| asteroids.iter().find(|a| a.id == id && !a.is_destroyed() && !a.is_artifact()));

        match (science.mode, target) {
            (ScienceMode::Patrolling, _) => {
                science.patrol_timer = science.patrol_timer.saturating_sub(1);
                if science.patrol_timer == 0 {
                    match nearest_dockable(asteroids, ship_pos) {
                        Some(found) => {
                            science.target = Some(found.id);
                            science.mode = ScienceMode::Approaching;
                            return found.body.pos;
                        }
                        None => science.patrol_timer = SCIENCE_PATROL_TICKS,
                    }
                }
                fallback
            }
            (_, None) => {
                // Lost the target (or never had one); pick again next patrol
                science.target = None;
                science.mode = ScienceMode::Patrolling;
                science.patrol_timer = if science.docking_progress > 0.0 { SCIENCE_PATROL_TICKS } else { 1 };
                fallback
            }
            (mode, Some(asteroid)) => {
                let dock_range = asteroid.body.radius + ship_radius + SCIENCE_DOCK_GAP;
                let dist = ship_pos.distance(asteroid.body.pos);
                match mode {
                    ScienceMode::Approaching if dist <= dock_range => science.mode = ScienceMode::Docking,
                    ScienceMode::Docking if dist > dock_range * 1.5 => science.mode = ScienceMode::Approaching,
                    ScienceMode::Docking => {
                        science.docking_progress = (science.docking_progress + SCIENCE_DOCK_RATE).min(100.0);
                    }
                    _ => {}
                }
                asteroid.body.pos
            }
        }
    }

    /// Docked vessel that finished its survey
    pub fn ready_to_depart(&self) -> bool {
        self.science().is_some_and(|s| s.docking_progress >= 100.0)
    }
}

fn nearest_dockable(asteroids: &[Asteroid], from: Vec2) -> Option<&Asteroid> {
    asteroids
        .iter()
        .filter(|a| !a.is_destroyed() && !a.is_artifact() && a.body.is_finite())
        .min_by(|a, b| {
            a.body
                .pos
                .distance_squared(from)
                .partial_cmp(&b.body.pos.distance_squared(from))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Steer, fire and run the doom/departure bookkeeping for every ship
pub fn update_aliens(world: &mut WorldState) {
    let player_pos = world.player.body.pos;
    let player_alive = !world.player.is_dead();
    let (width, height, now_ms) = (world.width, world.height, world.now_ms);
    let center = Vec2::new(width / 2.0, height / 2.0);

    let mut shots = 0;
    let mut doomed = Vec::new();
    let mut departed = Vec::new();
    {
        let WorldState { aliens, asteroids, rng, bullets, .. } = world;
        for ship in aliens.iter_mut().filter(|s| s.body.is_finite()) {
            let goal = if ship.is_science() {
                ship.update_science(asteroids, center)
            } else {
                player_pos
            };
            ship.steer(goal, asteroids, rng, width, height, now_ms);

            if ship.is_science() {
                if ship.ready_to_depart() {
                    departed.push(ship.id);
                }
                continue;
            }

            if player_alive {
                if let Some(bullet) = ship.try_fire(player_pos, rng) {
                    bullets.push(bullet);
                    shots += 1;
                }
            }
            match ship.advance_doom() {
                DoomStep::Stage(stage) => log::debug!("Alien {} doom stage {}", ship.id, stage),
                DoomStep::Complete => doomed.push((ship.id, ship.body.pos, ship.body.vel, ship.is_missile_type())),
                DoomStep::Waiting => {}
            }
        }
    }

    for _ in 0..shots {
        world.emit(SimEvent::BulletFired { owner: Owner::Alien });
    }

    for (id, pos, vel, missile_type) in doomed {
        world.aliens.retain(|s| s.id != id);
        world.emit(SimEvent::AlienDoomed { id, pos });
        if missile_type {
            let missile_id = world.next_entity_id();
            let heading = heading_of(player_pos - pos);
            world.missiles.push(Missile::launch(
                missile_id,
                pos,
                heading,
                vel,
                Owner::Alien,
                Some(MissileTarget::Player),
            ));
            world.emit(SimEvent::MissileLaunched { id: missile_id, owner: Owner::Alien });
        }
    }

    for id in departed {
        world.aliens.retain(|s| s.id != id);
        log::info!("Science vessel {} departed", id);
        world.emit(SimEvent::ScienceVesselDeparted { id });
    }
}

/// Interval spawns at the field edge, up to the difficulty's limit
pub fn spawn_aliens(world: &mut WorldState) {
    if !world.settings.aliens_enabled {
        return;
    }
    world.alien_spawn_timer = world.alien_spawn_timer.saturating_sub(1);
    if world.alien_spawn_timer > 0 {
        return;
    }
    let difficulty = world.settings.difficulty;
    world.alien_spawn_timer = difficulty.alien_spawn_interval_ticks();
    if world.aliens.len() >= difficulty.max_aliens() {
        return;
    }

    let kind = AlienKind::roll(&mut world.rng);
    let pos = edge_point(&mut world.rng, world.width, world.height);
    let id = world.next_entity_id();
    let mut ship = AlienShip::spawn(id, kind, pos, difficulty.alien_difficulty());
    ship.body.rotation = world.rng.random_range(0.0..TAU);
    world.aliens.push(ship);

    log::info!("Alien {} spawned ({:?})", id, kind);
    world.emit(SimEvent::AlienSpawned { id });
}

fn edge_point(rng: &mut impl Rng, width: f32, height: f32) -> Vec2 {
    match rng.random_range(0..4) {
        0 => Vec2::new(rng.random_range(0.0..width), 0.0),
        1 => Vec2::new(width - 1.0, rng.random_range(0.0..height)),
        2 => Vec2::new(rng.random_range(0.0..width), height - 1.0),
        _ => Vec2::new(0.0, rng.random_range(0.0..height)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::state::AsteroidSize;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn ship_at(pos: Vec2, rotation: f32) -> AlienShip {
        let mut ship = AlienShip::spawn(1, AlienKind::Combat, pos, 1.0);
        ship.body.rotation = rotation;
        ship
    }

    #[test]
    fn test_unknocked_turns_at_full_rate() {
        let mut rng = Pcg32::seed_from_u64(21);
        let mut ship = ship_at(Vec2::new(100.0, 360.0), 0.5);
        let player = Vec2::new(700.0, 360.0);

        ship.steer(player, &[], &mut rng, FIELD_WIDTH, FIELD_HEIGHT, 0.0);

        // Player lies along heading 0
        let expected = 0.5 + ALIEN_TURN_RATE * (0.0 - 0.5);
        assert!((ship.body.rotation - expected).abs() < 1e-6, "{}", ship.body.rotation);
        assert!(ship.steering.initialized);
        assert!(ship.steering.side_bias.abs() == 1.0);
    }

    #[test]
    fn test_knocked_turns_slower() {
        let mut rng = Pcg32::seed_from_u64(21);
        let mut ship = ship_at(Vec2::new(100.0, 360.0), 0.5);
        ship.knock();
        ship.steer(Vec2::new(700.0, 360.0), &[], &mut rng, FIELD_WIDTH, FIELD_HEIGHT, 0.0);
        let expected = 0.5 + ALIEN_KNOCKED_TURN_RATE * (0.0 - 0.5);
        assert!((ship.body.rotation - expected).abs() < 1e-6);
        assert_eq!(ship.knocked_timer, ALIEN_KNOCK_TICKS - 1);
    }

    #[test]
    fn test_close_goal_adds_orbit_pull() {
        let mut ship = ship_at(Vec2::new(100.0, 100.0), 0.0);
        ship.steering.side_bias = 1.0;
        let heading = heading_of(ship.base_heading(Vec2::new(200.0, 100.0)));
        assert!(heading > 0.0);
        ship.steering.side_bias = -1.0;
        let heading = heading_of(ship.base_heading(Vec2::new(200.0, 100.0)));
        assert!(heading < 0.0);
    }

    #[test]
    fn test_orbit_pull_fades_with_distance() {
        let mut rng = Pcg32::seed_from_u64(21);
        let mut ship = ship_at(Vec2::new(100.0, 360.0), 0.5);
        ship.steering.initialized = true;
        ship.steering.side_bias = 1.0;
        ship.steering.rethink_timer = 200;

        // Goal 150 px ahead: lateral weight scaled by 1 - 150/320
        ship.steer(Vec2::new(250.0, 360.0), &[], &mut rng, FIELD_WIDTH, FIELD_HEIGHT, 0.0);

        let closeness = 1.0 - 150.0 / ORBIT_ENGAGE_DIST;
        let want = (ORBIT_LATERAL_WEIGHT * closeness).atan();
        let expected = 0.5 + ALIEN_TURN_RATE * (want - 0.5);
        assert!((ship.body.rotation - expected).abs() < 1e-5, "{}", ship.body.rotation);
        assert!(ship.body.rotation > 0.5 + ALIEN_TURN_RATE * (0.0 - 0.5));

        // Beyond the engage distance there is no lateral term at all
        let far = ship_at(Vec2::new(100.0, 360.0), 0.0);
        let heading = heading_of(far.base_heading(Vec2::new(100.0 + ORBIT_ENGAGE_DIST + 10.0, 360.0)));
        assert!(heading.abs() < 1e-6);
    }

    #[test]
    fn test_avoidance_steers_away_from_asteroid_ahead() {
        let mut rng = Pcg32::seed_from_u64(1);
        let ship = ship_at(Vec2::new(100.0, 100.0), 0.0);
        // Slightly to the +y side of the nose
        let rock = Asteroid::new(5, AsteroidSize::Medium, Vec2::new(200.0, 110.0), Vec2::ZERO, &mut rng);
        let avoid = ship.avoidance(std::slice::from_ref(&rock));
        assert!(avoid.y < 0.0);

        let mut knocked = ship.clone();
        knocked.knock();
        let scaled = knocked.avoidance(std::slice::from_ref(&rock));
        assert!((scaled - avoid * KNOCKED_AVOID_SCALE).length() < 1e-5);
    }

    #[test]
    fn test_far_asteroid_behind_is_ignored() {
        let mut rng = Pcg32::seed_from_u64(1);
        let ship = ship_at(Vec2::new(500.0, 100.0), 0.0);
        let rock = Asteroid::new(5, AsteroidSize::Small, Vec2::new(100.0, 100.0), Vec2::ZERO, &mut rng);
        assert_eq!(ship.avoidance(&[rock]), Vec2::ZERO);
    }

    #[test]
    fn test_waypoint_cleared_on_arrival() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut ship = ship_at(Vec2::new(100.0, 100.0), 0.0);
        ship.steering.initialized = true;
        ship.steering.side_bias = 1.0;
        ship.steering.rethink_timer = 200;
        ship.steering.waypoint = Some(Vec2::new(110.0, 100.0));
        ship.steering.waypoint_timer = 100;
        ship.steer(Vec2::new(600.0, 600.0), &[], &mut rng, FIELD_WIDTH, FIELD_HEIGHT, 0.0);
        assert!(ship.steering.waypoint.is_none());
    }

    #[test]
    fn test_doom_sequence_runs_three_stages() {
        let mut ship = AlienShip::spawn(1, AlienKind::MissileCombat, Vec2::ZERO, 1.0);
        let total = MISSILE_TYPE_DOOM_COUNTDOWN_TICKS + 3 * MISSILE_TYPE_DOOM_STAGE_TICKS;
        let mut stages = Vec::new();
        for i in 1..=total {
            match ship.advance_doom() {
                DoomStep::Stage(s) => stages.push(s),
                DoomStep::Complete => {
                    assert_eq!(i, total);
                    break;
                }
                DoomStep::Waiting => assert!(i < total),
            }
        }
        assert_eq!(stages, vec![1, 2, 3]);
        assert_eq!(ship.doom_stage(), 3);
    }

    #[test]
    fn test_fire_needs_range_and_cooldown() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ship = ship_at(Vec2::new(100.0, 100.0), 0.0);
        ship.fire_cooldown = 1;
        assert!(ship.try_fire(Vec2::new(900.0, 700.0), &mut rng).is_none());
        ship.fire_cooldown = 1;
        let bullet = ship.try_fire(Vec2::new(300.0, 100.0), &mut rng).unwrap();
        assert_eq!(bullet.owner, Owner::Alien);
        assert!(ship.fire_cooldown >= 10);
    }

    #[test]
    fn test_science_vessel_docks_and_departs() {
        let mut world = WorldState::empty(5, Settings::default());
        let mut rng = Pcg32::seed_from_u64(5);
        let rock = Asteroid::new(50, AsteroidSize::Large, Vec2::new(300.0, 300.0), Vec2::ZERO, &mut rng);
        world.asteroids.push(rock);
        let mut vessel = AlienShip::spawn(60, AlienKind::Science, Vec2::new(300.0, 230.0), 1.0);
        vessel.role = AlienRole::Science(ScienceExt {
            mode: ScienceMode::Docking,
            target: Some(50),
            docking_progress: 99.8,
            patrol_timer: 0,
        });
        world.aliens.push(vessel);

        update_aliens(&mut world);
        assert!(world.aliens.is_empty());
        assert!(world.events.contains(&SimEvent::ScienceVesselDeparted { id: 60 }));
    }

    #[test]
    fn test_science_vessel_patrols_without_target() {
        let mut vessel = AlienShip::spawn(1, AlienKind::Science, Vec2::new(100.0, 100.0), 1.0);
        let goal = vessel.update_science(&[], Vec2::new(480.0, 360.0));
        assert_eq!(goal, Vec2::new(480.0, 360.0));
        assert_eq!(vessel.science().map(|s| s.mode), Some(ScienceMode::Patrolling));
        assert!(vessel.try_fire(Vec2::new(120.0, 100.0), &mut Pcg32::seed_from_u64(0)).is_none());
    }

    #[test]
    fn test_spawn_respects_limit() {
        let mut world = WorldState::empty(8, Settings::default());
        let limit = world.settings.difficulty.max_aliens();
        for _ in 0..(limit + 2) {
            world.alien_spawn_timer = 1;
            spawn_aliens(&mut world);
        }
        assert_eq!(world.aliens.len(), limit);
    }
}
