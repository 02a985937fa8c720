//! Fixed timestep simulation tick
//!
//! Core game loop that advances the world deterministically. Order per tick:
//! player → projectiles/asteroids/bonuses → collisions → aliens → tractor
//! beam → stations → spawning and stage bookkeeping.

use glam::Vec2;

use super::alien::{spawn_aliens, update_aliens};
use super::asteroid::{enforce_single_artifact, generate_stage};
use super::collision::resolve_collisions;
use super::projectile::TargetField;
use super::state::{DashKind, Owner, Player, SimEvent, WorldState};
use super::station::update_stations;
use super::tractor::update_tractor_beam;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Rotate counter-clockwise
    pub left: bool,
    /// Rotate clockwise
    pub right: bool,
    /// Thrust power, 0..=1 (keyboard thrust is 1.0)
    pub thrust: f32,
    pub fire: bool,
    pub fire_missile: bool,
    pub dash: Option<DashKind>,
    /// Tractor beam button (held)
    pub tractor: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the world by one tick
///
/// `now_ms` is the host's monotonic clock and `dt_ms` the time this tick
/// covers. While paused neither is consumed, so every accumulator resumes
/// exactly where it stopped. Events from the previous tick are discarded;
/// hosts drain them after each call.
pub fn tick(world: &mut WorldState, input: &TickInput, now_ms: f64, dt_ms: f64) {
    // Handle pause toggle
    if input.pause {
        world.paused = !world.paused;
        log::info!("{}", if world.paused { "Paused" } else { "Resumed" });
        if world.paused {
            return;
        }
    }

    // Don't tick if paused or game over
    if world.paused || world.game_over {
        return;
    }

    world.events.clear();
    let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
    world.now_ms = if now_ms.is_finite() { now_ms } else { world.now_ms + dt };
    world.time_ticks += 1;

    sanitize(world);

    update_player(world, input);
    update_movers(world);

    resolve_collisions(world);
    update_aliens(world);
    update_tractor_beam(world, input.tractor, dt);
    update_stations(world, dt);
    spawn_aliens(world);

    handle_player_death(world);
    if world.asteroids.is_empty() && !world.game_over {
        advance_stage(world);
    }

    world.normalize_order();
}

/// Drop entities whose bodies went non-finite and re-check the artifact rule
fn sanitize(world: &mut WorldState) {
    let before = (
        world.asteroids.len(),
        world.aliens.len(),
        world.bullets.len(),
        world.missiles.len(),
        world.bonuses.len(),
    );
    world.asteroids.retain(|a| a.body.is_finite() && a.health.is_finite());
    world.aliens.retain(|s| s.body.is_finite() && s.health.is_finite());
    world.bullets.retain(|b| b.body.is_finite());
    world.missiles.retain(|m| m.body.is_finite());
    world.bonuses.retain(|b| b.body.is_finite());
    let after = (
        world.asteroids.len(),
        world.aliens.len(),
        world.bullets.len(),
        world.missiles.len(),
        world.bonuses.len(),
    );
    if before != after {
        log::warn!("Culled malformed entities: before {:?}, after {:?}", before, after);
    }

    if !world.player.body.is_finite() {
        log::warn!("Player body went non-finite; recentred");
        world.player.body.pos = Vec2::new(world.width / 2.0, world.height / 2.0);
        world.player.body.vel = Vec2::ZERO;
        world.player.body.rotation = 0.0;
        world.player.body.cap.clear();
    }

    enforce_single_artifact(&mut world.asteroids);
}

fn update_player(world: &mut WorldState, input: &TickInput) {
    if world.player.is_dead() {
        return;
    }
    let (width, height, now) = (world.width, world.height, world.now_ms);
    world.player.update(input, width, height, now);

    if input.fire {
        let shots = world.player.fire_bullets();
        for _ in &shots {
            world.emit(SimEvent::BulletFired { owner: Owner::Player });
        }
        world.bullets.extend(shots);
    }

    if input.fire_missile && world.player.visible_missiles() > 0 {
        let id = world.next_entity_id();
        if let Some(missile) = world.player.fire_missile(id) {
            world.missiles.push(missile);
            world.emit(SimEvent::MissileLaunched { id, owner: Owner::Player });
        }
    }
}

/// Integrate bullets, missiles, asteroids and bonuses
fn update_movers(world: &mut WorldState) {
    let (width, height, now) = (world.width, world.height, world.now_ms);

    for bullet in &mut world.bullets {
        bullet.update(width, height, now);
    }
    world.bullets.retain(|b| !b.expired());

    {
        let WorldState { missiles, asteroids, aliens, player, .. } = world;
        let targets = TargetField {
            asteroids,
            aliens,
            player: (!player.is_dead()).then_some(player.body.pos),
        };
        for missile in missiles.iter_mut() {
            missile.update(&targets, width, height, now);
        }
    }
    world.missiles.retain(|m| !m.expired());

    for asteroid in &mut world.asteroids {
        asteroid.update(width, height, now);
    }

    for bonus in &mut world.bonuses {
        bonus.update(now);
    }
    world.bonuses.retain(|b| !b.expired(width, height));
}

fn handle_player_death(world: &mut WorldState) {
    if !world.player.is_dead() {
        return;
    }

    world.lives = world.lives.saturating_sub(1);
    world.emit(SimEvent::PlayerDestroyed { lives_left: world.lives });
    if let Some((from, to)) = world.tractor.release() {
        world.emit(SimEvent::TractorPhaseChanged { from, to });
    }

    if world.lives == 0 {
        world.game_over = true;
        log::info!("Game over: stage {}, score {}", world.stage, world.score);
        world.emit(SimEvent::GameOver);
        return;
    }

    let reversed = world.player.controls_reversed;
    world.player = Player::spawn(Vec2::new(world.width / 2.0, world.height / 2.0));
    world.player.controls_reversed = reversed;
    log::info!("Player respawned, {} lives left", world.lives);
}

fn advance_stage(world: &mut WorldState) {
    world.emit(SimEvent::StageCleared { stage: world.stage });
    log::info!("Stage {} cleared", world.stage);
    world.stage += 1;
    world.bullets.clear();
    world.missiles.clear();
    generate_stage(world);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::settings::Settings;
    use crate::sim::state::{Asteroid, AsteroidSize};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn run(world: &mut WorldState, input: &TickInput, ticks: u32) {
        for _ in 0..ticks {
            let now = world.now_ms + TICK_MS;
            tick(world, input, now, TICK_MS);
        }
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut world = WorldState::new(12345, Settings::default());
        tick(&mut world, &TickInput::default(), 16.0, 16.0);
        assert_eq!(world.time_ticks, 1);
        assert_eq!(world.now_ms, 16.0);
    }

    #[test]
    fn test_tick_pause() {
        let mut world = WorldState::new(12345, Settings::default());
        run(&mut world, &TickInput::default(), 1);
        let ticks = world.time_ticks;
        let now = world.now_ms;

        // Now pause
        let input = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut world, &input, now + 100.0, TICK_MS);
        assert!(world.paused);
        tick(&mut world, &TickInput::default(), now + 200.0, TICK_MS);
        assert_eq!(world.time_ticks, ticks);
        assert_eq!(world.now_ms, now);

        // Unpause
        tick(&mut world, &input, now + 300.0, TICK_MS);
        assert!(!world.paused);
        assert_eq!(world.time_ticks, ticks + 1);
    }

    #[test]
    fn test_fire_spawns_bullet() {
        let mut world = WorldState::new(5, Settings::default());
        let input = TickInput {
            fire: true,
            ..Default::default()
        };
        tick(&mut world, &input, TICK_MS, TICK_MS);
        assert!(!world.bullets.is_empty());
        assert!(world
            .events
            .contains(&SimEvent::BulletFired { owner: Owner::Player }));
    }

    #[test]
    fn test_cleared_field_starts_next_stage() {
        let mut world = WorldState::new(8, Settings::default());
        world.asteroids.clear();
        run(&mut world, &TickInput::default(), 1);
        assert_eq!(world.stage, 2);
        assert_eq!(
            world.asteroids.len() as u32,
            STAGE_BASE_ASTEROIDS + 2
        );
        assert!(world.events.contains(&SimEvent::StageCleared { stage: 1 }));
    }

    #[test]
    fn test_death_respawns_then_game_over() {
        let settings = Settings {
            starting_lives: 2,
            aliens_enabled: false,
            ..Settings::default()
        };
        let mut world = WorldState::new(3, settings);
        world.player.health = 0.0;
        run(&mut world, &TickInput::default(), 1);
        assert_eq!(world.lives, 1);
        assert!(!world.game_over);
        assert_eq!(world.player.health, PLAYER_MAX_HEALTH);
        assert_eq!(world.player.invuln_timer, PLAYER_SPAWN_INVULN_TICKS);

        world.player.health = 0.0;
        run(&mut world, &TickInput::default(), 1);
        assert!(world.game_over);
        assert!(world.events.contains(&SimEvent::GameOver));

        let ticks = world.time_ticks;
        run(&mut world, &TickInput::default(), 5);
        assert_eq!(world.time_ticks, ticks);
    }

    #[test]
    fn test_malformed_entities_culled() {
        let mut world = WorldState::new(4, Settings::default());
        let mut rng = Pcg32::seed_from_u64(4);
        let mut broken = Asteroid::new(9999, AsteroidSize::Small, Vec2::ZERO, Vec2::ZERO, &mut rng);
        broken.body.pos = Vec2::new(f32::NAN, 0.0);
        world.asteroids.push(broken);
        world.player.body.vel = Vec2::new(f32::INFINITY, 0.0);

        tick(&mut world, &TickInput::default(), f64::NAN, f64::NAN);

        assert!(world.asteroid(9999).is_none());
        assert!(world.player.body.is_finite());
        assert!(world.now_ms.is_finite());
    }

    #[test]
    fn test_determinism() {
        // Two worlds with the same seed and inputs stay identical
        let mut world1 = WorldState::new(99999, Settings::default());
        let mut world2 = WorldState::new(99999, Settings::default());

        let inputs = [
            TickInput {
                thrust: 1.0,
                right: true,
                ..Default::default()
            },
            TickInput {
                fire: true,
                ..Default::default()
            },
            TickInput {
                dash: Some(DashKind::StrafeLeft),
                tractor: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for step in 0..1200 {
            let input = &inputs[step % inputs.len()];
            run(&mut world1, input, 1);
            run(&mut world2, input, 1);
        }

        assert_eq!(world1.time_ticks, world2.time_ticks);
        let a = serde_json::to_string(&world1).unwrap();
        let b = serde_json::to_string(&world2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_long_run_keeps_invariants() {
        let settings = Settings {
            difficulty: crate::Difficulty::Hard,
            ..Settings::default()
        };
        let mut world = WorldState::new(2024, settings);
        let input = TickInput {
            thrust: 0.5,
            left: true,
            fire: true,
            fire_missile: true,
            tractor: true,
            ..Default::default()
        };

        for _ in 0..6000 {
            run(&mut world, &input, 1);
            assert!(world.asteroids.iter().filter(|a| a.is_artifact()).count() <= 1);
            assert!(world.asteroids.iter().all(|a| a.body.is_finite() && a.body.radius > 0.0));
            assert!(world.aliens.iter().all(|s| s.body.is_finite()));
            if world.tractor.is_idle() {
                assert!(world.tractor.target.is_none());
            }
            let grid = &world.tractor.grid_scan;
            assert!(grid.revealed_count <= grid.cell_count());
            if world.game_over {
                break;
            }
        }
    }
}
