//! Tractor beam abduction
//!
//! `Idle → Approaching → Locking → Attached → Displaying → Pushing → Idle`
//!
//! [`TractorBeamState`] holds the phase, the single target and the phase
//! timers. [`update_tractor_beam`] is the driver the tick calls: it decides
//! transitions from proximity and accumulated time, and runs the grid scan
//! while attached. Timers only advance through `dt_ms`, so a paused loop
//! leaves the sequence exactly where it was.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid_scan::GridScanState;
use super::state::{EntityId, SimEvent, WorldState};
use crate::consts::*;
use crate::{direction, heading_of, polar_to_cartesian, toroidal_delta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TractorPhase {
    #[default]
    Idle,
    Approaching,
    Locking,
    Attached,
    Displaying,
    Pushing,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TractorBeamState {
    pub active: bool,
    pub phase: TractorPhase,
    pub target: Option<EntityId>,
    pub orbit_angle: f32,
    pub orbit_radius: f32,
    /// Copied from the target's artifact at engage time
    pub flipit_chance: f32,
    pub attach_start_ms: Option<f64>,
    pub display_start_ms: Option<f64>,
    pub push_start_ms: Option<f64>,
    /// Time spent in the current phase
    pub phase_elapsed_ms: f64,
    /// Outcome of the decode roll, set once per sequence
    pub decode_result: Option<bool>,
    pub grid_scan: GridScanState,
}

impl TractorBeamState {
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.phase == TractorPhase::Idle
    }

    /// Switch phase and reset the phase clock
    ///
    /// Entering `Idle` drops the target. Returns the `(from, to)` pair when
    /// the phase actually changed.
    pub fn set_phase(&mut self, to: TractorPhase) -> Option<(TractorPhase, TractorPhase)> {
        let from = self.phase;
        if from == to {
            return None;
        }
        self.phase = to;
        self.phase_elapsed_ms = 0.0;
        self.active = to != TractorPhase::Idle;
        if to == TractorPhase::Idle {
            self.target = None;
            self.attach_start_ms = None;
            self.display_start_ms = None;
            self.push_start_ms = None;
            self.decode_result = None;
        }
        log::debug!("Tractor {:?} -> {:?}", from, to);
        Some((from, to))
    }

    /// Point the beam at a target; only valid from `Idle`
    pub fn engage(
        &mut self,
        target: EntityId,
        flipit_chance: f32,
        orbit_radius: f32,
        orbit_angle: f32,
    ) -> Option<(TractorPhase, TractorPhase)> {
        if !self.is_idle() {
            return None;
        }
        self.target = Some(target);
        self.flipit_chance = flipit_chance;
        self.orbit_radius = orbit_radius;
        self.orbit_angle = orbit_angle;
        self.set_phase(TractorPhase::Approaching)
    }

    /// Abort the sequence from any phase
    pub fn release(&mut self) -> Option<(TractorPhase, TractorPhase)> {
        self.grid_scan.cancel();
        self.set_phase(TractorPhase::Idle)
    }

    /// Where the held asteroid sits relative to the player
    pub fn orbit_point(&self, player_pos: Vec2) -> Vec2 {
        player_pos + polar_to_cartesian(self.orbit_radius, self.orbit_angle)
    }
}

fn emit_transition(world: &mut WorldState, change: Option<(TractorPhase, TractorPhase)>) {
    if let Some((from, to)) = change {
        world.emit(SimEvent::TractorPhaseChanged { from, to });
    }
}

/// Nearest undecoded artifact within beam range of the player
fn find_artifact(world: &WorldState) -> Option<EntityId> {
    let player = world.player.body.pos;
    let (width, height) = (world.width, world.height);
    world
        .asteroids
        .iter()
        .filter(|a| a.artifact.is_some_and(|art| !art.decoded()) && !a.is_destroyed())
        .map(|a| (a.id, toroidal_delta(player, a.body.pos, width, height).length()))
        .filter(|(_, d)| *d <= TRACTOR_RANGE)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, _)| id)
}

/// Drive the beam one tick
///
/// `engage` is the player's beam button. It starts a sequence from `Idle`
/// and must stay held while the target is being pulled in; once locked the
/// sequence runs to completion on its own.
pub fn update_tractor_beam(world: &mut WorldState, engage: bool, dt_ms: f64) {
    let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
    let now = world.now_ms;
    let player_pos = world.player.body.pos;
    let player_vel = world.player.body.vel;
    let (width, height) = (world.width, world.height);

    if world.tractor.is_idle() {
        if engage && !world.player.is_dead() {
            if let Some(id) = find_artifact(world) {
                let Some(asteroid) = world.asteroid(id) else {
                    return;
                };
                let chance = asteroid.artifact.map(|a| a.flipit_chance()).unwrap_or(0.0);
                let radius = PLAYER_RADIUS + asteroid.body.radius + TRACTOR_ORBIT_GAP;
                let angle = heading_of(toroidal_delta(player_pos, asteroid.body.pos, width, height));
                let change = world.tractor.engage(id, chance, radius, angle);
                log::info!("Tractor engaged asteroid {}", id);
                emit_transition(world, change);
            }
        }
        return;
    }

    // Target gone (destroyed, culled) or player died: drop everything
    let target = world.tractor.target.filter(|id| world.asteroid(*id).is_some());
    let Some(target) = target.filter(|_| !world.player.is_dead()) else {
        let change = world.tractor.release();
        emit_transition(world, change);
        return;
    };

    world.tractor.phase_elapsed_ms += dt;
    let phase = world.tractor.phase;
    let orbit_point = world.tractor.orbit_point(player_pos);

    let mut next = None;
    match phase {
        TractorPhase::Idle => {}
        TractorPhase::Approaching => {
            let Some(asteroid) = world.asteroid_mut(target) else {
                return;
            };
            // Orbit point and asteroid may sit on opposite edges of the field
            let dist = toroidal_delta(player_pos, asteroid.body.pos, width, height).length();
            if !engage || dist > TRACTOR_BREAK_RANGE {
                next = Some(TractorPhase::Idle);
            } else {
                let pull = toroidal_delta(asteroid.body.pos, orbit_point, width, height);
                asteroid.body.vel = (asteroid.body.vel + pull * TRACTOR_PULL) * 0.8;
                if pull.length() <= TRACTOR_LOCK_DIST {
                    next = Some(TractorPhase::Locking);
                }
            }
        }
        TractorPhase::Locking => {
            hold(world, target, orbit_point, player_vel);
            if world.tractor.phase_elapsed_ms >= TRACTOR_LOCK_MS {
                let radius = world.asteroid(target).map(|a| a.body.radius).unwrap_or(0.0);
                let rate = world.settings.grid_reveal_rate;
                world.tractor.grid_scan.start(radius, target, now, rate);
                world.tractor.attach_start_ms = Some(now);
                next = Some(TractorPhase::Attached);
            }
        }
        TractorPhase::Attached => {
            world.tractor.orbit_angle += TRACTOR_ORBIT_SPEED;
            let orbit_point = world.tractor.orbit_point(player_pos);
            hold(world, target, orbit_point, player_vel);

            if world.tractor.grid_scan.advance(dt) {
                world.emit(SimEvent::GridScanComplete { target });
                decode(world, target);
                world.tractor.display_start_ms = Some(now);
                next = Some(TractorPhase::Displaying);
            }
        }
        TractorPhase::Displaying => {
            hold(world, target, orbit_point, player_vel);
            world.tractor.grid_scan.advance(dt);
            if world.tractor.phase_elapsed_ms >= TRACTOR_DISPLAY_MS {
                if let Some(asteroid) = world.asteroid_mut(target) {
                    let away = toroidal_delta(player_pos, asteroid.body.pos, width, height);
                    let away = direction(heading_of(away));
                    asteroid.body.vel = away * TRACTOR_PUSH_SPEED + player_vel;
                }
                world.tractor.push_start_ms = Some(now);
                next = Some(TractorPhase::Pushing);
            }
        }
        TractorPhase::Pushing => {
            world.tractor.grid_scan.advance(dt);
            if world.tractor.phase_elapsed_ms >= TRACTOR_PUSH_MS {
                next = Some(TractorPhase::Idle);
            }
        }
    }

    if let Some(to) = next {
        let change = if to == TractorPhase::Idle {
            world.tractor.release()
        } else {
            world.tractor.set_phase(to)
        };
        emit_transition(world, change);
    }
}

/// Pin the target to the orbit point, moving with the player
fn hold(world: &mut WorldState, target: EntityId, orbit_point: Vec2, player_vel: Vec2) {
    let (width, height) = (world.width, world.height);
    if let Some(asteroid) = world.asteroid_mut(target) {
        asteroid.body.pos = crate::wrap_position(orbit_point, width, height);
        asteroid.body.vel = player_vel;
        asteroid.body.cap.clear();
    }
}

/// Roll the reward against the frozen chance, once per artifact
fn decode(world: &mut WorldState, target: EntityId) {
    let chance = world.tractor.flipit_chance;
    let flipit = world.rng.random::<f32>() < chance;
    let Some(asteroid) = world.asteroid_mut(target) else {
        return;
    };
    let Some(artifact) = asteroid.artifact.as_mut() else {
        return;
    };
    if artifact.decoded() {
        return;
    }
    artifact.mark_decoded();

    world.tractor.decode_result = Some(flipit);
    world.score += SCORE_ARTIFACT_DECODE;
    if flipit {
        world.flipits += 1;
    }
    log::info!("Artifact {} decoded, flipit={}", target, flipit);
    world.emit(SimEvent::ArtifactDecoded { target, flipit });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TICK_MS;
    use crate::settings::Settings;
    use crate::sim::state::{Asteroid, AsteroidSize};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn world_with_artifact(offset: Vec2) -> (WorldState, EntityId) {
        let mut world = WorldState::empty(17, Settings::default());
        let mut rng = Pcg32::seed_from_u64(17);
        let pos = world.player.body.pos + offset;
        let mut rock = Asteroid::new(40, AsteroidSize::Large, pos, Vec2::ZERO, &mut rng);
        rock.make_artifact(&mut rng);
        world.asteroids.push(rock);
        (world, 40)
    }

    fn step(world: &mut WorldState, engage: bool) {
        world.now_ms += TICK_MS;
        let (width, height, now) = (world.width, world.height, world.now_ms);
        for asteroid in &mut world.asteroids {
            asteroid.update(width, height, now);
        }
        update_tractor_beam(world, engage, TICK_MS);
    }

    #[test]
    fn test_idle_clears_target() {
        let mut beam = TractorBeamState::default();
        beam.engage(3, 0.2, 80.0, 0.0);
        assert_eq!(beam.target, Some(3));
        assert!(beam.active);
        assert_eq!(beam.set_phase(TractorPhase::Idle), Some((TractorPhase::Approaching, TractorPhase::Idle)));
        assert_eq!(beam.target, None);
        assert!(!beam.active);
        assert_eq!(beam.set_phase(TractorPhase::Idle), None);
    }

    #[test]
    fn test_engage_only_from_idle() {
        let mut beam = TractorBeamState::default();
        assert!(beam.engage(1, 0.1, 50.0, 0.0).is_some());
        assert!(beam.engage(2, 0.1, 50.0, 0.0).is_none());
        assert_eq!(beam.target, Some(1));
    }

    #[test]
    fn test_out_of_range_artifact_not_engaged() {
        let (mut world, _) = world_with_artifact(Vec2::new(TRACTOR_RANGE + 50.0, 0.0));
        step(&mut world, true);
        assert!(world.tractor.is_idle());
    }

    #[test]
    fn test_releasing_button_while_approaching_aborts() {
        let (mut world, _) = world_with_artifact(Vec2::new(200.0, 0.0));
        step(&mut world, true);
        assert_eq!(world.tractor.phase, TractorPhase::Approaching);
        step(&mut world, false);
        assert!(world.tractor.is_idle());
        assert_eq!(world.tractor.target, None);
    }

    #[test]
    fn test_full_sequence_decodes_once() {
        let (mut world, id) = world_with_artifact(Vec2::new(150.0, 0.0));
        let mut phases = vec![TractorPhase::Idle];

        for _ in 0..5_000 {
            step(&mut world, true);
            let phase = world.tractor.phase;
            if phases.last() != Some(&phase) {
                phases.push(phase);
            }
            if phase == TractorPhase::Idle && phases.len() > 1 {
                break;
            }
        }

        assert_eq!(
            phases,
            vec![
                TractorPhase::Idle,
                TractorPhase::Approaching,
                TractorPhase::Locking,
                TractorPhase::Attached,
                TractorPhase::Displaying,
                TractorPhase::Pushing,
                TractorPhase::Idle,
            ]
        );
        let artifact = world.asteroid(id).and_then(|a| a.artifact).unwrap();
        assert!(artifact.decoded());
        let decodes = world
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::ArtifactDecoded { .. }))
            .count();
        assert_eq!(decodes, 1);
        assert!(world.score >= SCORE_ARTIFACT_DECODE);

        // Decoded artifacts are not picked up again
        step(&mut world, true);
        assert!(world.tractor.is_idle());
    }

    #[test]
    fn test_pull_across_field_edge_locks() {
        let (mut world, id) = world_with_artifact(Vec2::ZERO);
        world.player.body.pos = Vec2::new(900.0, 360.0);
        if let Some(rock) = world.asteroid_mut(id) {
            rock.body.pos = Vec2::new(940.0, 360.0);
        }
        let mut phases = vec![TractorPhase::Idle];

        for _ in 0..600 {
            step(&mut world, true);
            let phase = world.tractor.phase;
            if phases.last() != Some(&phase) {
                phases.push(phase);
            }
            if phase == TractorPhase::Locking {
                break;
            }
        }

        // Orbit point sits past the right edge; the pull must follow the wrap
        assert!(world.tractor.orbit_point(world.player.body.pos).x > world.width);
        assert_eq!(
            phases,
            vec![TractorPhase::Idle, TractorPhase::Approaching, TractorPhase::Locking]
        );
        // Locked on the far side of the seam
        let rock = world.asteroid(id).unwrap();
        assert!(rock.body.pos.x < 60.0);
    }

    #[test]
    fn test_destroyed_target_releases_beam() {
        let (mut world, id) = world_with_artifact(Vec2::new(150.0, 0.0));
        step(&mut world, true);
        assert!(!world.tractor.is_idle());
        world.asteroids.retain(|a| a.id != id);
        step(&mut world, true);
        assert!(world.tractor.is_idle());
        assert!(!world.tractor.grid_scan.active);
    }

    #[test]
    fn test_paused_time_freezes_lock() {
        let (mut world, _) = world_with_artifact(Vec2::new(150.0, 0.0));
        world.tractor.engage(40, 0.2, 100.0, 0.0);
        world.tractor.set_phase(TractorPhase::Locking);
        update_tractor_beam(&mut world, true, 0.0);
        update_tractor_beam(&mut world, true, 0.0);
        assert_eq!(world.tractor.phase, TractorPhase::Locking);
        assert_eq!(world.tractor.phase_elapsed_ms, 0.0);
    }
}
