//! Off-screen stations
//!
//! Stations live on a finite grid of field-sized tiles rather than the
//! toroidal field. They drift slowly; crossing a tile edge steps the tile
//! coordinate. At the outer edge of the grid they stop and start counting
//! toward a despawn instead. A despawned station comes back after a delay
//! somewhere near the player's tile.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{EntityId, SimEvent, WorldState};
use crate::consts::*;
use crate::direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationKind {
    Refuel,
    Reward,
}

/// What a drift step did to a station's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationChange {
    Despawned,
    Respawned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: EntityId,
    pub kind: StationKind,
    pub tile_x: i32,
    pub tile_y: i32,
    /// Position inside the tile, `[0, width) x [0, height)`
    pub local: Vec2,
    /// Pixels per tick
    pub vel: Vec2,
    pub active: bool,
    /// When the current offscreen stretch began (ms)
    pub offscreen_since: Option<f64>,
    pub offscreen_elapsed_ms: f64,
    pub respawn_elapsed_ms: f64,
    /// Pinned against the outer edge of the tile grid this step
    pub at_boundary: bool,
    pub reward_claimed: bool,
}

impl Station {
    pub fn spawn(id: EntityId, kind: StationKind, width: f32, height: f32, rng: &mut impl Rng) -> Self {
        let mut station = Self {
            id,
            kind,
            tile_x: 0,
            tile_y: 0,
            local: Vec2::ZERO,
            vel: Vec2::ZERO,
            active: true,
            offscreen_since: None,
            offscreen_elapsed_ms: 0.0,
            respawn_elapsed_ms: 0.0,
            at_boundary: false,
            reward_claimed: false,
        };
        station.place_near((0, 0), width, height, rng);
        station
    }

    #[inline]
    pub fn tile(&self) -> (i32, i32) {
        (self.tile_x, self.tile_y)
    }

    /// Same tile as the view and not pinned at the grid edge
    pub fn is_visible(&self, current_tile: (i32, i32)) -> bool {
        self.active && self.tile() == current_tile && !self.at_boundary
    }

    /// Fresh placement on a tile adjacent to `around`, never `around` itself
    fn place_near(&mut self, around: (i32, i32), width: f32, height: f32, rng: &mut impl Rng) {
        let (dx, dy) = loop {
            let d = (rng.random_range(-1..=1), rng.random_range(-1..=1));
            if d != (0, 0) {
                break d;
            }
        };
        self.tile_x = (around.0 + dx).clamp(WORLD_MIN_TILE, WORLD_MAX_TILE);
        self.tile_y = (around.1 + dy).clamp(WORLD_MIN_TILE, WORLD_MAX_TILE);
        self.local = Vec2::new(rng.random_range(0.0..width), rng.random_range(0.0..height));
        self.vel = direction(rng.random_range(0.0..TAU)) * rng.random_range(0.1..=STATION_DRIFT_MAX);
        self.active = true;
        self.at_boundary = false;
        self.offscreen_since = None;
        self.offscreen_elapsed_ms = 0.0;
        self.respawn_elapsed_ms = 0.0;
        self.reward_claimed = false;
    }

    /// Move by `dt_ms` worth of drift, stepping tiles as edges are crossed
    pub fn drift(&mut self, dt_ms: f64, width: f32, height: f32) {
        let ticks = (dt_ms / TICK_MS) as f32;
        self.local += self.vel * ticks;
        let pinned_x = step_axis(&mut self.local.x, &mut self.tile_x, width);
        let pinned_y = step_axis(&mut self.local.y, &mut self.tile_y, height);
        self.at_boundary = pinned_x || pinned_y;
    }

    /// Retire the station until its respawn delay runs out
    pub fn despawn(&mut self) {
        self.active = false;
        self.offscreen_since = None;
        self.offscreen_elapsed_ms = 0.0;
        self.respawn_elapsed_ms = 0.0;
    }

    /// One tick of drift plus the despawn/respawn timers
    pub fn update(
        &mut self,
        dt_ms: f64,
        now_ms: f64,
        current_tile: (i32, i32),
        width: f32,
        height: f32,
        rng: &mut impl Rng,
    ) -> Option<StationChange> {
        if !self.active {
            self.respawn_elapsed_ms += dt_ms;
            if self.respawn_elapsed_ms >= STATION_RESPAWN_MS {
                self.place_near(current_tile, width, height, rng);
                return Some(StationChange::Respawned);
            }
            return None;
        }

        self.drift(dt_ms, width, height);

        let offscreen = self.tile() != current_tile || self.at_boundary;
        if !offscreen {
            self.offscreen_since = None;
            self.offscreen_elapsed_ms = 0.0;
            return None;
        }

        self.offscreen_since.get_or_insert(now_ms);
        self.offscreen_elapsed_ms += dt_ms;
        if self.offscreen_elapsed_ms >= STATION_DESPAWN_MS {
            self.despawn();
            return Some(StationChange::Despawned);
        }
        None
    }
}

/// Step one axis; returns true when pinned at the grid edge
fn step_axis(local: &mut f32, tile: &mut i32, extent: f32) -> bool {
    if !local.is_finite() {
        *local = 0.0;
        return false;
    }
    if *local < 0.0 {
        if *tile > WORLD_MIN_TILE {
            *tile -= 1;
            *local = rewrap(*local + extent, extent);
            return false;
        }
        *local = 0.0;
        return true;
    }
    if *local >= extent {
        if *tile < WORLD_MAX_TILE {
            *tile += 1;
            *local = rewrap(*local - extent, extent);
            return false;
        }
        *local = extent * (1.0 - f32::EPSILON);
        return true;
    }
    false
}

fn rewrap(v: f32, extent: f32) -> f32 {
    let wrapped = v.rem_euclid(extent);
    if wrapped >= extent { 0.0 } else { wrapped }
}

/// Drift every station and apply refuel/reward contact with the player
///
/// Stations are always placed on a tile next to the view, so contact only
/// happens once the host moves the view onto the station's tile with
/// [`WorldState::enter_tile`].
pub fn update_stations(world: &mut WorldState, dt_ms: f64) {
    let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
    let (width, height, now) = (world.width, world.height, world.now_ms);
    let current_tile = world.current_tile;

    let mut changes = Vec::new();
    {
        let WorldState { stations, rng, .. } = world;
        for station in stations.iter_mut() {
            if let Some(change) = station.update(dt, now, current_tile, width, height, rng) {
                changes.push((station.id, station.tile(), change));
            }
        }
    }
    for (id, tile, change) in changes {
        log::debug!("Station {} {:?} at {:?}", id, change, tile);
        world.emit(match change {
            StationChange::Despawned => SimEvent::StationDespawned { id, tile },
            StationChange::Respawned => SimEvent::StationRespawned { id, tile },
        });
    }

    if world.player.is_dead() {
        return;
    }
    let reach = STATION_RADIUS + world.player.body.radius;
    let player_pos = world.player.body.pos;
    let mut claimed = Vec::new();
    for station in world.stations.iter_mut() {
        if !station.is_visible(current_tile) || station.local.distance(player_pos) > reach {
            continue;
        }
        match station.kind {
            StationKind::Refuel => world.player.add_fuel(STATION_REFUEL_RATE),
            StationKind::Reward if !station.reward_claimed => {
                station.reward_claimed = true;
                world.player.add_missile_segments(STATION_REWARD_SEGMENTS);
                station.despawn();
                claimed.push(station.id);
            }
            StationKind::Reward => {}
        }
    }
    for id in claimed {
        log::info!("Station {} reward claimed", id);
        world.emit(SimEvent::StationRewardClaimed { id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn station(tile: (i32, i32), local: Vec2, vel: Vec2) -> Station {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut s = Station::spawn(1, StationKind::Refuel, FIELD_WIDTH, FIELD_HEIGHT, &mut rng);
        s.tile_x = tile.0;
        s.tile_y = tile.1;
        s.local = local;
        s.vel = vel;
        s
    }

    #[test]
    fn test_crossing_right_edge_steps_tile() {
        let mut s = station((0, 0), Vec2::new(FIELD_WIDTH - 0.1, 100.0), Vec2::new(0.3, 0.0));
        s.drift(TICK_MS, FIELD_WIDTH, FIELD_HEIGHT);
        assert_eq!(s.tile(), (1, 0));
        assert!(s.local.x >= 0.0 && s.local.x < FIELD_WIDTH);
        assert!((s.local.x - 0.2).abs() < 1e-2);
        assert!(!s.at_boundary);
    }

    #[test]
    fn test_crossing_top_edge_steps_tile_down() {
        let mut s = station((0, 0), Vec2::new(100.0, 0.1), Vec2::new(0.0, -0.3));
        s.drift(TICK_MS, FIELD_WIDTH, FIELD_HEIGHT);
        assert_eq!(s.tile(), (0, -1));
        assert!(s.local.y < FIELD_HEIGHT && s.local.y > FIELD_HEIGHT - 1.0);
    }

    #[test]
    fn test_grid_boundary_pins_instead_of_stepping() {
        let mut s = station((WORLD_MAX_TILE, 0), Vec2::new(FIELD_WIDTH - 0.1, 100.0), Vec2::new(0.3, 0.0));
        s.drift(TICK_MS, FIELD_WIDTH, FIELD_HEIGHT);
        assert_eq!(s.tile_x, WORLD_MAX_TILE);
        assert!(s.local.x < FIELD_WIDTH);
        assert!(s.at_boundary);

        let mut s = station((WORLD_MIN_TILE, 0), Vec2::new(0.1, 100.0), Vec2::new(-0.3, 0.0));
        s.drift(TICK_MS, FIELD_WIDTH, FIELD_HEIGHT);
        assert_eq!(s.tile_x, WORLD_MIN_TILE);
        assert_eq!(s.local.x, 0.0);
        assert!(s.at_boundary);
    }

    #[test]
    fn test_pinned_station_on_current_tile_still_despawns() {
        let mut rng = Pcg32::seed_from_u64(2);
        let tile = (WORLD_MAX_TILE, 0);
        let mut s = station(tile, Vec2::new(FIELD_WIDTH - 0.1, 100.0), Vec2::new(0.3, 0.0));
        let mut now = 0.0;
        let mut change = None;
        while change.is_none() && now < STATION_DESPAWN_MS + 1000.0 {
            now += TICK_MS;
            change = s.update(TICK_MS, now, tile, FIELD_WIDTH, FIELD_HEIGHT, &mut rng);
        }
        assert_eq!(change, Some(StationChange::Despawned));
        assert!(!s.active);
    }

    #[test]
    fn test_visible_station_resets_offscreen_timer() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut s = station((1, 0), Vec2::new(400.0, 300.0), Vec2::ZERO);
        s.update(1000.0, 1000.0, (0, 0), FIELD_WIDTH, FIELD_HEIGHT, &mut rng);
        assert_eq!(s.offscreen_since, Some(1000.0));
        s.update(1000.0, 2000.0, (1, 0), FIELD_WIDTH, FIELD_HEIGHT, &mut rng);
        assert_eq!(s.offscreen_since, None);
        assert_eq!(s.offscreen_elapsed_ms, 0.0);
    }

    #[test]
    fn test_respawn_after_delay_near_view() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut s = station((3, 3), Vec2::new(400.0, 300.0), Vec2::ZERO);
        s.despawn();
        assert_eq!(s.update(STATION_RESPAWN_MS - 1.0, 0.0, (0, 0), FIELD_WIDTH, FIELD_HEIGHT, &mut rng), None);
        assert_eq!(
            s.update(1.0, 0.0, (0, 0), FIELD_WIDTH, FIELD_HEIGHT, &mut rng),
            Some(StationChange::Respawned)
        );
        assert!(s.active);
        assert!((s.tile_x.abs() <= 1) && (s.tile_y.abs() <= 1));
        assert_ne!(s.tile(), (0, 0));
    }

    #[test]
    fn test_reward_station_pays_once() {
        let mut world = WorldState::empty(9, Settings::default());
        let mut rng = Pcg32::seed_from_u64(9);
        let mut reward = Station::spawn(77, StationKind::Reward, world.width, world.height, &mut rng);
        reward.tile_x = 0;
        reward.tile_y = 0;
        reward.vel = Vec2::ZERO;
        reward.local = world.player.body.pos;
        world.stations.push(reward);

        update_stations(&mut world, TICK_MS);
        assert_eq!(world.player.missile_segments, STATION_REWARD_SEGMENTS);
        assert!(!world.stations[0].active);
        assert!(world.events.contains(&SimEvent::StationRewardClaimed { id: 77 }));

        update_stations(&mut world, TICK_MS);
        assert_eq!(world.player.missile_segments, STATION_REWARD_SEGMENTS);
    }

    #[test]
    fn test_refuel_station_tops_up() {
        let mut world = WorldState::empty(9, Settings::default());
        let mut s = station((0, 0), world.player.body.pos, Vec2::ZERO);
        s.kind = StationKind::Refuel;
        world.stations.push(s);
        world.player.fuel = 50.0;
        update_stations(&mut world, TICK_MS);
        assert!((world.player.fuel - (50.0 + STATION_REFUEL_RATE)).abs() < 1e-5);
    }

    #[test]
    fn test_contact_needs_view_on_station_tile() {
        let mut world = WorldState::empty(9, Settings::default());
        let s = station((1, 0), world.player.body.pos, Vec2::ZERO);
        world.stations.push(s);
        world.player.fuel = 50.0;

        // Overlapping in local coordinates but one tile over
        update_stations(&mut world, TICK_MS);
        assert_eq!(world.player.fuel, 50.0);

        world.enter_tile(1, 0);
        update_stations(&mut world, TICK_MS);
        assert!(world.stations[0].active);
        assert!((world.player.fuel - (50.0 + STATION_REFUEL_RATE)).abs() < 1e-5);
    }
}
