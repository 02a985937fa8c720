//! World state and core simulation types
//!
//! Every subsystem reads and writes the single [`WorldState`] handed to it;
//! nothing keeps a private copy between ticks.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::KineticBody;
use super::station::Station;
use super::tractor::{TractorBeamState, TractorPhase};
use crate::consts::*;
use crate::settings::Settings;

/// Stable identity for asteroids, ships, missiles, bonuses and stations
pub type EntityId = u32;

/// Monotonic id source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIds {
    next: EntityId,
}

impl Default for EntityIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIds {
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Dash directions relative to the craft's facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DashKind {
    #[default]
    Forward,
    Reverse,
    StrafeLeft,
    StrafeRight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashState {
    pub active: bool,
    /// Ticks left in the current dash
    pub remaining: u32,
    /// Ticks until another dash is allowed
    pub cooldown: u32,
    pub dir: Vec2,
    pub kind: DashKind,
}

/// The player's craft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub body: KineticBody,
    pub health: f32,
    pub max_health: f32,
    pub fuel: f32,
    pub max_fuel: f32,
    pub shield_timer: u32,
    pub invuln_timer: u32,
    /// Double-shooter stacks; cleared when the upgrade timer runs out
    pub upgrade_stacks: u32,
    pub upgrade_timer: u32,
    /// Missile ammo, `MISSILE_SEGMENTS_PER_MISSILE` segments per missile
    pub missile_segments: u32,
    pub fire_cooldown: u32,
    pub missile_cooldown: u32,
    pub dash: DashState,
    pub controls_reversed: bool,
    /// Thrust applied this tick (for the renderer's flame)
    pub thrusting: bool,
}

/// Asteroid size classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AsteroidSize {
    Large,
    Medium,
    Small,
}

impl AsteroidSize {
    pub fn radius(self) -> f32 {
        match self {
            AsteroidSize::Large => ASTEROID_RADIUS_LARGE,
            AsteroidSize::Medium => ASTEROID_RADIUS_MEDIUM,
            AsteroidSize::Small => ASTEROID_RADIUS_SMALL,
        }
    }

    pub fn base_health(self) -> f32 {
        match self {
            AsteroidSize::Large => 3.0,
            AsteroidSize::Medium => 2.0,
            AsteroidSize::Small => 1.0,
        }
    }

    /// Next tier down, `None` for small
    pub fn smaller(self) -> Option<Self> {
        match self {
            AsteroidSize::Large => Some(AsteroidSize::Medium),
            AsteroidSize::Medium => Some(AsteroidSize::Small),
            AsteroidSize::Small => None,
        }
    }

    pub fn score(self) -> u64 {
        match self {
            AsteroidSize::Large => SCORE_LARGE_ASTEROID,
            AsteroidSize::Medium => SCORE_MEDIUM_ASTEROID,
            AsteroidSize::Small => SCORE_SMALL_ASTEROID,
        }
    }
}

/// Reward and look of the stage's special asteroid
///
/// Rolled once at stage generation. Fields are private so nothing can
/// re-roll them afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    flipit_chance: f32,
    scale: f32,
    pattern: u8,
    /// Hue in degrees
    tint: f32,
    decoded: bool,
}

impl Artifact {
    pub fn roll(rng: &mut impl Rng) -> Self {
        Self {
            flipit_chance: rng.random_range(FLIPIT_CHANCE_MIN..=FLIPIT_CHANCE_MAX),
            scale: rng.random_range(ARTIFACT_SCALE_MIN..=ARTIFACT_SCALE_MAX),
            pattern: rng.random_range(0..ARTIFACT_PATTERN_COUNT),
            tint: rng.random_range(0.0..360.0),
            decoded: false,
        }
    }

    pub fn flipit_chance(&self) -> f32 {
        self.flipit_chance
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pattern(&self) -> u8 {
        self.pattern
    }

    pub fn tint(&self) -> f32 {
        self.tint
    }

    /// Already scanned by the tractor beam
    pub fn decoded(&self) -> bool {
        self.decoded
    }

    pub(crate) fn mark_decoded(&mut self) {
        self.decoded = true;
    }
}

/// A destructible asteroid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asteroid {
    pub id: EntityId,
    pub body: KineticBody,
    pub size: AsteroidSize,
    pub mass: f32,
    pub health: f32,
    pub max_health: f32,
    /// Radians per tick
    pub rotation_speed: f32,
    /// Seed the renderer uses for outline and craters
    pub shape_seed: u32,
    pub artifact: Option<Artifact>,
}

impl Asteroid {
    #[inline]
    pub fn is_artifact(&self) -> bool {
        self.artifact.is_some()
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }
}

/// Steering scratch for alien ships
///
/// No behaviour enum on purpose: patrol, orbit and roam all emerge from
/// these few timers and biases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Steering {
    pub initialized: bool,
    /// -1 or +1, which side of the player the ship circles
    pub side_bias: f32,
    pub rethink_timer: u32,
    pub waypoint: Option<Vec2>,
    pub waypoint_timer: u32,
}

/// Combat ship data, including the doom countdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatExt {
    /// Faster doom sequence, launches a missile when it completes
    pub missile_type: bool,
    /// Ticks until the doom sequence starts
    pub doom_countdown: u32,
    /// 0 = not dooming, 1..=DOOM_STAGES while dooming
    pub doom_stage: u8,
    pub doom_stage_timer: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScienceMode {
    Approaching,
    Patrolling,
    Docking,
}

/// Science vessel data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScienceExt {
    pub mode: ScienceMode,
    pub target: Option<EntityId>,
    /// 0..=100
    pub docking_progress: f32,
    pub patrol_timer: u32,
}

/// Capability tag for an alien ship
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlienRole {
    Combat(CombatExt),
    Science(ScienceExt),
}

/// A hostile (or merely curious) ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlienShip {
    pub id: EntityId,
    pub body: KineticBody,
    pub health: f32,
    pub max_health: f32,
    /// Thrust multiplier
    pub speed: f32,
    /// Ticks between shots at difficulty 1.0
    pub fire_rate: f32,
    pub fire_cooldown: u32,
    pub difficulty: f32,
    pub steering: Steering,
    /// Reduces agility while > 0
    pub knocked_timer: u32,
    pub role: AlienRole,
}

impl AlienShip {
    pub fn combat(&self) -> Option<&CombatExt> {
        match &self.role {
            AlienRole::Combat(c) => Some(c),
            AlienRole::Science(_) => None,
        }
    }

    pub fn science(&self) -> Option<&ScienceExt> {
        match &self.role {
            AlienRole::Science(s) => Some(s),
            AlienRole::Combat(_) => None,
        }
    }

    pub fn is_science(&self) -> bool {
        matches!(self.role, AlienRole::Science(_))
    }

    pub fn is_missile_type(&self) -> bool {
        matches!(self.role, AlienRole::Combat(CombatExt { missile_type: true, .. }))
    }

    /// Doom stage for the renderer, 0 when not dooming
    pub fn doom_stage(&self) -> u8 {
        self.combat().map(|c| c.doom_stage).unwrap_or(0)
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }
}

/// Who fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Alien,
}

/// A straight-flying shot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub body: KineticBody,
    pub life: u32,
    pub max_life: u32,
    pub owner: Owner,
    pub damage: f32,
}

impl Bullet {
    pub fn expired(&self) -> bool {
        self.life >= self.max_life
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissilePhase {
    /// Fixed warm-up, flies along its launch heading
    Straight,
    Homing,
}

/// What a missile is chasing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissileTarget {
    Asteroid(EntityId),
    Alien(EntityId),
    Player,
}

/// A homing missile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Missile {
    pub id: EntityId,
    pub body: KineticBody,
    pub life: u32,
    pub max_life: u32,
    pub owner: Owner,
    pub homing: bool,
    /// Max heading change per tick (radians)
    pub turn_rate: f32,
    pub damage_multiplier: f32,
    pub explosion_radius: f32,
    pub locked: bool,
    pub lost_frames: u32,
    pub target: Option<MissileTarget>,
    pub phase: MissilePhase,
    /// Set on impact; the tick resolves the blast and removes it
    #[serde(default)]
    pub detonated: bool,
}

impl Missile {
    pub fn expired(&self) -> bool {
        self.life >= self.max_life
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusKind {
    Shield,
    Heal,
    DoubleShooter,
    Missile,
}

/// A pickup drifting off the field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bonus {
    pub id: EntityId,
    pub body: KineticBody,
    pub kind: BonusKind,
    pub life: u32,
    pub max_life: u32,
    /// Rolled at creation for heal bonuses
    pub heal_amount: Option<f32>,
}

/// Notifications for audio/rendering hosts, drained each tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    StageStarted { stage: u32, artifact: bool },
    StageCleared { stage: u32 },
    AsteroidDestroyed { id: EntityId, size: AsteroidSize, pos: Vec2, artifact: bool },
    AsteroidFragmented { parent: EntityId, fragments: Vec<EntityId> },
    AlienSpawned { id: EntityId },
    AlienDestroyed { id: EntityId, pos: Vec2 },
    AlienDoomed { id: EntityId, pos: Vec2 },
    ScienceVesselDeparted { id: EntityId },
    BulletFired { owner: Owner },
    MissileLaunched { id: EntityId, owner: Owner },
    MissileExploded { id: EntityId, pos: Vec2 },
    PlayerHit { damage: f32 },
    PlayerDestroyed { lives_left: u32 },
    GameOver,
    BonusSpawned { id: EntityId, kind: BonusKind },
    BonusCollected { kind: BonusKind },
    TractorPhaseChanged { from: TractorPhase, to: TractorPhase },
    GridScanComplete { target: EntityId },
    ArtifactDecoded { target: EntityId, flipit: bool },
    StationDespawned { id: EntityId, tile: (i32, i32) },
    StationRespawned { id: EntityId, tile: (i32, i32) },
    StationRewardClaimed { id: EntityId },
}

/// Complete simulation state
#[derive(Debug, Clone, Serialize)]
pub struct WorldState {
    /// Run seed for reproducibility
    pub seed: u64,
    #[serde(skip_serializing)]
    pub rng: Pcg32,
    pub settings: Settings,
    pub width: f32,
    pub height: f32,
    /// Last `now` handed to the tick (ms)
    pub now_ms: f64,
    pub time_ticks: u64,
    pub stage: u32,
    pub lives: u32,
    pub score: u64,
    pub flipits: u32,
    pub paused: bool,
    pub game_over: bool,
    /// Tile the player's view is on; stations on other tiles are offscreen
    pub current_tile: (i32, i32),
    pub player: Player,
    pub asteroids: Vec<Asteroid>,
    pub aliens: Vec<AlienShip>,
    pub bullets: Vec<Bullet>,
    pub missiles: Vec<Missile>,
    pub bonuses: Vec<Bonus>,
    pub stations: Vec<Station>,
    pub tractor: TractorBeamState,
    pub alien_spawn_timer: u32,
    #[serde(skip_serializing)]
    pub events: Vec<SimEvent>,
    pub ids: EntityIds,
}

impl WorldState {
    /// Create a world with the given seed and settings, stage generated
    pub fn new(seed: u64, settings: Settings) -> Self {
        let settings = settings.sanitized();
        let mut world = Self::empty(seed, settings);
        world.stage = world.settings.starting_stage;
        world.spawn_stations();
        super::asteroid::generate_stage(&mut world);
        world
    }

    /// A world with a player and nothing else; handy for fixtures
    pub fn empty(seed: u64, settings: Settings) -> Self {
        let width = FIELD_WIDTH;
        let height = FIELD_HEIGHT;
        let mut player = Player::spawn(Vec2::new(width / 2.0, height / 2.0));
        player.controls_reversed = settings.reversed_controls;
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            lives: settings.starting_lives,
            alien_spawn_timer: settings.difficulty.alien_spawn_interval_ticks(),
            settings,
            width,
            height,
            now_ms: 0.0,
            time_ticks: 0,
            stage: 1,
            score: 0,
            flipits: 0,
            paused: false,
            game_over: false,
            current_tile: (0, 0),
            player,
            asteroids: Vec::new(),
            aliens: Vec::new(),
            bullets: Vec::new(),
            missiles: Vec::new(),
            bonuses: Vec::new(),
            stations: Vec::new(),
            tractor: TractorBeamState::default(),
            events: Vec::new(),
            ids: EntityIds::default(),
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        self.ids.next_id()
    }

    pub fn emit(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Hand the host this tick's events
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn asteroid(&self, id: EntityId) -> Option<&Asteroid> {
        self.asteroids.iter().find(|a| a.id == id)
    }

    pub fn asteroid_mut(&mut self, id: EntityId) -> Option<&mut Asteroid> {
        self.asteroids.iter_mut().find(|a| a.id == id)
    }

    /// Move the view to another tile, clamped to the world grid
    pub fn enter_tile(&mut self, tile_x: i32, tile_y: i32) {
        self.current_tile = (
            tile_x.clamp(WORLD_MIN_TILE, WORLD_MAX_TILE),
            tile_y.clamp(WORLD_MIN_TILE, WORLD_MAX_TILE),
        );
    }

    fn spawn_stations(&mut self) {
        use super::station::StationKind;
        for kind in [StationKind::Refuel, StationKind::Reward] {
            let id = self.next_entity_id();
            let station = Station::spawn(id, kind, self.width, self.height, &mut self.rng);
            self.stations.push(station);
        }
    }

    /// Ensure entity lists are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.asteroids.sort_by_key(|a| a.id);
        self.aliens.sort_by_key(|a| a.id);
        self.missiles.sort_by_key(|m| m.id);
        self.bonuses.sort_by_key(|b| b.id);
    }
}
