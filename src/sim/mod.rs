//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Host-supplied clock only (`now_ms`, `dt_ms`)
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod alien;
pub mod asteroid;
pub mod body;
pub mod bonus;
pub mod collision;
pub mod grid_scan;
pub mod player;
pub mod projectile;
pub mod state;
pub mod station;
pub mod tick;
pub mod tractor;
pub mod velocity_cap;

pub use alien::{AlienKind, DoomStep};
pub use body::KineticBody;
pub use collision::resolve_elastic;
pub use grid_scan::GridScanState;
pub use state::{
    AlienShip, Artifact, Asteroid, AsteroidSize, Bonus, BonusKind, Bullet, DashKind, EntityId,
    Missile, Owner, Player, SimEvent, WorldState,
};
pub use station::{Station, StationKind};
pub use tick::{TickInput, tick};
pub use tractor::{TractorBeamState, TractorPhase};
pub use velocity_cap::{CapConfig, SpeedClass};
