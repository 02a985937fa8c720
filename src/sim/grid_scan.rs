//! Grid-scan mini-game
//!
//! While the tractor beam holds an artifact, a square grid laid over it is
//! revealed cell by cell in a seeded random order. Once every cell is
//! revealed the grid retracts for a fixed window and the scan goes inactive.
//!
//! All timing runs on accumulated `dt_ms`, so freezing the outer loop
//! freezes the scan as well.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::state::EntityId;
use crate::consts::{GRID_RETRACT_MS, GRID_SCAN_RADIUS_FACTOR};

/// Lowest reveal rate accepted; anything below would never finish
const MIN_REVEAL_RATE: f32 = 1.0;

/// Cells per side for a scan radius (6 / 8 / 10 / 12)
pub fn grid_dims_for_radius(radius: f32) -> u32 {
    if radius < 26.0 {
        6
    } else if radius < 40.0 {
        8
    } else if radius < 60.0 {
        10
    } else {
        12
    }
}

/// Scan footprint of an asteroid; the crater rim is left out of the grid
#[inline]
pub fn scan_radius(target_radius: f32) -> f32 {
    target_radius * GRID_SCAN_RADIUS_FACTOR
}

/// Seed mixing the scan start time with the target identity
pub fn scan_seed(now_ms: f64, target: EntityId) -> u64 {
    // splitmix64 finalizer
    let mut z = now_ms.to_bits() ^ (target as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Reveal state for one scan
#[derive(Debug, Clone, Serialize)]
pub struct GridScanState {
    pub active: bool,
    pub cols: u32,
    pub rows: u32,
    /// Row-major, `cols * rows` long. Cells only ever flip to true.
    pub revealed: Vec<bool>,
    pub revealed_count: usize,
    /// Cells per second
    pub reveal_rate: f32,
    pub elapsed_ms: f64,
    pub complete: bool,
    pub retracting: bool,
    pub retract_elapsed_ms: f64,
    pub seed: u64,
    #[serde(skip)]
    rng: Pcg32,
}

impl Default for GridScanState {
    fn default() -> Self {
        Self {
            active: false,
            cols: 0,
            rows: 0,
            revealed: Vec::new(),
            revealed_count: 0,
            reveal_rate: MIN_REVEAL_RATE,
            elapsed_ms: 0.0,
            complete: false,
            retracting: false,
            retract_elapsed_ms: 0.0,
            seed: 0,
            rng: Pcg32::seed_from_u64(0),
        }
    }
}

impl GridScanState {
    /// Begin a fresh scan over a target
    ///
    /// Any previous scan is discarded. Two scans of the same target started
    /// at the same `now_ms` reveal cells in the same order.
    pub fn start(&mut self, target_radius: f32, target: EntityId, now_ms: f64, reveal_rate: f32) {
        let side = grid_dims_for_radius(scan_radius(target_radius));
        let cells = (side * side) as usize;
        let seed = scan_seed(now_ms, target);

        *self = Self {
            active: true,
            cols: side,
            rows: side,
            revealed: vec![false; cells],
            revealed_count: 0,
            reveal_rate: if reveal_rate.is_finite() {
                reveal_rate.max(MIN_REVEAL_RATE)
            } else {
                MIN_REVEAL_RATE
            },
            elapsed_ms: 0.0,
            complete: false,
            retracting: false,
            retract_elapsed_ms: 0.0,
            seed,
            rng: Pcg32::seed_from_u64(seed),
        };
        log::debug!("Grid scan started: {}x{} on target {}", side, side, target);
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.revealed.len()
    }

    pub fn is_revealed(&self, col: u32, row: u32) -> bool {
        if col >= self.cols || row >= self.rows {
            return false;
        }
        self.revealed[(row * self.cols + col) as usize]
    }

    /// Fraction of cells revealed, 0..=1
    pub fn progress(&self) -> f32 {
        if self.revealed.is_empty() {
            return 0.0;
        }
        self.revealed_count as f32 / self.revealed.len() as f32
    }

    /// Advance the scan by `dt_ms`
    ///
    /// Cells due so far follow `floor(rate * elapsed)`; the first advance
    /// always reveals at least one cell so the grid visibly starts. The
    /// budget is cumulative over the whole scan rather than a per-call
    /// `max(1, floor(rate * dt))`, so short frames never push the reveal
    /// above `rate`. Returns true on the call that reveals the last cell.
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        if !self.active {
            return false;
        }
        let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };

        if self.retracting {
            self.retract_elapsed_ms += dt;
            if self.retract_elapsed_ms >= GRID_RETRACT_MS {
                self.retracting = false;
                self.active = false;
            }
            return false;
        }
        if self.complete {
            return false;
        }

        self.elapsed_ms += dt;
        let total = self.revealed.len();
        let due = (self.reveal_rate as f64 * self.elapsed_ms / 1000.0).floor() as usize;
        let mut budget = due.saturating_sub(self.revealed_count);
        if budget == 0 && self.revealed_count == 0 && dt > 0.0 {
            budget = 1;
        }

        for _ in 0..budget {
            if self.revealed_count >= total {
                break;
            }
            // Walk from a random cell to the next unrevealed one
            let mut idx = self.rng.random_range(0..total);
            while self.revealed[idx] {
                idx = (idx + 1) % total;
            }
            self.revealed[idx] = true;
            self.revealed_count += 1;
        }

        if total > 0 && self.revealed_count == total {
            self.complete = true;
            self.retracting = true;
            self.retract_elapsed_ms = 0.0;
            return true;
        }
        false
    }

    /// Drop the scan immediately (beam released early)
    pub fn cancel(&mut self) {
        self.active = false;
        self.retracting = false;
    }
}
