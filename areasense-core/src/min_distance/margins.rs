//! Stability and cross-floor margins
//!
//! ## Stability margin
//!
//! ```text
//! σ²     = var(challenger) + var(incumbent)      (incumbent term dropped when stale)
//! margin = max(k(movement) · √σ², MARGIN_MIN_METERS)
//!
//! k: MOVING 1.0 < SETTLING 1.5 < STATIONARY 2.0
//! ```
//!
//! ## Beating the incumbent
//!
//! ```text
//! near field (both ≤ NEAR_FIELD_DISTANCE_M):  Δ ≥ margin
//! far field:                                  Δ/d_inc ≥ INCUMBENT_MARGIN_PERCENT  and  Δ ≥ margin
//! ```
//!
//! ## Cross-floor margin
//!
//! Percentage difference of the history averages must exceed
//!
//! ```text
//! m = BASE + WITNESS_STEP · min(witnesses(incumbent floor), CAP)
//!          + SKIP_STEP · (|Δlevel| − 1) + SANDWICH_BONUS · sandwiched
//! m = m · ESCAPE_FACTOR   when the incumbent floor has no witnesses and
//!                         the challenger floor has at least two
//! m = min(m, MAX_MARGIN)
//! ```

use alloc::collections::BTreeMap;

use crate::{
    constants::selection::{
        CROSS_FLOOR_BASE_MARGIN, CROSS_FLOOR_ESCAPE_FACTOR, CROSS_FLOOR_MAX_MARGIN,
        CROSS_FLOOR_SANDWICH_BONUS, CROSS_FLOOR_SKIP_STEP, CROSS_FLOOR_WITNESS_CAP,
        CROSS_FLOOR_WITNESS_STEP, INCUMBENT_MARGIN_PERCENT, MARGIN_MIN_METERS,
        NEAR_FIELD_DISTANCE_M, SIGMA_FACTOR_MOVING, SIGMA_FACTOR_SETTLING,
        SIGMA_FACTOR_STATIONARY,
    },
    model::{FloorId, MovementState},
};

use super::Contender;

/// Sigma multiplier for a movement state
pub fn sigma_factor(state: MovementState) -> f32 {
    match state {
        MovementState::Moving => SIGMA_FACTOR_MOVING,
        MovementState::Settling => SIGMA_FACTOR_SETTLING,
        MovementState::Stationary => SIGMA_FACTOR_STATIONARY,
    }
}

/// Variance-aware margin (m) a challenger must win by
pub fn stability_margin(state: MovementState, incumbent: &Contender, challenger: &Contender) -> f32 {
    let mut variance = challenger.variance.unwrap_or(0.0).max(0.0);
    if !incumbent.stale {
        variance += incumbent.variance.unwrap_or(0.0).max(0.0);
    }
    (sigma_factor(state) * libm::sqrtf(variance)).max(MARGIN_MIN_METERS)
}

/// Challenger distance beats the incumbent's by the margin
pub fn beats_by_distance(incumbent: f32, challenger: f32, margin: f32) -> bool {
    let improvement = incumbent - challenger;
    if !(improvement > 0.0) {
        return false;
    }
    if incumbent <= NEAR_FIELD_DISTANCE_M && challenger <= NEAR_FIELD_DISTANCE_M {
        return improvement >= margin;
    }
    improvement / incumbent >= INCUMBENT_MARGIN_PERCENT && improvement >= margin
}

/// `|a − b| / mean(a, b)`, zero when both are zero
pub fn percentage_difference(a: f32, b: f32) -> f32 {
    let mean = (a + b) / 2.0;
    if mean <= 0.0 {
        return 0.0;
    }
    libm::fabsf(a - b) / mean
}

/// Per-floor view of the scanners currently hearing a device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorWitnesses {
    counts: BTreeMap<FloorId, usize>,
    levels: BTreeMap<FloorId, i32>,
}

impl FloorWitnesses {
    /// No witnesses
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one scanner on `floor_id`
    pub fn add(&mut self, floor_id: &str, level: Option<i32>) {
        *self.counts.entry(FloorId::from(floor_id)).or_insert(0) += 1;
        if let Some(level) = level {
            self.levels.insert(FloorId::from(floor_id), level);
        }
    }

    /// Witnesses on `floor_id`
    pub fn count(&self, floor_id: &str) -> usize {
        self.counts.get(floor_id).copied().unwrap_or(0)
    }

    /// Floor at `level` has witnesses both above and below it
    pub fn is_sandwiched(&self, level: i32) -> bool {
        let above = self.levels.values().any(|l| *l > level);
        let below = self.levels.values().any(|l| *l < level);
        above && below
    }
}

/// Percentage-difference margin for a cross-floor switch
pub fn cross_floor_margin(
    incumbent: &Contender,
    challenger: &Contender,
    witnesses: &FloorWitnesses,
) -> f32 {
    let incumbent_witnesses = incumbent
        .floor_id
        .as_deref()
        .map_or(0, |floor| witnesses.count(floor));
    let challenger_witnesses = challenger
        .floor_id
        .as_deref()
        .map_or(0, |floor| witnesses.count(floor));

    let mut margin = CROSS_FLOOR_BASE_MARGIN
        + CROSS_FLOOR_WITNESS_STEP * incumbent_witnesses.min(CROSS_FLOOR_WITNESS_CAP) as f32;

    if let (Some(a), Some(b)) = (incumbent.floor_level, challenger.floor_level) {
        let skipped = (a - b).unsigned_abs().saturating_sub(1);
        margin += CROSS_FLOOR_SKIP_STEP * skipped as f32;
        if witnesses.is_sandwiched(a) {
            margin += CROSS_FLOOR_SANDWICH_BONUS;
        }
    }

    if incumbent_witnesses == 0 && challenger_witnesses >= 2 {
        margin *= CROSS_FLOOR_ESCAPE_FACTOR;
    }
    margin.min(CROSS_FLOOR_MAX_MARGIN)
}
