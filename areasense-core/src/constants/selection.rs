//! Min-Distance Selection Constants
//!
//! Margins for the incumbent-vs-challenger tournament, cross-floor
//! protection and streak hysteresis.

// ===== RADIUS & STREAKS =====

/// Default maximum detection radius (m).
pub const DEFAULT_MAX_AREA_RADIUS_M: f32 = 20.0;

/// Consecutive cycles (with new data) before a same-floor switch commits.
pub const SAME_FLOOR_STREAK_TARGET: u32 = 4;

/// Consecutive cycles (with new data) before a cross-floor switch commits.
pub const CROSS_FLOOR_STREAK_TARGET: u32 = 6;

/// Confidence gap that doubles the streak for a weaker challenger.
pub const LOW_CONFIDENCE_STREAK_GAP: f32 = 0.2;

// ===== STABILITY MARGIN =====

/// Relative improvement required in the far field (8%).
pub const INCUMBENT_MARGIN_PERCENT: f32 = 0.08;

/// Absolute floor for the stability margin (m).
pub const MARGIN_MIN_METERS: f32 = 0.2;

/// Both adverts within this distance (m) are compared in the near field.
pub const NEAR_FIELD_DISTANCE_M: f32 = 1.5;

/// Sigma multiplier while MOVING.
pub const SIGMA_FACTOR_MOVING: f32 = 1.0;

/// Sigma multiplier while SETTLING.
pub const SIGMA_FACTOR_SETTLING: f32 = 1.5;

/// Sigma multiplier while STATIONARY.
pub const SIGMA_FACTOR_STATIONARY: f32 = 2.0;

// ===== RSSI PRIORITY =====

/// Raw RSSI advantage (dB) that lets a slightly farther challenger win.
pub const RSSI_PRIORITY_ADVANTAGE_DB: f32 = 8.0;

/// How much farther (relative) the RSSI-favoured challenger may be.
pub const RSSI_PRIORITY_DISTANCE_TOLERANCE: f32 = 0.15;

/// Incumbent RSSI advantage (dB) that blocks a distance-only win.
pub const RSSI_VETO_DB: f32 = 10.0;

/// Weakest RSSI (dBm) accepted by the RSSI-only fallback.
pub const RSSI_FALLBACK_MIN_DBM: f32 = -90.0;

// ===== CROSS-FLOOR PROTECTION =====

/// History samples both sides need before a cross-floor switch.
pub const CROSS_FLOOR_MIN_HISTORY: usize = 8;

/// Base relative-distance margin for a cross-floor switch (25%).
pub const CROSS_FLOOR_BASE_MARGIN: f32 = 0.25;

/// Margin added per scanner on the incumbent floor that still sees the device.
pub const CROSS_FLOOR_WITNESS_STEP: f32 = 0.05;

/// Witnesses counted at most.
pub const CROSS_FLOOR_WITNESS_CAP: usize = 4;

/// Margin added per extra floor level skipped.
pub const CROSS_FLOOR_SKIP_STEP: f32 = 0.15;

/// Margin added when the incumbent floor sits between two witnessing floors.
pub const CROSS_FLOOR_SANDWICH_BONUS: f32 = 0.15;

/// Margin multiplier when only the challenger's floor has witnesses.
pub const CROSS_FLOOR_ESCAPE_FACTOR: f32 = 0.5;

/// Upper bound on the cross-floor margin.
pub const CROSS_FLOOR_MAX_MARGIN: f32 = 0.8;

// ===== SOFT INCUMBENT RESCUE =====

/// Absolute-profile confidence with which a soft incumbent vetoes replacement.
pub const RESCUE_MIN_CONFIDENCE: f32 = 0.6;

/// Confidence assigned to a min-distance winner with no learned profile,
/// before scaling by distance.
pub const MIN_DISTANCE_BASE_CONFIDENCE: f32 = 1.0;
