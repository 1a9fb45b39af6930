//! Correlation Learning Constants
//!
//! Parameters for the per-scanner Kalman estimators inside area and room
//! profiles, and for the quality gate that decides whether a confirmed
//! observation may train them.

// ===== ESTIMATOR NOISE =====

/// Process noise for RSSI-delta estimators (dB² per accepted sample).
///
/// Small: the layout of a room relative to its scanners changes slowly.
pub const PAIR_PROCESS_NOISE: f32 = 0.05;

/// Measurement noise for RSSI-delta estimators (dB²).
///
/// Source: typical BLE RSSI jitter of 3 dB per scanner, doubled for a
/// difference of two readings.
pub const PAIR_MEASUREMENT_NOISE: f32 = 18.0;

/// Process noise for absolute RSSI estimators (dB² per accepted sample).
pub const ABSOLUTE_PROCESS_NOISE: f32 = 0.05;

/// Measurement noise for absolute RSSI estimators (dB²).
pub const ABSOLUTE_MEASUREMENT_NOISE: f32 = 9.0;

/// Spread assumed for a freshly created estimator (dB²), σ = 4 dB.
pub const INITIAL_SPREAD: f32 = 16.0;

/// Smoothing factor for the observed spread (EMA of squared residuals).
pub const SPREAD_SMOOTHING: f32 = 0.1;

/// Variance floor (dB²) for both estimator variance and observed spread.
///
/// Without it a long stationary run sharpens σ towards zero and every later
/// reading becomes a many-sigma outlier.
pub const MIN_VARIANCE: f32 = 2.0;

// ===== PROVENANCE =====

/// Minimum share of authority a button-trained value keeps over auto data.
///
/// Auto-learned samples can polish a user-trained fingerprint but never
/// outweigh it by more than 30%.
pub const BUTTON_MIN_AUTHORITY: f32 = 0.7;

/// Samples needed before an estimator takes part in matching.
pub const PROFILE_MIN_SAMPLES: u32 = 5;

// ===== AUTO-LEARNING GATE =====

/// Minimum decision confidence for an auto-learning sample.
pub const AUTO_LEARNING_MIN_CONFIDENCE: f32 = 0.5;

/// Minimum time between two accepted samples for the same device.
pub const AUTO_LEARNING_MIN_INTERVAL_S: f64 = 5.0;

/// Maximum device velocity (m/s) for learning.
pub const AUTO_LEARNING_MAX_VELOCITY: f32 = 1.0;

/// Maximum mean RSSI-filter variance (dB²) across the device's adverts.
pub const AUTO_LEARNING_MAX_RSSI_VARIANCE: f32 = 25.0;

/// Another area matching at least this well can make a sample ambiguous.
pub const AMBIGUITY_MIN_CONFIDENCE: f32 = 0.5;

/// Another area within this confidence of the target makes a sample ambiguous.
pub const AMBIGUITY_MARGIN: f32 = 0.1;
