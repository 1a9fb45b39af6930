//! UKF Fingerprint Constants

// ===== FILTER =====

/// Random-walk process noise (dB² per second).
pub const UKF_PROCESS_NOISE: f32 = 1.0;

/// Measurement noise per scanner reading (dB²), σ = 4 dB.
pub const UKF_MEASUREMENT_NOISE: f32 = 16.0;

/// Variance assigned to a scanner when it first enters the state (dB²).
pub const UKF_INITIAL_VARIANCE: f32 = 25.0;

/// Diagonal floor for the state covariance (dB²).
pub const UKF_MIN_VARIANCE: f32 = 0.5;

/// Ceiling on the state covariance diagonal (dB²).
///
/// A scanner unseen for minutes otherwise grows without bound before it is
/// pruned.
pub const UKF_MAX_VARIANCE: f32 = 400.0;

/// Scanners not observed for this long are dropped from the state.
pub const UKF_STALE_AFTER_S: f64 = 60.0;

/// Sigma point spread.
///
/// 1.0 keeps all weights non-negative except the centre covariance weight,
/// which stays stable in single precision for tens of dimensions.
pub const UKF_ALPHA: f32 = 1.0;

/// Prior distribution knowledge (2 is optimal for Gaussians).
pub const UKF_BETA: f32 = 2.0;

/// Secondary scaling parameter.
pub const UKF_KAPPA: f32 = 0.0;

// ===== MATCHING =====

/// Visible scanners needed for a normal UKF decision.
pub const UKF_MIN_SCANNERS: usize = 2;

/// Score needed to switch to a different area.
pub const UKF_MIN_MATCH_SCORE: f32 = 0.30;

/// Score needed to stay in the current area.
pub const UKF_RETENTION_THRESHOLD: f32 = 0.15;

/// Bonus added to the current area's score before comparing candidates.
pub const UKF_STICKINESS_BONUS: f32 = 0.15;

/// Squared-distance contribution of a trained scanner that is not visible.
pub const UKF_MISSING_SCANNER_D2: f32 = 4.0;

/// Score scale lost when every trained scanner of an area is offline.
pub const UKF_OFFLINE_PENALTY_WEIGHT: f32 = 0.5;

/// Lone-scanner retention window, in standard deviations.
pub const UKF_RETENTION_SIGMA: f32 = 2.5;

// ===== SANITY CHECKS =====

/// Matches at or above this score skip the RSSI sanity check.
pub const UKF_HIGH_CONFIDENCE_SCORE: f32 = 0.70;

/// Signal deficit (dB) of the winning area that a low-confidence match may not exceed.
pub const UKF_RSSI_SANITY_DB: f32 = 10.0;

/// Physical scanner closer than this (m) can veto a UKF pick in another area.
pub const UKF_PROXIMITY_VETO_M: f32 = 1.0;

/// Score required to override a same-floor proximity veto.
pub const UKF_PROXIMITY_OVERRIDE_SCORE: f32 = 0.80;

// ===== VIRTUAL DISTANCE =====

/// Fraction of the max radius a zero-score scannerless room would sit at.
pub const VIRTUAL_DISTANCE_SCALE: f32 = 0.7;

/// Scores below this clamp to it before the virtual distance is computed.
pub const VIRTUAL_DISTANCE_MIN_SCORE: f32 = 0.05;
