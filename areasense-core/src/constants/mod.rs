//! Tunable constants for the area selection engine
//!
//! Every threshold the decision paths use is named here with its unit and
//! the behaviour it controls. Values that users are expected to change per
//! installation (radius, streak targets, offline timeout) are defaults for
//! [`SelectionConfig`](crate::config::SelectionConfig); the rest are fixed.
//!
//! ## Organization
//!
//! - **Timing**: movement windows, scanner online/offline, evidence ages
//! - **Learning**: correlation filters and the auto-learning quality gate
//! - **UKF**: fingerprint fusion and its sanity checks
//! - **Selection**: min-distance margins, cross-floor protection, streaks

/// Movement windows, scanner liveness and evidence ages.
pub mod timing;

/// Correlation profile filters and auto-learning gate thresholds.
pub mod learning;

/// Unscented Kalman filter and fingerprint matching parameters.
pub mod ukf;

/// Min-distance tournament, cross-floor protection and hysteresis.
pub mod selection;

pub use learning::{
    AUTO_LEARNING_MIN_CONFIDENCE, AUTO_LEARNING_MIN_INTERVAL_S, BUTTON_MIN_AUTHORITY,
    PROFILE_MIN_SAMPLES,
};
pub use selection::{
    CROSS_FLOOR_MIN_HISTORY, CROSS_FLOOR_STREAK_TARGET, DEFAULT_MAX_AREA_RADIUS_M,
    SAME_FLOOR_STREAK_TARGET,
};
pub use timing::{MOVING_WINDOW_S, SCANNER_OFFLINE_AFTER_S, SETTLING_WINDOW_S};
pub use ukf::{UKF_MIN_MATCH_SCORE, UKF_MIN_SCANNERS, UKF_RETENTION_THRESHOLD};
