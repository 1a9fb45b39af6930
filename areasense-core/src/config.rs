//! Per-installation configuration
//!
//! Read once per cycle. Values come from the host's options flow; this
//! crate only validates them.

use crate::{
    constants::{
        selection::{CROSS_FLOOR_STREAK_TARGET, DEFAULT_MAX_AREA_RADIUS_M, SAME_FLOOR_STREAK_TARGET},
        timing::{DEFAULT_EVIDENCE_WINDOW_S, SCANNER_OFFLINE_AFTER_S},
    },
    errors::ConfigError,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Selection engine configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SelectionConfig {
    /// Adverts farther than this (m) cannot win an area
    pub max_area_radius: f32,
    /// Let materially stronger raw RSSI override small distance differences
    pub rssi_priority: bool,
    /// Try UKF fingerprint matching before the min-distance tournament
    pub use_ukf: bool,
    /// Cycles with new data before a same-floor switch commits
    pub same_floor_streak: u32,
    /// Cycles with new data before a cross-floor switch commits
    pub cross_floor_streak: u32,
    /// Seconds without any advert before a scanner is offline
    pub scanner_offline_after: f64,
    /// Seconds an advert counts as current evidence
    pub evidence_window: f64,
    /// Feed confirmed decisions back into the profiles
    pub auto_learning: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_area_radius: DEFAULT_MAX_AREA_RADIUS_M,
            rssi_priority: false,
            use_ukf: true,
            same_floor_streak: SAME_FLOOR_STREAK_TARGET,
            cross_floor_streak: CROSS_FLOOR_STREAK_TARGET,
            scanner_offline_after: SCANNER_OFFLINE_AFTER_S,
            evidence_window: DEFAULT_EVIDENCE_WINDOW_S,
            auto_learning: true,
        }
    }
}

impl SelectionConfig {
    /// Set maximum detection radius in meters
    pub fn with_max_area_radius(mut self, radius: f32) -> Self {
        self.max_area_radius = radius;
        self
    }

    /// Enable or disable RSSI priority tie-breaking
    pub fn with_rssi_priority(mut self, enabled: bool) -> Self {
        self.rssi_priority = enabled;
        self
    }

    /// Enable or disable UKF fingerprint matching
    pub fn with_ukf(mut self, enabled: bool) -> Self {
        self.use_ukf = enabled;
        self
    }

    /// Set same-floor and cross-floor streak targets
    pub fn with_streaks(mut self, same_floor: u32, cross_floor: u32) -> Self {
        self.same_floor_streak = same_floor;
        self.cross_floor_streak = cross_floor;
        self
    }

    /// Enable or disable auto-learning
    pub fn with_auto_learning(mut self, enabled: bool) -> Self {
        self.auto_learning = enabled;
        self
    }

    /// Set the evidence window in seconds
    pub fn with_evidence_window(mut self, seconds: f64) -> Self {
        self.evidence_window = seconds;
        self
    }

    /// Check all values, returning the config unchanged when valid
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(self.max_area_radius.is_finite() && self.max_area_radius > 0.0) {
            return Err(ConfigError::InvalidRadius(self.max_area_radius));
        }
        if self.same_floor_streak == 0 {
            return Err(ConfigError::ZeroStreak { which: "same_floor_streak" });
        }
        if self.cross_floor_streak == 0 {
            return Err(ConfigError::ZeroStreak { which: "cross_floor_streak" });
        }
        for (which, value) in [
            ("scanner_offline_after", self.scanner_offline_after),
            ("evidence_window", self.evidence_window),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidWindow { which, value });
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SelectionConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let err = SelectionConfig::default()
            .with_max_area_radius(0.0)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidRadius(0.0));

        let err = SelectionConfig::default()
            .with_streaks(0, 3)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroStreak { which: "same_floor_streak" }));

        let err = SelectionConfig::default()
            .with_evidence_window(f64::NAN)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWindow { which: "evidence_window", .. }));
    }
}
