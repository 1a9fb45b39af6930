//! Error and rejection types
//!
//! Nothing in the selection engine is fatal. Decision paths report *why*
//! they declined to decide so the next strategy can take over and the reason
//! can be shown in diagnostics:
//!
//! - **Insufficient evidence** (too few scanners, no profiles, stale data):
//!   the path returns "no decision" and control falls through
//!   (UKF → min-distance → fallbacks → clear).
//! - **Inconsistent evidence** (RSSI / topology / proximity sanity): an
//!   explicit [`UkfRejection`] is recorded.
//! - **Learning risk** (ambiguous signal, variance, partial coverage): the
//!   sample is dropped and counted by [`LearningSkipReason`].
//!
//! Only configuration can be outright invalid ([`ConfigError`]).
//!
//! All types are `Copy` and carry no heap data so they can be stored in the
//! bounded diagnostic record without allocation.

use thiserror_no_std::Error;

/// Invalid configuration values
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Radius must be positive and finite
    #[error("max area radius {0} must be positive")]
    InvalidRadius(f32),

    /// Streak targets must be at least one cycle
    #[error("streak target for {which} must be at least 1")]
    ZeroStreak {
        /// Which streak setting was zero
        which: &'static str,
    },

    /// Time windows must be positive and finite
    #[error("{which} must be a positive number of seconds, got {value}")]
    InvalidWindow {
        /// Which window setting was invalid
        which: &'static str,
        /// The rejected value
        value: f64,
    },
}

/// Why the UKF path declined to decide a device's area
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum UkfRejection {
    /// UKF matching is switched off in configuration
    #[error("UKF disabled")]
    Disabled,

    /// Not enough simultaneous readings and no retention candidate
    #[error("only {visible} scanners visible, need {required}")]
    TooFewScanners {
        /// Scanners currently visible
        visible: usize,
        /// Scanners required
        required: usize,
    },

    /// No device or room profile produced a candidate
    #[error("no fingerprint candidates")]
    NoCandidates,

    /// Best candidate scored below the applicable threshold
    #[error("best score {score:.2} below threshold {threshold:.2}")]
    BelowThreshold {
        /// Best (stickiness-adjusted) score
        score: f32,
        /// Threshold that applied
        threshold: f32,
    },

    /// No scanner that could witness the winning area sees the device
    ///
    /// For scannerless areas: nothing on the area's floor. For areas with
    /// their own scanners: none of those.
    #[error("no scanner placed to witness the winning area sees the device")]
    Topological,

    /// Low-confidence pick of a markedly weaker-signal room
    #[error("winning area is {deficit_db:.1} dB weaker than the strongest scanner")]
    RssiSanity {
        /// Signal deficit of the winning area versus the strongest reading
        deficit_db: f32,
    },

    /// A very close scanner in another area vetoed the pick
    #[error("scanner {distance:.2} m away in another area vetoes the match")]
    ProximityVeto {
        /// Distance to the vetoing scanner
        distance: f32,
        /// True when the vetoing scanner is on a different floor
        cross_floor: bool,
    },
}

/// Why an auto-learning sample was not applied
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LearningSkipReason {
    /// Decision confidence below the learning minimum
    #[error("confidence too low")]
    LowConfidence,
    /// Device has not been observed long enough
    #[error("device still initialising")]
    Initialising,
    /// Device is moving or settling
    #[error("device not stationary")]
    NotStationary,
    /// Recent velocity above the ceiling
    #[error("velocity too high")]
    HighVelocity,
    /// RSSI filters too noisy
    #[error("rssi variance too high")]
    HighVariance,
    /// Pattern matches another area nearly as well
    #[error("signal ambiguous with another area")]
    Ambiguous,
    /// A scanner the profile was trained with is offline
    #[error("trained scanner offline")]
    PartialCoverage,
    /// Minimum interval since the last accepted sample not yet elapsed
    #[error("too soon after previous sample")]
    TooSoon,
    /// No scanner produced a reading newer than the last accepted sample
    #[error("no new advert data")]
    NoNewData,
    /// The winning scanner has no reading in the current evidence window
    #[error("winning scanner not currently visible")]
    PrimaryNotVisible,
}

/// Why a profile refused a sample
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileUpdateRejection {
    /// Minimum interval not elapsed
    #[error("minimum update interval not elapsed")]
    TooSoon,
    /// Readings are re-reads of data already learned
    #[error("no scanner reported new data")]
    NoNewData,
}

impl From<ProfileUpdateRejection> for LearningSkipReason {
    fn from(rejection: ProfileUpdateRejection) -> Self {
        match rejection {
            ProfileUpdateRejection::TooSoon => LearningSkipReason::TooSoon,
            ProfileUpdateRejection::NoNewData => LearningSkipReason::NoNewData,
        }
    }
}

/// Numeric failure inside the UKF
///
/// Recovered by re-creating the device's filter; never surfaced as a
/// decision failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionError {
    /// Covariance lost positive definiteness during sigma point generation
    #[error("covariance not positive definite")]
    NotPositiveDefinite,
    /// Innovation covariance could not be inverted
    #[error("innovation covariance singular")]
    SingularInnovation,
    /// A reading or state value became NaN or infinite
    #[error("non-finite value in filter state")]
    NonFinite,
}

#[cfg(feature = "defmt")]
impl defmt::Format for LearningSkipReason {
    fn format(&self, fmt: defmt::Formatter) {
        let text = match self {
            Self::LowConfidence => "low confidence",
            Self::Initialising => "initialising",
            Self::NotStationary => "not stationary",
            Self::HighVelocity => "high velocity",
            Self::HighVariance => "high variance",
            Self::Ambiguous => "ambiguous",
            Self::PartialCoverage => "partial coverage",
            Self::TooSoon => "too soon",
            Self::NoNewData => "no new data",
            Self::PrimaryNotVisible => "primary not visible",
        };
        defmt::write!(fmt, "{}", text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for UkfRejection {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Disabled => defmt::write!(fmt, "UKF disabled"),
            Self::TooFewScanners { visible, required } => {
                defmt::write!(fmt, "{} scanners, need {}", visible, required)
            }
            Self::NoCandidates => defmt::write!(fmt, "no candidates"),
            Self::BelowThreshold { score, threshold } => {
                defmt::write!(fmt, "score {} < {}", score, threshold)
            }
            Self::Topological => defmt::write!(fmt, "topological"),
            Self::RssiSanity { deficit_db } => defmt::write!(fmt, "rssi deficit {}", deficit_db),
            Self::ProximityVeto { distance, .. } => {
                defmt::write!(fmt, "proximity veto {}", distance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn profile_rejections_map_to_skip_reasons() {
        assert_eq!(
            LearningSkipReason::from(ProfileUpdateRejection::TooSoon),
            LearningSkipReason::TooSoon
        );
        assert_eq!(
            LearningSkipReason::from(ProfileUpdateRejection::NoNewData),
            LearningSkipReason::NoNewData
        );
    }

    #[test]
    fn rejection_messages_are_readable() {
        let text = UkfRejection::TooFewScanners { visible: 1, required: 2 }.to_string();
        assert_eq!(text, "only 1 scanners visible, need 2");
    }
}
