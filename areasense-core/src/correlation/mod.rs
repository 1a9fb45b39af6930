//! Learned RSSI fingerprints
//!
//! ## Overview
//!
//! A fingerprint describes what a device's radio environment looks like when
//! it is in a given area:
//!
//! - **Pair correlations**: `other_rssi − primary_rssi` for every other
//!   scanner visible alongside the primary (winning) scanner. Deltas cancel
//!   out the device's own transmit power and orientation.
//! - **Absolute levels**: raw RSSI per scanner, needed by the UKF matcher
//!   and for single-scanner retention.
//!
//! Every value is tracked by a scalar Kalman estimator with a variance
//! floor, split by provenance:
//!
//! ```text
//! button samples ──► button estimator ─┐
//!                                      ├─► clamped fusion (button ≥ 70%)
//! auto samples   ──► auto estimator ───┘
//! ```
//!
//! [`AreaProfile`] is per device and area; [`RoomProfile`] aggregates all
//! devices for an area and stands in until a device has its own history.

pub mod area_profile;
pub mod estimators;
pub mod fingerprint;
pub mod kalman;
pub mod room_profile;

pub use area_profile::AreaProfile;
pub use estimators::{LearnedValue, Provenance, ScannerAbsoluteRssi, ScannerPairCorrelation};
pub use fingerprint::{Fingerprint, ZScore};
pub use kalman::ScalarKalman;
pub use room_profile::RoomProfile;

use alloc::collections::BTreeMap;

use crate::{model::ScannerAddress, time::Timestamp};

/// Per-scanner advert stamps used to detect genuinely new readings
pub type ScannerStamps = BTreeMap<ScannerAddress, Timestamp>;

/// True when at least one scanner reports a reading newer than last time
///
/// Without a previous record any non-empty stamp set is new.
pub fn has_new_data(last_stamps: Option<&ScannerStamps>, current_stamps: &ScannerStamps) -> bool {
    match last_stamps {
        None => !current_stamps.is_empty(),
        Some(last) => current_stamps
            .iter()
            .any(|(scanner, stamp)| last.get(scanner).map_or(true, |previous| stamp > previous)),
    }
}
