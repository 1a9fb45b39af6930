//! Device-independent fingerprint for an area

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use super::{has_new_data, Fingerprint, Provenance, ScannerStamps, ZScore};
use crate::{
    model::{AreaId, ScannerAddress},
    time::Timestamp,
};

/// Aggregate fingerprint of every device that learned in an area
///
/// Rooms do not enforce an interval of their own. Updates are only issued
/// after the device's [`AreaProfile`](super::AreaProfile) accepted the same
/// sample, so both move in lock-step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoomProfile {
    /// Area the fingerprint belongs to
    pub area_id: AreaId,
    fingerprint: Fingerprint,
    last_update: Option<Timestamp>,
    updates: u32,
}

impl RoomProfile {
    /// Empty profile for `area_id`
    pub fn new(area_id: impl Into<AreaId>) -> Self {
        Self {
            area_id: area_id.into(),
            fingerprint: Fingerprint::new(),
            last_update: None,
            updates: 0,
        }
    }

    /// Fold in an auto sample already accepted by a device profile
    pub fn update(
        &mut self,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
        primary_scanner_addr: &str,
        nowstamp: Timestamp,
        last_stamps: Option<&ScannerStamps>,
        current_stamps: &ScannerStamps,
    ) -> bool {
        self.learn(
            primary_rssi,
            other_readings,
            primary_scanner_addr,
            nowstamp,
            last_stamps,
            current_stamps,
            Provenance::Auto,
        )
    }

    /// Fold in a user-trained sample
    pub fn update_button(
        &mut self,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
        primary_scanner_addr: &str,
        nowstamp: Timestamp,
        last_stamps: Option<&ScannerStamps>,
        current_stamps: &ScannerStamps,
    ) -> bool {
        self.learn(
            primary_rssi,
            other_readings,
            primary_scanner_addr,
            nowstamp,
            last_stamps,
            current_stamps,
            Provenance::Button,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn learn(
        &mut self,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
        primary_scanner_addr: &str,
        nowstamp: Timestamp,
        last_stamps: Option<&ScannerStamps>,
        current_stamps: &ScannerStamps,
        provenance: Provenance,
    ) -> bool {
        if !has_new_data(last_stamps, current_stamps) {
            return false;
        }
        self.fingerprint
            .learn(primary_scanner_addr, primary_rssi, other_readings, provenance);
        self.last_update = Some(nowstamp);
        self.updates = self.updates.saturating_add(1);
        true
    }

    /// Pair-delta z-scores of the current pattern
    pub fn get_z_scores(
        &self,
        primary_scanner_addr: &str,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
    ) -> Vec<ZScore> {
        self.fingerprint
            .z_scores(primary_scanner_addr, primary_rssi, other_readings)
    }

    /// Absolute-RSSI z-scores of `readings`
    pub fn get_absolute_z_scores(&self, readings: &BTreeMap<ScannerAddress, f32>) -> Vec<ZScore> {
        self.fingerprint.absolute_z_scores(readings)
    }

    /// Combined match score in [0, 1]
    pub fn get_match_score(&self, readings: &BTreeMap<ScannerAddress, f32>) -> Option<f32> {
        self.fingerprint.match_score(readings)
    }

    /// Expected RSSI and σ for `scanner`
    pub fn expected_rssi(&self, scanner: &str) -> Option<(f32, f32)> {
        self.fingerprint.expected_rssi(scanner)
    }

    /// Any user-trained data present
    pub fn has_button_training(&self) -> bool {
        self.fingerprint.has_button_training()
    }

    /// Scanners with enough samples to be matched against
    pub fn trained_scanner_addresses(&self) -> BTreeSet<ScannerAddress> {
        self.fingerprint.trained_scanner_addresses()
    }

    /// At least one mature estimator
    pub fn is_mature(&self) -> bool {
        self.fingerprint.mature_scanner_count() > 0
    }

    /// Time of the last accepted sample
    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }

    /// Accepted samples
    pub fn updates(&self) -> u32 {
        self.updates
    }

    /// Underlying fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Forget everything learned
    pub fn reset(&mut self) {
        *self = Self::new(core::mem::take(&mut self.area_id));
    }
}
