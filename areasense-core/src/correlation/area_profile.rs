//! Per-device, per-area fingerprint

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use super::{has_new_data, Fingerprint, Provenance, ScannerStamps, ZScore};
use crate::{
    constants::learning::AUTO_LEARNING_MIN_INTERVAL_S,
    errors::ProfileUpdateRejection,
    model::{AreaId, ScannerAddress},
    time::{elapsed, Timestamp},
};

/// What one device looks like from the scanners while it sits in one area
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AreaProfile {
    /// Area the fingerprint belongs to
    pub area_id: AreaId,
    fingerprint: Fingerprint,
    last_update: Option<Timestamp>,
    last_button_update: Option<Timestamp>,
    auto_updates: u32,
    button_updates: u32,
}

impl AreaProfile {
    /// Empty profile for `area_id`
    pub fn new(area_id: impl Into<AreaId>) -> Self {
        Self {
            area_id: area_id.into(),
            fingerprint: Fingerprint::new(),
            last_update: None,
            last_button_update: None,
            auto_updates: 0,
            button_updates: 0,
        }
    }

    /// Learn an auto-confirmed observation
    ///
    /// Returns `true` when the sample was folded in. Refused when less than
    /// the minimum interval has passed since the last accepted sample, or
    /// when no scanner stamp advanced past `last_stamps`.
    pub fn update(
        &mut self,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
        primary_scanner_addr: &str,
        nowstamp: Timestamp,
        last_stamps: Option<&ScannerStamps>,
        current_stamps: &ScannerStamps,
    ) -> bool {
        self.try_update(
            primary_rssi,
            other_readings,
            primary_scanner_addr,
            nowstamp,
            last_stamps,
            current_stamps,
        )
        .is_ok()
    }

    /// [`AreaProfile::update`] with the rejection reason
    pub fn try_update(
        &mut self,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
        primary_scanner_addr: &str,
        nowstamp: Timestamp,
        last_stamps: Option<&ScannerStamps>,
        current_stamps: &ScannerStamps,
    ) -> Result<(), ProfileUpdateRejection> {
        check_gates(self.last_update, nowstamp, last_stamps, current_stamps)?;
        self.fingerprint.learn(
            primary_scanner_addr,
            primary_rssi,
            other_readings,
            Provenance::Auto,
        );
        self.last_update = Some(nowstamp);
        self.auto_updates = self.auto_updates.saturating_add(1);
        Ok(())
    }

    /// Learn a user-trained observation
    ///
    /// Same gates as [`AreaProfile::update`], tracked on a separate clock so
    /// auto learning never starves training.
    pub fn update_button(
        &mut self,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
        primary_scanner_addr: &str,
        nowstamp: Timestamp,
        last_stamps: Option<&ScannerStamps>,
        current_stamps: &ScannerStamps,
    ) -> bool {
        if check_gates(self.last_button_update, nowstamp, last_stamps, current_stamps).is_err() {
            return false;
        }
        self.fingerprint.learn(
            primary_scanner_addr,
            primary_rssi,
            other_readings,
            Provenance::Button,
        );
        self.last_button_update = Some(nowstamp);
        self.button_updates = self.button_updates.saturating_add(1);
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

    /// Accepted auto samples
    pub fn auto_updates(&self) -> u32 {
        self.auto_updates
    }

    /// Accepted button samples
    pub fn button_updates(&self) -> u32 {
        self.button_updates
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

fn check_gates(
    last_update: Option<Timestamp>,
    nowstamp: Timestamp,
    last_stamps: Option<&ScannerStamps>,
    current_stamps: &ScannerStamps,
) -> Result<(), ProfileUpdateRejection> {
    if let Some(last) = last_update {
        if elapsed(last, nowstamp) < AUTO_LEARNING_MIN_INTERVAL_S {
            return Err(ProfileUpdateRejection::TooSoon);
        }
    }
    if !has_new_data(last_stamps, current_stamps) {
        return Err(ProfileUpdateRejection::NoNewData);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn map(entries: &[(&str, f64)]) -> ScannerStamps {
        entries.iter().map(|(a, v)| (String::from(*a), *v)).collect()
    }

    fn readings() -> BTreeMap<ScannerAddress, f32> {
        [(String::from("b"), -72.0_f32)].into_iter().collect()
    }

    #[test]
    fn second_update_within_interval_is_refused() {
        let mut profile = AreaProfile::new("kitchen");
        let stamps = map(&[("a", 100.0), ("b", 100.0)]);
        assert!(profile.update(-60.0, &readings(), "a", 100.0, None, &stamps));
        let newer = map(&[("a", 101.0), ("b", 101.0)]);
        assert_eq!(
            profile.try_update(-60.0, &readings(), "a", 101.0, Some(&stamps), &newer),
            Err(ProfileUpdateRejection::TooSoon)
        );
        assert_eq!(profile.auto_updates(), 1);
    }

    #[test]
    fn cached_readings_are_not_new_evidence() {
        let mut profile = AreaProfile::new("kitchen");
        let stamps = map(&[("a", 100.0)]);
        assert!(profile.update(-60.0, &readings(), "a", 100.0, None, &stamps));
        assert_eq!(
            profile.try_update(-60.0, &readings(), "a", 200.0, Some(&stamps), &stamps),
            Err(ProfileUpdateRejection::NoNewData)
        );
    }

    #[test]
    fn button_clock_is_independent() {
        let mut profile = AreaProfile::new("kitchen");
        let stamps = map(&[("a", 100.0)]);
        assert!(profile.update(-60.0, &readings(), "a", 100.0, None, &stamps));
        assert!(profile.update_button(-60.0, &readings(), "a", 100.0, None, &stamps));
        assert!(profile.has_button_training());
        assert_eq!(profile.button_updates(), 1);
    }

    #[test]
    fn reset_keeps_area() {
        let mut profile = AreaProfile::new("kitchen");
        let stamps = map(&[("a", 1.0)]);
        profile.update_button(-60.0, &readings(), "a", 1.0, None, &stamps);
        profile.reset();
        assert_eq!(profile.area_id, "kitchen");
        assert!(!profile.has_button_training());
        assert!(profile.fingerprint().is_empty());
    }
}
