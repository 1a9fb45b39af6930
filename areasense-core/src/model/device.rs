//! Tracked BLE devices and their area state
//!
//! The ingestion path owns `adverts`; everything else on [`Device`] is area
//! state written by the selection engine once per cycle.

use alloc::{collections::BTreeMap, string::String};

use super::{Advert, AreaId, DeviceAddress, FloorId, ScannerAddress, Topology};
use crate::{
    constants::timing::{MOVING_WINDOW_S, SETTLING_WINDOW_S},
    diagnostics::AreaTests,
    time::{elapsed, Timestamp},
};

/// How recently a device changed area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementState {
    /// Area changed within `MOVING_WINDOW_S`
    Moving,
    /// Area changed within `SETTLING_WINDOW_S`
    Settling,
    /// Dwelling in one area for longer than `SETTLING_WINDOW_S`
    Stationary,
}

/// Decision-time view of the advert chosen for a device
///
/// For scannerless rooms the view carries the room's area while pointing at
/// the physical scanner that supplied the evidence. The underlying advert is
/// never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaSelection {
    /// Scanner whose advert backs the decision
    pub scanner_address: ScannerAddress,
    /// Area the device is placed in
    pub area_id: Option<AreaId>,
    /// Distance used for the decision (virtual for scannerless rooms)
    pub distance: Option<f32>,
    /// RSSI of the backing advert
    pub rssi: Option<f32>,
    /// Area has no physical scanner of its own
    pub scannerless: bool,
}

impl AreaSelection {
    /// View of a physical advert in its scanner's area
    pub fn from_advert(advert: &Advert) -> Self {
        Self {
            scanner_address: advert.scanner_address.clone(),
            area_id: advert.area_id.clone(),
            distance: advert.rssi_distance,
            rssi: advert.rssi,
            scannerless: false,
        }
    }

    /// View placing the device in a scannerless area, backed by `advert`
    pub fn scannerless(advert: &Advert, area_id: AreaId, virtual_distance: Option<f32>) -> Self {
        Self {
            scanner_address: advert.scanner_address.clone(),
            area_id: Some(area_id),
            distance: virtual_distance,
            rssi: advert.rssi,
            scannerless: true,
        }
    }
}

/// A tracked BLE device
#[derive(Debug, Clone)]
pub struct Device {
    /// Bluetooth address
    pub address: DeviceAddress,
    /// Display name
    pub name: String,
    /// Device is itself a scanner (never localised)
    pub is_scanner: bool,
    /// User asked for this device to be tracked
    pub tracked: bool,
    /// Permanently placed ground-truth device
    pub reference_tracker: bool,
    /// First time the device was observed
    pub first_seen: Timestamp,
    /// Latest observation per scanner
    pub adverts: BTreeMap<ScannerAddress, Advert>,

    /// Confirmed area
    pub area_id: Option<AreaId>,
    /// Confirmed area name
    pub area_name: Option<String>,
    /// Floor of the confirmed area
    pub floor_id: Option<FloorId>,
    /// Scanner whose advert won the area
    pub area_advert: Option<ScannerAddress>,
    /// Distance of the winning advert (virtual for scannerless rooms)
    pub area_distance: Option<f32>,
    /// RSSI of the winning advert
    pub area_rssi: Option<f32>,
    /// When the area selection was last applied
    pub area_last_seen: Option<Timestamp>,
    /// When the confirmed area last changed
    pub area_changed_at: Option<Timestamp>,
    /// Confirmed area has no physical scanner
    pub ukf_scannerless_area: bool,

    /// Challenger area awaiting its streak
    pub pending_area_id: Option<AreaId>,
    /// Floor of the challenger area
    pub pending_floor_id: Option<FloorId>,
    /// Consecutive cycles the challenger has been preferred
    pub pending_streak: u32,
    /// Newest advert stamp counted towards the streak
    pub pending_last_stamp: Option<Timestamp>,

    /// Manual area override (training UI)
    pub area_locked_id: Option<AreaId>,

    /// Diagnostic record of the latest decision
    pub area_tests: Option<AreaTests>,
    /// Human-readable summary of the latest decision
    pub diag_area_switch: Option<String>,
}

impl Device {
    /// New tracked device first seen at `first_seen`
    pub fn new(address: impl Into<DeviceAddress>, first_seen: Timestamp) -> Self {
        let address = address.into();
        Self {
            name: address.clone(),
            address,
            is_scanner: false,
            tracked: true,
            reference_tracker: false,
            first_seen,
            adverts: BTreeMap::new(),
            area_id: None,
            area_name: None,
            floor_id: None,
            area_advert: None,
            area_distance: None,
            area_rssi: None,
            area_last_seen: None,
            area_changed_at: None,
            ukf_scannerless_area: false,
            pending_area_id: None,
            pending_floor_id: None,
            pending_streak: 0,
            pending_last_stamp: None,
            area_locked_id: None,
            area_tests: None,
            diag_area_switch: None,
        }
    }

    /// Mark as a reference tracker
    pub fn as_reference_tracker(mut self) -> Self {
        self.reference_tracker = true;
        self
    }

    /// Insert or replace the advert for its scanner
    pub fn insert_advert(&mut self, advert: Advert) {
        self.adverts.insert(advert.scanner_address.clone(), advert);
    }

    /// Movement state derived from time since the last area change
    ///
    /// A device that never had an area is MOVING.
    pub fn get_movement_state(&self, now: Timestamp) -> MovementState {
        match self.area_changed_at {
            None => MovementState::Moving,
            Some(changed) => {
                let dwell = elapsed(changed, now);
                if dwell < MOVING_WINDOW_S {
                    MovementState::Moving
                } else if dwell < SETTLING_WINDOW_S {
                    MovementState::Settling
                } else {
                    MovementState::Stationary
                }
            }
        }
    }

    /// Seconds spent continuously in the current area
    pub fn get_dwell_time(&self, now: Timestamp) -> f64 {
        self.area_changed_at.map_or(0.0, |changed| elapsed(changed, now))
    }

    /// Largest recent speed reported by any fresh advert (m/s)
    pub fn velocity(&self, now: Timestamp, window: f64) -> f32 {
        self.fresh_adverts(now, window)
            .filter_map(|advert| advert.hist_velocity().first())
            .map(|v| libm::fabsf(*v))
            .fold(0.0, f32::max)
    }

    /// Mean RSSI-filter variance across initialised adverts
    pub fn mean_rssi_variance(&self) -> Option<f32> {
        let (sum, count) = self
            .adverts
            .values()
            .filter(|advert| advert.rssi_kalman.is_initialized)
            .fold((0.0f32, 0u32), |(sum, count), advert| {
                (sum + advert.rssi_kalman.variance, count + 1)
            });
        if count == 0 {
            None
        } else {
            Some(sum / count as f32)
        }
    }

    /// Adverts that count as current evidence
    pub fn fresh_adverts(&self, now: Timestamp, window: f64) -> impl Iterator<Item = &Advert> {
        self.adverts
            .values()
            .filter(move |advert| advert.is_fresh(now, window))
    }

    /// Newest advert stamp across all scanners
    pub fn newest_stamp(&self) -> Option<Timestamp> {
        self.adverts
            .values()
            .filter(|advert| advert.rssi.is_some())
            .map(|advert| advert.stamp)
            .fold(None, |newest: Option<Timestamp>, stamp| {
                Some(newest.map_or(stamp, |n| n.max(stamp)))
            })
    }

    /// Record the advert chosen for this device, or clear it
    pub fn apply_scanner_selection(&mut self, selection: Option<&AreaSelection>, now: Timestamp) {
        match selection {
            Some(selection) => {
                self.area_advert = Some(selection.scanner_address.clone());
                self.area_distance = selection.distance;
                self.area_rssi = selection.rssi;
                self.area_last_seen = Some(now);
                self.ukf_scannerless_area = selection.scannerless;
            }
            None => {
                self.area_advert = None;
                self.area_distance = None;
                self.area_rssi = None;
                self.ukf_scannerless_area = false;
            }
        }
    }

    /// Set the confirmed area and resolve its name and floor
    pub fn update_area_and_floor(
        &mut self,
        area_id: Option<&str>,
        topology: &dyn Topology,
        now: Timestamp,
    ) {
        if self.area_id.as_deref() != area_id {
            log_debug!(
                "{}: area {:?} -> {:?}",
                self.name,
                self.area_id.as_deref(),
                area_id
            );
            self.area_changed_at = Some(now);
        }
        match area_id {
            Some(area) => {
                self.area_id = Some(String::from(area));
                self.area_name = topology.area_name(area);
                self.floor_id = topology.floor_of(area);
            }
            None => {
                self.area_id = None;
                self.area_name = None;
                self.floor_id = None;
            }
        }
    }

    /// Forget any challenger streak
    pub fn clear_pending(&mut self) {
        self.pending_area_id = None;
        self.pending_floor_id = None;
        self.pending_streak = 0;
        self.pending_last_stamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StaticTopology;

    #[test]
    fn movement_state_follows_dwell() {
        let topology = StaticTopology::new().with_area("office", "Office", None);
        let mut device = Device::new("dev", 0.0);
        assert_eq!(device.get_movement_state(0.0), MovementState::Moving);

        device.update_area_and_floor(Some("office"), &topology, 100.0);
        assert_eq!(device.get_movement_state(150.0), MovementState::Moving);
        assert_eq!(device.get_movement_state(300.0), MovementState::Settling);
        assert_eq!(device.get_movement_state(800.0), MovementState::Stationary);
        assert_eq!(device.get_dwell_time(800.0), 700.0);
        assert_eq!(device.area_name.as_deref(), Some("Office"));
    }

    #[test]
    fn reapplying_same_area_keeps_dwell() {
        let topology = StaticTopology::new();
        let mut device = Device::new("dev", 0.0);
        device.update_area_and_floor(Some("office"), &topology, 10.0);
        device.update_area_and_floor(Some("office"), &topology, 50.0);
        assert_eq!(device.area_changed_at, Some(10.0));
    }

    #[test]
    fn clearing_selection_resets_advert_fields() {
        let mut advert = Advert::new("scanner").with_area("office");
        advert.record(-60.0, Some(2.0), 1.0);
        let mut device = Device::new("dev", 0.0);

        device.apply_scanner_selection(Some(&AreaSelection::from_advert(&advert)), 1.0);
        assert_eq!(device.area_distance, Some(2.0));

        device.apply_scanner_selection(None, 2.0);
        assert!(device.area_advert.is_none());
        assert!(device.area_distance.is_none());
    }
}
