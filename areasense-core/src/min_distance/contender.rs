//! Decision-time views of adverts competing in the tournament

use alloc::collections::BTreeMap;

use crate::{
    constants::{
        selection::CROSS_FLOOR_MIN_HISTORY,
        timing::{AREA_MAX_AD_AGE_S, INCUMBENT_STALE_AFTER_S},
    },
    model::{Advert, AreaId, AreaSelection, Device, FloorId, Scanner, ScannerAddress, Topology},
    time::{elapsed, Timestamp},
    virtual_distance::VirtualCandidate,
};

/// One advert (or scannerless room) competing for a device
#[derive(Debug, Clone, PartialEq)]
pub struct Contender {
    /// Scanner whose advert backs this contender
    pub scanner_address: ScannerAddress,
    /// Area the contender would place the device in
    pub area_id: AreaId,
    /// Floor of that area
    pub floor_id: Option<FloorId>,
    /// Numeric floor level
    pub floor_level: Option<i32>,
    /// Distance (m); `None` for a soft incumbent
    pub distance: Option<f32>,
    /// Raw RSSI of the backing advert
    pub rssi: Option<f32>,
    /// Stamp of the backing advert
    pub stamp: Timestamp,
    /// Distance history length
    pub hist_len: usize,
    /// Mean of the recent distance history
    pub hist_avg: Option<f32>,
    /// Distance variance (m²)
    pub variance: Option<f32>,
    /// Incumbent reading is old enough to ignore its variance
    pub stale: bool,
    /// Area has no physical scanner; distance is virtual
    pub scannerless: bool,
}

impl Contender {
    /// Contender for a physical advert
    ///
    /// `None` when the scanner is unknown or has no area.
    pub fn from_advert(
        advert: &Advert,
        scanner: Option<&Scanner>,
        topology: &dyn Topology,
        now: Timestamp,
    ) -> Option<Self> {
        let scanner = scanner?;
        let area_id = scanner.area_id.clone().or_else(|| advert.area_id.clone())?;
        let floor_id = scanner
            .floor_id
            .clone()
            .or_else(|| topology.floor_of(&area_id));
        let floor_level = scanner
            .floor_level
            .or_else(|| floor_id.as_deref().and_then(|f| topology.floor_level(f)));
        Some(Self {
            scanner_address: advert.scanner_address.clone(),
            area_id,
            floor_id,
            floor_level,
            distance: advert.rssi_distance,
            rssi: advert.rssi,
            stamp: advert.stamp,
            hist_len: advert.hist_distance_by_interval().len(),
            hist_avg: advert.recent_mean_distance(CROSS_FLOOR_MIN_HISTORY),
            variance: advert.get_distance_variance(now),
            stale: false,
            scannerless: false,
        })
    }

    /// Scannerless room backed by the device's strongest advert
    pub fn from_virtual(
        candidate: &VirtualCandidate,
        backing: &Advert,
        topology: &dyn Topology,
    ) -> Self {
        let floor_id = topology.floor_of(&candidate.area_id);
        let floor_level = floor_id.as_deref().and_then(|f| topology.floor_level(f));
        Self {
            scanner_address: backing.scanner_address.clone(),
            area_id: candidate.area_id.clone(),
            floor_id,
            floor_level,
            distance: Some(candidate.distance),
            rssi: backing.rssi,
            stamp: backing.stamp,
            hist_len: backing.hist_distance_by_interval().len(),
            hist_avg: Some(candidate.distance),
            variance: None,
            stale: false,
            scannerless: true,
        }
    }

    /// The device's current winning advert as an incumbent
    ///
    /// - No area advert, or older than `AREA_MAX_AD_AGE_S`: no incumbent
    /// - No distance, or outside the evidence window: soft incumbent
    /// - Older than `INCUMBENT_STALE_AFTER_S`: stale, variance ignored
    ///
    /// A scannerless incumbent takes its distance from `virtual_candidates`
    /// and is soft when its room no longer has one.
    pub fn incumbent(
        device: &Device,
        scanners: &BTreeMap<ScannerAddress, Scanner>,
        topology: &dyn Topology,
        virtual_candidates: &[VirtualCandidate],
        now: Timestamp,
        evidence_window: f64,
    ) -> Option<Self> {
        let advert = device.adverts.get(device.area_advert.as_deref()?)?;
        let age = elapsed(advert.stamp, now);
        if advert.rssi.is_none() || age > AREA_MAX_AD_AGE_S {
            return None;
        }

        let mut incumbent = if device.ukf_scannerless_area {
            let area_id = device.area_id.clone()?;
            match virtual_candidates.iter().find(|c| c.area_id == area_id) {
                Some(candidate) => Self::from_virtual(candidate, advert, topology),
                None => {
                    let floor_id = topology.floor_of(&area_id);
                    let floor_level = floor_id.as_deref().and_then(|f| topology.floor_level(f));
                    Self {
                        scanner_address: advert.scanner_address.clone(),
                        area_id,
                        floor_id,
                        floor_level,
                        distance: None,
                        rssi: advert.rssi,
                        stamp: advert.stamp,
                        hist_len: advert.hist_distance_by_interval().len(),
                        hist_avg: None,
                        variance: None,
                        stale: false,
                        scannerless: true,
                    }
                }
            }
        } else {
            Self::from_advert(advert, scanners.get(&advert.scanner_address), topology, now)?
        };

        if !advert.is_fresh(now, evidence_window) {
            incumbent.distance = None;
        }
        incumbent.stale = age > INCUMBENT_STALE_AFTER_S;
        Some(incumbent)
    }

    /// Incumbent without a usable distance
    pub fn is_soft(&self) -> bool {
        self.distance.is_none()
    }

    /// Both floors known and different
    pub fn is_cross_floor(&self, other: &Contender) -> bool {
        match (&self.floor_id, &other.floor_id) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }

    /// Within `max_radius`; soft contenders always are
    pub fn within_radius(&self, max_radius: f32) -> bool {
        self.distance.map_or(true, |d| d <= max_radius)
    }

    /// Decision-time view for applying this contender to a device
    pub fn selection(&self) -> AreaSelection {
        AreaSelection {
            scanner_address: self.scanner_address.clone(),
            area_id: Some(self.area_id.clone()),
            distance: self.distance,
            rssi: self.rssi,
            scannerless: self.scannerless,
        }
    }
}
