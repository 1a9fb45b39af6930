//! Per-cycle area selection
//!
//! [`Context::refresh_areas`] is the single entry point. Each cycle:
//!
//! ```text
//! scanner liveness ──► offline set, scannerless rooms
//!        │
//!        ▼
//! reference trackers ──► one learning update per area
//!        │
//!        ▼
//! per device: lock? ──yes──► force area
//!        │ no
//!        ▼
//!   UKF fuse + fingerprint match ──accepted──► hysteresis ─┐
//!        │ rejected                                          ├─► learn
//!        ▼                                                   │
//!   min-distance tournament ─────────────────► hysteresis ──┘
//! ```
//!
//! Both paths end in the same streak hysteresis, and only confirmed areas
//! are offered to the learning gate.

mod hysteresis;
mod min_distance_path;
mod reference;
mod ukf_path;

use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::ToString,
    vec::Vec,
};

use crate::{
    config::SelectionConfig,
    context::Context,
    correlation::{AreaProfile, RoomProfile, ScannerStamps},
    diagnostics::{AreaTests, DecisionPath},
    errors::LearningSkipReason,
    fusion::{FingerprintMatch, UnscentedKalmanFilter},
    learning::{AutoLearningGate, LearningSubject, Observation},
    model::{
        Advert, AreaId, AreaSelection, Device, DeviceAddress, Scanner, ScannerAddress, Topology,
    },
    scanner_status::ScannerStatusTracker,
    time::Timestamp,
    virtual_distance::scannerless_areas,
};

/// Read-only state shared by every device decision in one cycle
pub(crate) struct Cycle<'a> {
    pub config: &'a SelectionConfig,
    pub topology: &'a dyn Topology,
    pub scanners: &'a BTreeMap<ScannerAddress, Scanner>,
    pub scanner_status: &'a ScannerStatusTracker,
    pub offline: &'a BTreeSet<ScannerAddress>,
    pub scannerless: &'a BTreeSet<AreaId>,
    pub now: Timestamp,
}

/// A decision that left the device confirmed in its area
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Confirmed {
    pub scanner_address: ScannerAddress,
    pub confidence: f32,
    pub scannerless: bool,
}

/// Fresh RSSI per scanner and the stamps they carry
pub fn visible_readings(
    device: &Device,
    now: Timestamp,
    window: f64,
) -> (BTreeMap<ScannerAddress, f32>, ScannerStamps) {
    let mut readings = BTreeMap::new();
    let mut stamps = ScannerStamps::new();
    for advert in device.fresh_adverts(now, window) {
        if let Some(rssi) = advert.rssi {
            readings.insert(advert.scanner_address.clone(), rssi);
            stamps.insert(advert.scanner_address.clone(), advert.stamp);
        }
    }
    (readings, stamps)
}

fn strongest<'d>(adverts: impl Iterator<Item = &'d Advert>) -> Option<&'d Advert> {
    adverts.max_by(|a, b| {
        a.rssi
            .unwrap_or(f32::NEG_INFINITY)
            .total_cmp(&b.rssi.unwrap_or(f32::NEG_INFINITY))
    })
}

/// Force the device into its locked area
///
/// Uses the strongest fresh advert from a scanner in that area, else the
/// strongest fresh advert overall as a scannerless placement.
fn apply_lock(cycle: &Cycle<'_>, device: &mut Device, locked: &str) {
    let window = cycle.config.evidence_window;
    let in_area = strongest(device.fresh_adverts(cycle.now, window).filter(|advert| {
        cycle
            .scanners
            .get(&advert.scanner_address)
            .and_then(|scanner| scanner.area_id.as_deref())
            == Some(locked)
    }));
    let selection = match in_area {
        Some(advert) => Some(AreaSelection::from_advert(advert)),
        None => strongest(device.fresh_adverts(cycle.now, window))
            .map(|advert| AreaSelection::scannerless(advert, AreaId::from(locked), None)),
    };
    if device.area_id.as_deref() != Some(locked) {
        log_info!("{}: locked to {}", device.address, locked);
    }
    device.apply_scanner_selection(selection.as_ref(), cycle.now);
    device.update_area_and_floor(Some(locked), cycle.topology, cycle.now);
    device.clear_pending();
}

/// Fold the device's readings into its filter and score every area
fn fuse(
    cycle: &Cycle<'_>,
    device: &Device,
    ukf: &mut UnscentedKalmanFilter,
    readings: &BTreeMap<ScannerAddress, f32>,
    device_profiles: Option<&BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &BTreeMap<AreaId, RoomProfile>,
) -> Vec<FingerprintMatch> {
    ukf.prune_stale(cycle.now);
    if !readings.is_empty() {
        let fused = ukf
            .predict_to(cycle.now)
            .and_then(|()| ukf.update_multi(readings, cycle.now));
        if let Err(err) = fused {
            log_warn!("{}: filter reset: {}", device.address, err);
            *ukf = UnscentedKalmanFilter::new();
            if let Err(err) = ukf.update_multi(readings, cycle.now) {
                log_warn!("{}: filter rejected readings: {}", device.address, err);
                *ukf = UnscentedKalmanFilter::new();
            }
        }
    }
    ukf.match_fingerprints(device_profiles, room_profiles, cycle.offline)
}

/// Offer a confirmed decision to the auto-learning gate
#[allow(clippy::too_many_arguments)]
fn learn(
    cycle: &Cycle<'_>,
    device: &Device,
    confirmed: &Confirmed,
    readings: &BTreeMap<ScannerAddress, f32>,
    stamps: &ScannerStamps,
    correlations: &mut BTreeMap<DeviceAddress, BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &mut BTreeMap<AreaId, RoomProfile>,
    learning: &mut AutoLearningGate,
) {
    if confirmed.scannerless || device.reference_tracker {
        return;
    }
    let Some(area) = device.area_id.as_deref() else {
        return;
    };
    let Some(primary_rssi) = readings.get(&confirmed.scanner_address).copied() else {
        learning.skip(&device.address, area, LearningSkipReason::PrimaryNotVisible);
        return;
    };
    let mut others = readings.clone();
    others.remove(&confirmed.scanner_address);

    let observation = Observation {
        area_id: area,
        primary_scanner: &confirmed.scanner_address,
        primary_rssi,
        other_readings: &others,
        confidence: confirmed.confidence,
        current_stamps: stamps,
        evidence_window: cycle.config.evidence_window,
    };
    let profiles = correlations.entry(device.address.clone()).or_default();
    // Skip reasons are counted by the gate.
    let _ = learning.update_device_correlations(
        LearningSubject::Device(device),
        &observation,
        profiles,
        room_profiles,
        cycle.offline,
        cycle.now,
    );
}

impl Context {
    /// Decide the area of every tracked device for the cycle at `now`
    pub fn refresh_areas(&mut self, now: Timestamp) {
        let Context {
            config,
            topology,
            scanners,
            devices,
            correlations,
            room_profiles,
            device_ukfs,
            scanner_status,
            learning,
        } = self;

        let offline =
            scanner_status.refresh(&*scanners, &*devices, now, config.scanner_offline_after);
        let scannerless = scannerless_areas(&**topology, &*scanners);

        if config.auto_learning {
            reference::learn_from_reference_trackers(
                &*config,
                &*devices,
                correlations,
                room_profiles,
                learning,
                &offline,
                now,
            );
        }

        let cycle = Cycle {
            config: &*config,
            topology: &**topology,
            scanners: &*scanners,
            scanner_status: &*scanner_status,
            offline: &offline,
            scannerless: &scannerless,
            now,
        };

        for device in devices.values_mut() {
            if device.is_scanner || !device.tracked {
                continue;
            }
            let mut tests = AreaTests::new(DecisionPath::MinDistance, device.area_id.clone());

            if let Some(locked) = device.area_locked_id.clone() {
                apply_lock(&cycle, device, &locked);
                tests.path = DecisionPath::Locked;
                tests.challenger_area = Some(locked);
                tests.note("locked");
                device.diag_area_switch = Some(tests.to_string());
                device.area_tests = Some(tests);
                continue;
            }

            let (readings, stamps) = visible_readings(device, now, config.evidence_window);
            let confirmed = {
                let device_profiles = correlations.get(&device.address);
                let ukf = device_ukfs.entry(device.address.clone()).or_default();
                let matches = fuse(
                    &cycle,
                    device,
                    ukf,
                    &readings,
                    device_profiles,
                    room_profiles,
                );
                match ukf_path::evaluate(
                    &cycle,
                    device,
                    &readings,
                    &matches,
                    device_profiles,
                    room_profiles,
                ) {
                    Ok(decision) => ukf_path::apply(&cycle, device, decision, &mut tests),
                    Err(rejection) => {
                        log_debug!("{}: ukf declined: {}", device.address, rejection);
                        tests.ukf_rejection = Some(rejection);
                        min_distance_path::run(
                            &cycle,
                            device,
                            &readings,
                            &matches,
                            device_profiles,
                            room_profiles,
                            &mut tests,
                        )
                    }
                }
            };

            if let Some(confirmed) = confirmed.as_ref() {
                device.ukf_scannerless_area = confirmed.scannerless;
                if config.auto_learning {
                    learn(
                        &cycle,
                        device,
                        confirmed,
                        &readings,
                        &stamps,
                        correlations,
                        room_profiles,
                        learning,
                    );
                }
            }

            if tests.switched() {
                log_debug!("{}: {}", device.address, tests);
            }
            device.diag_area_switch = Some(tests.to_string());
            device.area_tests = Some(tests);
        }
    }
}
