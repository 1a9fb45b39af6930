//! Reference tracker aggregation
//!
//! Reference trackers are fixed devices placed in known areas. All trackers
//! confirmed in one area collapse into a single [`ReferenceProxy`] whose
//! readings are the per-scanner median, so an area is learned at most once
//! per cycle however many trackers it holds.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use crate::{
    config::SelectionConfig,
    correlation::{AreaProfile, RoomProfile, ScannerStamps},
    learning::{AutoLearningGate, LearningSubject, Observation, ReferenceProxy},
    model::{AreaId, Device, DeviceAddress, ScannerAddress},
    time::Timestamp,
};

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Median readings and newest stamps of the trackers in one area
pub(crate) fn aggregate_readings(
    trackers: &[&Device],
    now: Timestamp,
    window: f64,
) -> (BTreeMap<ScannerAddress, f32>, ScannerStamps) {
    let mut samples: BTreeMap<&ScannerAddress, Vec<f32>> = BTreeMap::new();
    let mut stamps = ScannerStamps::new();
    for tracker in trackers {
        for advert in tracker.fresh_adverts(now, window) {
            let Some(rssi) = advert.median_rssi() else {
                continue;
            };
            samples.entry(&advert.scanner_address).or_default().push(rssi);
            let stamp = stamps
                .entry(advert.scanner_address.clone())
                .or_insert(advert.stamp);
            if advert.stamp > *stamp {
                *stamp = advert.stamp;
            }
        }
    }
    let readings = samples
        .into_iter()
        .filter_map(|(scanner, mut values)| Some((scanner.clone(), median(&mut values)?)))
        .collect();
    (readings, stamps)
}

/// Offer one aggregated observation per area to the learning gate
///
/// Returns the number of areas that were learned.
pub(crate) fn learn_from_reference_trackers(
    config: &SelectionConfig,
    devices: &BTreeMap<DeviceAddress, Device>,
    correlations: &mut BTreeMap<DeviceAddress, BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &mut BTreeMap<AreaId, RoomProfile>,
    learning: &mut AutoLearningGate,
    offline: &BTreeSet<ScannerAddress>,
    now: Timestamp,
) -> usize {
    let mut by_area: BTreeMap<&AreaId, Vec<&Device>> = BTreeMap::new();
    for device in devices.values() {
        if !device.reference_tracker || !device.tracked {
            continue;
        }
        if let Some(area) = device.area_id.as_ref() {
            by_area.entry(area).or_default().push(device);
        }
    }

    let mut learned = 0;
    for (area, trackers) in by_area {
        let (mut readings, stamps) = aggregate_readings(&trackers, now, config.evidence_window);
        let Some((primary, primary_rssi)) = readings
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(scanner, rssi)| (scanner.clone(), *rssi))
        else {
            continue;
        };
        readings.remove(&primary);

        let proxy = ReferenceProxy::new(area.clone());
        let observation = Observation {
            area_id: &proxy.area_id,
            primary_scanner: &primary,
            primary_rssi,
            other_readings: &readings,
            confidence: 1.0,
            current_stamps: &stamps,
            evidence_window: config.evidence_window,
        };
        let profiles = correlations.entry(proxy.address.clone()).or_default();
        let outcome = learning.update_device_correlations(
            LearningSubject::Reference(&proxy),
            &observation,
            profiles,
            room_profiles,
            offline,
            now,
        );
        if outcome.is_ok() {
            log_debug!("{}: learned from {} reference trackers", area, trackers.len());
            learned += 1;
        }
    }
    learned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Advert;

    fn tracker(address: &str, readings: &[(&str, f32)], stamp: f64) -> Device {
        let mut device = Device::new(address, 0.0).as_reference_tracker();
        device.area_id = Some(AreaId::from("lab"));
        for (scanner, rssi) in readings {
            let mut advert = Advert::new(*scanner);
            advert.record(*rssi, Some(2.0), stamp);
            device.insert_advert(advert);
        }
        device
    }

    #[test]
    fn median_of_odd_and_even_sets() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [-70.0, -50.0, -60.0]), Some(-60.0));
        assert_eq!(median(&mut [-70.0, -50.0]), Some(-60.0));
    }

    #[test]
    fn readings_take_median_across_trackers() {
        let a = tracker("a", &[("s1", -50.0), ("s2", -70.0)], 10.0);
        let b = tracker("b", &[("s1", -60.0)], 11.0);
        let c = tracker("c", &[("s1", -55.0)], 12.0);
        let (readings, stamps) = aggregate_readings(&[&a, &b, &c], 12.0, 30.0);
        assert_eq!(readings.get("s1"), Some(&-55.0));
        assert_eq!(readings.get("s2"), Some(&-70.0));
        assert_eq!(stamps.get("s1"), Some(&12.0));
        assert_eq!(stamps.get("s2"), Some(&10.0));
    }

    #[test]
    fn one_update_per_area_regardless_of_tracker_count() {
        let mut devices = BTreeMap::new();
        for name in ["a", "b", "c"] {
            let device = tracker(name, &[("s1", -50.0), ("s2", -70.0)], 10.0);
            devices.insert(DeviceAddress::from(name), device);
        }
        let mut correlations = BTreeMap::new();
        let mut rooms = BTreeMap::new();
        let mut gate = AutoLearningGate::new();
        let learned = learn_from_reference_trackers(
            &SelectionConfig::default(),
            &devices,
            &mut correlations,
            &mut rooms,
            &mut gate,
            &BTreeSet::new(),
            10.0,
        );
        assert_eq!(learned, 1);
        assert_eq!(gate.stats().performed, 1);
        assert!(correlations.contains_key("reference:lab"));
        assert_eq!(rooms.get("lab").map(RoomProfile::updates), Some(1));
    }
}
