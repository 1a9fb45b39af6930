//! Scanner liveness tracking
//!
//! A scanner is online while *any* device (tracked or not) has an advert
//! from it newer than the offline threshold. Using every device avoids
//! marking a scanner offline just because nobody tracked is in its room.
//!
//! ```text
//!            last_seen ≤ T_off ago              last_seen > T_off ago
//! OFFLINE ─────────────────────────► ONLINE ─────────────────────────► OFFLINE
//!                                      │
//!                                      └─ recovering for SCANNER_RECOVERY_GRACE_S
//! ```

use alloc::collections::{BTreeMap, BTreeSet};

use crate::{
    constants::timing::SCANNER_RECOVERY_GRACE_S,
    model::{Device, DeviceAddress, Scanner, ScannerAddress},
    time::{elapsed, Timestamp},
};

/// Derived liveness of one scanner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScannerOnlineStatus {
    /// Newest stamp seen from the scanner across all devices
    pub last_seen_by_any_device: Option<Timestamp>,
    /// Scanner currently counts as online
    pub is_online: bool,
    /// When the scanner last went offline
    pub went_offline_at: Option<Timestamp>,
    /// When the scanner last came back online
    pub came_online_at: Option<Timestamp>,
}

impl ScannerOnlineStatus {
    /// Scanner came back online within the recovery grace period
    ///
    /// A scanner that was online from the first observation is not
    /// recovering.
    pub fn is_recovering(&self, now: Timestamp) -> bool {
        match (self.is_online, self.went_offline_at, self.came_online_at) {
            (true, Some(_), Some(came_online)) => {
                elapsed(came_online, now) < SCANNER_RECOVERY_GRACE_S
            }
            _ => false,
        }
    }
}

/// Liveness of every known scanner
#[derive(Debug, Clone, Default)]
pub struct ScannerStatusTracker {
    statuses: BTreeMap<ScannerAddress, ScannerOnlineStatus>,
}

impl ScannerStatusTracker {
    /// No scanners known
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute liveness and return the offline addresses
    pub fn refresh(
        &mut self,
        scanners: &BTreeMap<ScannerAddress, Scanner>,
        devices: &BTreeMap<DeviceAddress, Device>,
        now: Timestamp,
        offline_after: f64,
    ) -> BTreeSet<ScannerAddress> {
        let mut newest: BTreeMap<&str, Timestamp> = BTreeMap::new();
        for device in devices.values() {
            for advert in device.adverts.values().filter(|a| a.rssi.is_some()) {
                let entry = newest
                    .entry(advert.scanner_address.as_str())
                    .or_insert(advert.stamp);
                if advert.stamp > *entry {
                    *entry = advert.stamp;
                }
            }
        }

        let mut offline = BTreeSet::new();
        for (address, scanner) in scanners {
            let from_adverts = newest.get(address.as_str()).copied();
            let last_seen = match from_adverts {
                Some(stamp) if scanner.last_seen > 0.0 => Some(stamp.max(scanner.last_seen)),
                Some(stamp) => Some(stamp),
                None if scanner.last_seen > 0.0 => Some(scanner.last_seen),
                None => None,
            };
            let online = last_seen.map_or(false, |seen| elapsed(seen, now) <= offline_after);

            let status = self
                .statuses
                .entry(address.clone())
                .or_insert(ScannerOnlineStatus {
                    last_seen_by_any_device: None,
                    is_online: online,
                    went_offline_at: None,
                    came_online_at: if online { Some(now) } else { None },
                });
            status.last_seen_by_any_device = last_seen;

            if status.is_online && !online {
                log_info!("scanner {} offline", address);
                status.went_offline_at = Some(now);
            } else if !status.is_online && online {
                log_info!("scanner {} back online", address);
                status.came_online_at = Some(now);
            }
            status.is_online = online;

            if !online {
                offline.insert(address.clone());
            }
        }
        offline
    }

    /// Status of one scanner
    pub fn get(&self, address: &str) -> Option<&ScannerOnlineStatus> {
        self.statuses.get(address)
    }

    /// Scanner known and online
    pub fn is_online(&self, address: &str) -> bool {
        self.statuses.get(address).map_or(false, |s| s.is_online)
    }

    /// Scanner inside its post-recovery grace period
    pub fn is_recovering(&self, address: &str, now: Timestamp) -> bool {
        self.statuses
            .get(address)
            .map_or(false, |s| s.is_recovering(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Advert;
    use alloc::string::String;

    fn scanners() -> BTreeMap<ScannerAddress, Scanner> {
        [
            (String::from("s1"), Scanner::new("s1", "kitchen")),
            (String::from("s2"), Scanner::new("s2", "office")),
        ]
        .into_iter()
        .collect()
    }

    fn device_seen_by(address: &str, scanner: &str, stamp: f64, tracked: bool) -> Device {
        let mut device = Device::new(address, 0.0);
        device.tracked = tracked;
        let mut advert = Advert::new(scanner);
        advert.record(-60.0, Some(2.0), stamp);
        device.insert_advert(advert);
        device
    }

    #[test]
    fn untracked_devices_keep_scanners_online() {
        let mut tracker = ScannerStatusTracker::new();
        let devices: BTreeMap<_, _> = [(
            String::from("d"),
            device_seen_by("d", "s1", 100.0, false),
        )]
        .into_iter()
        .collect();
        let offline = tracker.refresh(&scanners(), &devices, 110.0, 60.0);
        assert!(!offline.contains("s1"));
        assert!(offline.contains("s2"));
    }

    #[test]
    fn recovery_grace_after_coming_back() {
        let mut tracker = ScannerStatusTracker::new();
        let mut devices: BTreeMap<_, _> =
            [(String::from("d"), device_seen_by("d", "s1", 0.0, true))]
                .into_iter()
                .collect();

        tracker.refresh(&scanners(), &devices, 10.0, 60.0);
        assert!(tracker.is_online("s1"));
        assert!(!tracker.is_recovering("s1", 10.0));

        tracker.refresh(&scanners(), &devices, 100.0, 60.0);
        assert!(!tracker.is_online("s1"));
        assert_eq!(tracker.get("s1").unwrap().went_offline_at, Some(100.0));

        devices.insert(String::from("d"), device_seen_by("d", "s1", 150.0, true));
        tracker.refresh(&scanners(), &devices, 150.0, 60.0);
        assert!(tracker.is_online("s1"));
        assert!(tracker.is_recovering("s1", 200.0));
        assert!(!tracker.is_recovering("s1", 300.0));
    }
}
