//! Process-wide selection state
//!
//! Everything the engine remembers between cycles lives on [`Context`]:
//! devices and their area state, learned profiles, per-device filters and
//! scanner liveness. The host owns the context and drives it once per
//! cycle; there is no global state.

use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::String,
};

use crate::{
    config::SelectionConfig,
    correlation::{AreaProfile, RoomProfile, ScannerStamps},
    errors::ConfigError,
    fusion::UnscentedKalmanFilter,
    learning::{AutoLearningGate, LearningStats, LearningSubject, Observation},
    model::{AreaId, Device, DeviceAddress, Scanner, ScannerAddress, Topology},
    scanner_status::ScannerStatusTracker,
    time::{TimeSource, Timestamp},
};

/// All state of one selection engine instance
pub struct Context {
    /// Active configuration
    pub config: SelectionConfig,
    pub(crate) topology: Box<dyn Topology>,
    /// Known scanners
    pub scanners: BTreeMap<ScannerAddress, Scanner>,
    /// Known devices
    pub devices: BTreeMap<DeviceAddress, Device>,
    /// Per-device learned profiles, keyed by device (or reference proxy)
    pub correlations: BTreeMap<String, BTreeMap<AreaId, AreaProfile>>,
    /// Device-independent learned profiles
    pub room_profiles: BTreeMap<AreaId, RoomProfile>,
    /// Per-device fusion filters
    pub device_ukfs: BTreeMap<DeviceAddress, UnscentedKalmanFilter>,
    /// Scanner liveness
    pub scanner_status: ScannerStatusTracker,
    pub(crate) learning: AutoLearningGate,
}

impl Context {
    /// Empty context, after validating `config`
    pub fn new(config: SelectionConfig, topology: Box<dyn Topology>) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        Ok(Self {
            config,
            topology,
            scanners: BTreeMap::new(),
            devices: BTreeMap::new(),
            correlations: BTreeMap::new(),
            room_profiles: BTreeMap::new(),
            device_ukfs: BTreeMap::new(),
            scanner_status: ScannerStatusTracker::new(),
            learning: AutoLearningGate::new(),
        })
    }

    /// Area and floor registry
    pub fn topology(&self) -> &dyn Topology {
        self.topology.as_ref()
    }

    /// Replace the registry snapshot
    pub fn set_topology(&mut self, topology: Box<dyn Topology>) {
        self.topology = topology;
    }

    /// Register or replace a scanner
    pub fn add_scanner(&mut self, scanner: Scanner) {
        self.scanners.insert(scanner.address.clone(), scanner);
    }

    /// Register or replace a device
    pub fn add_device(&mut self, device: Device) {
        self.devices.insert(device.address.clone(), device);
    }

    /// Device by address
    pub fn device(&self, address: &str) -> Option<&Device> {
        self.devices.get(address)
    }

    /// Mutable device by address, for the advert ingestion path
    pub fn device_mut(&mut self, address: &str) -> Option<&mut Device> {
        self.devices.get_mut(address)
    }

    /// Learning counters
    pub fn learning_stats(&self) -> &LearningStats {
        self.learning.stats()
    }

    /// Run one selection cycle at the time reported by `clock`
    pub fn run_cycle(&mut self, clock: &dyn TimeSource) -> Timestamp {
        let now = clock.now();
        self.refresh_areas(now);
        now
    }

    /// Pin a device to an area, or release the pin with `None`
    pub fn set_area_lock(&mut self, device: &str, area_id: Option<&str>) -> bool {
        match self.devices.get_mut(device) {
            Some(device) => {
                device.area_locked_id = area_id.map(AreaId::from);
                true
            }
            None => false,
        }
    }

    /// Train `area_id` from the device's current readings
    ///
    /// The strongest fresh reading is the primary scanner. Returns `true`
    /// when the sample was accepted.
    pub fn train_button(&mut self, device: &str, area_id: &str, now: Timestamp) -> bool {
        let Some(device) = self.devices.get(device) else {
            return false;
        };
        let (readings, stamps) =
            crate::area_selection::visible_readings(device, now, self.config.evidence_window);
        let Some((primary, primary_rssi)) = readings
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(scanner, rssi)| (scanner.clone(), *rssi))
        else {
            return false;
        };
        let mut others = readings;
        others.remove(&primary);
        let current_stamps: ScannerStamps = stamps;

        let observation = Observation {
            area_id,
            primary_scanner: &primary,
            primary_rssi,
            other_readings: &others,
            confidence: 1.0,
            current_stamps: &current_stamps,
            evidence_window: self.config.evidence_window,
        };
        let profiles = self.correlations.entry(device.address.clone()).or_default();
        let accepted = self.learning.train_button(
            LearningSubject::Device(device),
            &observation,
            profiles,
            &mut self.room_profiles,
            now,
        );
        if accepted {
            log_info!("{}: button training accepted for {}", device.address, area_id);
        }
        accepted
    }

    /// Clear a device's learned profiles, for one area or all of them
    pub fn reset_training(&mut self, device: &str, area_id: Option<&str>) {
        match area_id {
            Some(area) => {
                if let Some(profiles) = self.correlations.get_mut(device) {
                    profiles.remove(area);
                }
            }
            None => {
                self.correlations.remove(device);
            }
        }
        self.learning.forget(device, area_id);
        log_info!("{}: training reset ({:?})", device, area_id);
    }

    /// Clear the device-independent profile of an area
    pub fn reset_room(&mut self, area_id: &str) {
        self.room_profiles.remove(area_id);
        self.learning.forget_area(area_id);
        log_info!("room profile for {} reset", area_id);
    }
}
