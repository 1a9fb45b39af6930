//! Auto-learning quality gate
//!
//! ## Overview
//!
//! Every confirmed area decision is a potential training sample. Feeding a
//! wrong decision back into the profiles makes the next wrong decision more
//! likely, so each sample must pass, in order:
//!
//! ```text
//! 1. confidence    ≥ AUTO_LEARNING_MIN_CONFIDENCE
//! 2. initialised   observed ≥ DEVICE_INIT_PERIOD_S, and STATIONARY
//! 3. velocity      ≤ AUTO_LEARNING_MAX_VELOCITY
//! 4. rssi variance ≤ AUTO_LEARNING_MAX_RSSI_VARIANCE
//! 5. unambiguous   no other area matches within AMBIGUITY_MARGIN
//! 6. coverage      no scanner the target profile trained on is offline
//! 7. profile       AreaProfile::update accepts (interval, new data)
//!                  → RoomProfile::update with the same stamps
//! ```
//!
//! Reference trackers learn through a [`ReferenceProxy`], which is always
//! stationary, fully dwelled and motionless.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::String,
};

use crate::{
    constants::{
        learning::{
            AMBIGUITY_MARGIN, AMBIGUITY_MIN_CONFIDENCE, AUTO_LEARNING_MAX_RSSI_VARIANCE,
            AUTO_LEARNING_MAX_VELOCITY, AUTO_LEARNING_MIN_CONFIDENCE,
        },
        timing::DEVICE_INIT_PERIOD_S,
    },
    correlation::{AreaProfile, RoomProfile, ScannerStamps},
    errors::LearningSkipReason,
    model::{AreaId, Device, MovementState, ScannerAddress},
    time::{elapsed, Timestamp},
};

/// Synthetic device standing in for the reference trackers of one area
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceProxy {
    /// Area the trackers are placed in
    pub area_id: AreaId,
    /// Stable address under which the proxy's profiles are stored
    pub address: String,
}

impl ReferenceProxy {
    /// Proxy for the reference trackers in `area_id`
    pub fn new(area_id: impl Into<AreaId>) -> Self {
        let area_id = area_id.into();
        let address = format!("reference:{}", area_id);
        Self { area_id, address }
    }
}

/// Something that can be trained: a real device or a reference proxy
#[derive(Debug, Clone, Copy)]
pub enum LearningSubject<'a> {
    /// A tracked device
    Device(&'a Device),
    /// Aggregated reference trackers
    Reference(&'a ReferenceProxy),
}

impl<'a> LearningSubject<'a> {
    /// Key under which the subject's profiles and stamps are kept
    pub fn address(&self) -> &'a str {
        match self {
            Self::Device(device) => &device.address,
            Self::Reference(proxy) => &proxy.address,
        }
    }

    /// Movement state; proxies are always stationary
    pub fn get_movement_state(&self, now: Timestamp) -> MovementState {
        match self {
            Self::Device(device) => device.get_movement_state(now),
            Self::Reference(_) => MovementState::Stationary,
        }
    }

    /// Dwell time in the current area; infinite for proxies
    pub fn get_dwell_time(&self, now: Timestamp) -> f64 {
        match self {
            Self::Device(device) => device.get_dwell_time(now),
            Self::Reference(_) => f64::INFINITY,
        }
    }

    fn is_initialised(&self, now: Timestamp) -> bool {
        match self {
            Self::Device(device) => elapsed(device.first_seen, now) >= DEVICE_INIT_PERIOD_S,
            Self::Reference(_) => true,
        }
    }

    fn velocity(&self, now: Timestamp, window: f64) -> f32 {
        match self {
            Self::Device(device) => device.velocity(now, window),
            Self::Reference(_) => 0.0,
        }
    }

    fn mean_rssi_variance(&self) -> Option<f32> {
        match self {
            Self::Device(device) => device.mean_rssi_variance(),
            Self::Reference(_) => None,
        }
    }
}

/// One confirmed decision offered for learning
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    /// Confirmed area
    pub area_id: &'a str,
    /// Scanner that won the decision
    pub primary_scanner: &'a str,
    /// Its RSSI
    pub primary_rssi: f32,
    /// Every other visible scanner's RSSI
    pub other_readings: &'a BTreeMap<ScannerAddress, f32>,
    /// Decision confidence
    pub confidence: f32,
    /// Advert stamps of every reading involved
    pub current_stamps: &'a ScannerStamps,
    /// Evidence window used for velocity
    pub evidence_window: f64,
}

impl Observation<'_> {
    fn all_readings(&self) -> BTreeMap<ScannerAddress, f32> {
        let mut readings = self.other_readings.clone();
        readings.insert(ScannerAddress::from(self.primary_scanner), self.primary_rssi);
        readings
    }
}

/// Performed and skipped learning updates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningStats {
    /// Samples folded into profiles
    pub performed: u64,
    skipped: BTreeMap<LearningSkipReason, u64>,
}

impl LearningStats {
    /// Samples skipped for `reason`
    pub fn skipped(&self, reason: LearningSkipReason) -> u64 {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    /// Samples skipped for any reason
    pub fn total_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }

    fn record_skip(&mut self, reason: LearningSkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}

/// Quality gate in front of the correlation profiles
#[derive(Debug, Clone, Default)]
pub struct AutoLearningGate {
    stats: LearningStats,
    last_stamps: BTreeMap<String, BTreeMap<AreaId, ScannerStamps>>,
    last_button_stamps: BTreeMap<String, BTreeMap<AreaId, ScannerStamps>>,
}

impl AutoLearningGate {
    /// Gate with empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostic counters
    pub fn stats(&self) -> &LearningStats {
        &self.stats
    }

    /// Run the gate and, if every check passes, train the profiles
    pub fn update_device_correlations(
        &mut self,
        subject: LearningSubject<'_>,
        observation: &Observation<'_>,
        device_profiles: &mut BTreeMap<AreaId, AreaProfile>,
        room_profiles: &mut BTreeMap<AreaId, RoomProfile>,
        offline: &BTreeSet<ScannerAddress>,
        now: Timestamp,
    ) -> Result<(), LearningSkipReason> {
        let result = self.try_learn(
            subject,
            observation,
            device_profiles,
            room_profiles,
            offline,
            now,
        );
        match result {
            Ok(()) => self.stats.performed += 1,
            Err(reason) => {
                log_debug!(
                    "{}: learning for {} skipped: {}",
                    subject.address(),
                    observation.area_id,
                    reason
                );
                self.stats.record_skip(reason);
            }
        }
        result
    }

    fn try_learn(
        &mut self,
        subject: LearningSubject<'_>,
        observation: &Observation<'_>,
        device_profiles: &mut BTreeMap<AreaId, AreaProfile>,
        room_profiles: &mut BTreeMap<AreaId, RoomProfile>,
        offline: &BTreeSet<ScannerAddress>,
        now: Timestamp,
    ) -> Result<(), LearningSkipReason> {
        if !(observation.confidence >= AUTO_LEARNING_MIN_CONFIDENCE) {
            return Err(LearningSkipReason::LowConfidence);
        }
        if !subject.is_initialised(now) {
            return Err(LearningSkipReason::Initialising);
        }
        if subject.get_movement_state(now) != MovementState::Stationary {
            return Err(LearningSkipReason::NotStationary);
        }
        if subject.velocity(now, observation.evidence_window) > AUTO_LEARNING_MAX_VELOCITY {
            return Err(LearningSkipReason::HighVelocity);
        }
        if subject
            .mean_rssi_variance()
            .map_or(false, |variance| variance > AUTO_LEARNING_MAX_RSSI_VARIANCE)
        {
            return Err(LearningSkipReason::HighVariance);
        }

        let readings = observation.all_readings();
        if is_ambiguous(observation, &readings, device_profiles, room_profiles) {
            return Err(LearningSkipReason::Ambiguous);
        }

        let trained = device_profiles
            .get(observation.area_id)
            .filter(|profile| profile.is_mature())
            .map(AreaProfile::trained_scanner_addresses)
            .or_else(|| {
                room_profiles
                    .get(observation.area_id)
                    .map(RoomProfile::trained_scanner_addresses)
            })
            .unwrap_or_default();
        if trained.iter().any(|scanner| offline.contains(scanner)) {
            return Err(LearningSkipReason::PartialCoverage);
        }

        let last = self
            .last_stamps
            .get(subject.address())
            .and_then(|areas| areas.get(observation.area_id));
        device_profiles
            .entry(AreaId::from(observation.area_id))
            .or_insert_with(|| AreaProfile::new(observation.area_id))
            .try_update(
                observation.primary_rssi,
                observation.other_readings,
                observation.primary_scanner,
                now,
                last,
                observation.current_stamps,
            )?;
        room_profiles
            .entry(AreaId::from(observation.area_id))
            .or_insert_with(|| RoomProfile::new(observation.area_id))
            .update(
                observation.primary_rssi,
                observation.other_readings,
                observation.primary_scanner,
                now,
                last,
                observation.current_stamps,
            );

        self.last_stamps
            .entry(String::from(subject.address()))
            .or_default()
            .insert(
                AreaId::from(observation.area_id),
                observation.current_stamps.clone(),
            );
        Ok(())
    }

    /// Train from an explicit user request, bypassing the quality checks
    ///
    /// Returns `true` when the device profile accepted the sample.
    pub fn train_button(
        &mut self,
        subject: LearningSubject<'_>,
        observation: &Observation<'_>,
        device_profiles: &mut BTreeMap<AreaId, AreaProfile>,
        room_profiles: &mut BTreeMap<AreaId, RoomProfile>,
        now: Timestamp,
    ) -> bool {
        let last = self
            .last_button_stamps
            .get(subject.address())
            .and_then(|areas| areas.get(observation.area_id));
        let accepted = device_profiles
            .entry(AreaId::from(observation.area_id))
            .or_insert_with(|| AreaProfile::new(observation.area_id))
            .update_button(
                observation.primary_rssi,
                observation.other_readings,
                observation.primary_scanner,
                now,
                last,
                observation.current_stamps,
            );
        if !accepted {
            return false;
        }
        room_profiles
            .entry(AreaId::from(observation.area_id))
            .or_insert_with(|| RoomProfile::new(observation.area_id))
            .update_button(
                observation.primary_rssi,
                observation.other_readings,
                observation.primary_scanner,
                now,
                last,
                observation.current_stamps,
            );
        self.last_button_stamps
            .entry(String::from(subject.address()))
            .or_default()
            .insert(
                AreaId::from(observation.area_id),
                observation.current_stamps.clone(),
            );
        true
    }

    /// Count a sample that never reached the gate
    pub(crate) fn skip(&mut self, address: &str, area_id: &str, reason: LearningSkipReason) {
        log_debug!("{}: learning for {} skipped: {}", address, area_id, reason);
        self.stats.record_skip(reason);
    }

    /// Forget learning stamps for a subject, optionally for one area only
    pub fn forget(&mut self, address: &str, area_id: Option<&str>) {
        for stamps in [&mut self.last_stamps, &mut self.last_button_stamps] {
            match area_id {
                Some(area) => {
                    if let Some(areas) = stamps.get_mut(address) {
                        areas.remove(area);
                    }
                }
                None => {
                    stamps.remove(address);
                }
            }
        }
    }

    /// Forget learning stamps for an area across every subject
    pub fn forget_area(&mut self, area_id: &str) {
        for stamps in [&mut self.last_stamps, &mut self.last_button_stamps] {
            for areas in stamps.values_mut() {
                areas.remove(area_id);
            }
        }
    }
}

/// Another area explains the readings nearly as well as the target
fn is_ambiguous(
    observation: &Observation<'_>,
    readings: &BTreeMap<ScannerAddress, f32>,
    device_profiles: &BTreeMap<AreaId, AreaProfile>,
    room_profiles: &BTreeMap<AreaId, RoomProfile>,
) -> bool {
    let target = device_profiles
        .get(observation.area_id)
        .and_then(|profile| profile.get_match_score(readings))
        .or_else(|| {
            room_profiles
                .get(observation.area_id)
                .and_then(|room| room.get_match_score(readings))
        })
        .unwrap_or(observation.confidence);

    let rivals = device_profiles
        .iter()
        .filter(|(area, _)| area.as_str() != observation.area_id)
        .filter_map(|(_, profile)| profile.get_match_score(readings))
        .chain(
            room_profiles
                .iter()
                .filter(|(area, _)| area.as_str() != observation.area_id)
                .filter_map(|(_, room)| room.get_match_score(readings)),
        );

    let mut ambiguous = false;
    for rival in rivals {
        if rival >= AMBIGUITY_MIN_CONFIDENCE && rival >= target - AMBIGUITY_MARGIN {
            ambiguous = true;
            break;
        }
    }
    ambiguous
}
