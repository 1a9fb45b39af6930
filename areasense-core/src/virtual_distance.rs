//! Virtual distance for scannerless rooms
//!
//! A room without its own scanner can never produce a measured distance.
//! Once it has a button-trained fingerprint, its UKF match score is turned
//! into a synthetic distance so it can enter the min-distance tournament:
//!
//! ```text
//! d_virtual = R_max · SCALE · (1 − clamp(score, S_min, 1))²
//!
//! score 1.0  → 0 m        (perfect match beats any real scanner)
//! score 0.5  → 0.175·R_max
//! score ≤ S_min → ≈ 0.63·R_max
//! ```

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use crate::{
    constants::ukf::{VIRTUAL_DISTANCE_MIN_SCORE, VIRTUAL_DISTANCE_SCALE},
    correlation::{AreaProfile, RoomProfile},
    fusion::FingerprintMatch,
    model::{AreaId, Scanner, ScannerAddress, Topology},
};

/// Synthetic distance (m) for a scannerless room with match `score`
pub fn virtual_distance(max_radius: f32, score: f32) -> f32 {
    let score = if score.is_finite() { score } else { 0.0 };
    let gap = 1.0 - score.clamp(VIRTUAL_DISTANCE_MIN_SCORE, 1.0);
    max_radius * VIRTUAL_DISTANCE_SCALE * gap * gap
}

/// Known areas that no physical scanner is assigned to
pub fn scannerless_areas(
    topology: &dyn Topology,
    scanners: &BTreeMap<ScannerAddress, Scanner>,
) -> BTreeSet<AreaId> {
    let covered: BTreeSet<&str> = scanners
        .values()
        .filter_map(|scanner| scanner.area_id.as_deref())
        .collect();
    topology
        .areas()
        .into_iter()
        .filter(|area| !covered.contains(area.as_str()))
        .collect()
}

/// A scannerless room entering the tournament
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualCandidate {
    /// Scannerless area
    pub area_id: AreaId,
    /// Synthetic distance (m)
    pub distance: f32,
    /// UKF match score it was derived from
    pub score: f32,
}

/// Virtual candidates for every button-trained scannerless room
pub fn virtual_candidates(
    matches: &[FingerprintMatch],
    scannerless: &BTreeSet<AreaId>,
    device_profiles: Option<&BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &BTreeMap<AreaId, RoomProfile>,
    max_radius: f32,
) -> Vec<VirtualCandidate> {
    matches
        .iter()
        .filter(|m| scannerless.contains(&m.area_id))
        .filter(|m| {
            let device_trained = device_profiles
                .and_then(|profiles| profiles.get(&m.area_id))
                .map_or(false, AreaProfile::has_button_training);
            let room_trained = room_profiles
                .get(&m.area_id)
                .map_or(false, RoomProfile::has_button_training);
            device_trained || room_trained
        })
        .map(|m| VirtualCandidate {
            area_id: m.area_id.clone(),
            distance: virtual_distance(max_radius, m.score),
            score: m.score,
        })
        .collect()
}
