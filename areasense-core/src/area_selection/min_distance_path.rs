//! Min-distance decision path
//!
//! Runs the tournament, then the same streak hysteresis as the UKF path.
//! A challenger whose confidence trails the incumbent's by more than
//! `LOW_CONFIDENCE_STREAK_GAP` needs twice the usual streak.

use alloc::{collections::BTreeMap, vec::Vec};

use crate::{
    confidence::{weighted_z_scores_to_confidence, DEFAULT_Z_THRESHOLD},
    constants::selection::{LOW_CONFIDENCE_STREAK_GAP, MIN_DISTANCE_BASE_CONFIDENCE},
    correlation::{AreaProfile, Fingerprint, RoomProfile},
    diagnostics::AreaTests,
    fusion::FingerprintMatch,
    min_distance::{Contender, Tournament},
    model::{AreaId, Device, ScannerAddress},
    virtual_distance::{virtual_candidates, VirtualCandidate},
};

use super::{hysteresis, Confirmed, Cycle};

/// Mature fingerprint for `area`: the device's own, else the room's
fn fingerprint_for<'p>(
    area: &str,
    device_profiles: Option<&'p BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &'p BTreeMap<AreaId, RoomProfile>,
) -> Option<&'p Fingerprint> {
    device_profiles
        .and_then(|profiles| profiles.get(area))
        .filter(|profile| profile.is_mature())
        .map(AreaProfile::fingerprint)
        .or_else(|| {
            room_profiles
                .get(area)
                .filter(|room| room.is_mature())
                .map(RoomProfile::fingerprint)
        })
}

/// Confidence that the readings place the device in the current area
///
/// `None` without a mature profile or overlapping scanners.
pub(crate) fn rescue_confidence(
    device: &Device,
    readings: &BTreeMap<ScannerAddress, f32>,
    device_profiles: Option<&BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &BTreeMap<AreaId, RoomProfile>,
) -> Option<f32> {
    let area = device.area_id.as_deref()?;
    let fingerprint = fingerprint_for(area, device_profiles, room_profiles)?;
    let scores: Vec<(f32, u32)> = fingerprint
        .absolute_z_scores(readings)
        .into_iter()
        .map(|score| (score.z, score.samples))
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(weighted_z_scores_to_confidence(&scores, DEFAULT_Z_THRESHOLD))
}

/// Confidence in a contender: fingerprint match (co-visibility × z-score
/// confidence) when a profile exists, otherwise a distance-scaled default
pub(crate) fn contender_confidence(
    contender: &Contender,
    readings: &BTreeMap<ScannerAddress, f32>,
    device_profiles: Option<&BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &BTreeMap<AreaId, RoomProfile>,
    virtuals: &[VirtualCandidate],
    max_radius: f32,
) -> f32 {
    if contender.scannerless {
        return virtuals
            .iter()
            .find(|candidate| candidate.area_id == contender.area_id)
            .map_or(0.0, |candidate| candidate.score);
    }
    if let Some(score) = fingerprint_for(&contender.area_id, device_profiles, room_profiles)
        .and_then(|fingerprint| fingerprint.match_score(readings))
    {
        return score;
    }
    let relative = match contender.distance {
        Some(distance) if max_radius > 0.0 => (distance / max_radius).clamp(0.0, 1.0),
        _ => 1.0,
    };
    MIN_DISTANCE_BASE_CONFIDENCE * (1.0 - 0.5 * relative)
}

/// Run the tournament and apply its result
pub(crate) fn run(
    cycle: &Cycle<'_>,
    device: &mut Device,
    readings: &BTreeMap<ScannerAddress, f32>,
    matches: &[FingerprintMatch],
    device_profiles: Option<&BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &BTreeMap<AreaId, RoomProfile>,
    tests: &mut AreaTests,
) -> Option<Confirmed> {
    let radius = cycle.config.max_area_radius;
    let virtuals = virtual_candidates(
        matches,
        cycle.scannerless,
        device_profiles,
        room_profiles,
        radius,
    );
    let result = Tournament {
        device: &*device,
        scanners: cycle.scanners,
        topology: cycle.topology,
        config: cycle.config,
        virtual_candidates: &virtuals,
        rescue_confidence: rescue_confidence(device, readings, device_profiles, room_profiles),
        now: cycle.now,
    }
    .run();

    tests.path = result.path;
    tests.incumbent_distance = result.incumbent.as_ref().and_then(|i| i.distance);
    for note in result.notes.iter().copied() {
        tests.note(note);
    }

    let Some(winner) = result.winner.as_ref() else {
        if device.area_id.is_some() {
            log_debug!("{}: nothing within radius, clearing area", device.address);
        }
        device.apply_scanner_selection(None, cycle.now);
        device.update_area_and_floor(None, cycle.topology, cycle.now);
        device.clear_pending();
        return None;
    };

    tests.challenger_area = Some(winner.area_id.clone());
    tests.challenger_distance = winner.distance;
    let same_floor = hysteresis::is_same_floor(device.floor_id.as_ref(), winner.floor_id.as_ref());
    tests.same_floor = Some(same_floor);

    let confidence = contender_confidence(
        winner,
        readings,
        device_profiles,
        room_profiles,
        &virtuals,
        radius,
    );
    let mut target = hysteresis::streak_target(cycle.config, same_floor);
    if device.area_id.as_deref() != Some(winner.area_id.as_str()) {
        if let Some(incumbent) = result.incumbent.as_ref() {
            let incumbent_confidence = contender_confidence(
                incumbent,
                readings,
                device_profiles,
                room_profiles,
                &virtuals,
                radius,
            );
            if confidence < incumbent_confidence - LOW_CONFIDENCE_STREAK_GAP {
                target = target.saturating_mul(2);
                tests.note("low-confidence challenger");
            }
        }
    }

    // Floor changes keep their streak even when the incumbent was dropped.
    let immediate = result.incumbent_out_of_radius && same_floor;
    let selection = winner.selection();
    let confirmed = hysteresis::decide(
        cycle,
        device,
        &winner.area_id,
        &selection,
        target,
        immediate,
        tests,
    );
    confirmed.then(|| Confirmed {
        scanner_address: winner.scanner_address.clone(),
        confidence,
        scannerless: winner.scannerless,
    })
}
