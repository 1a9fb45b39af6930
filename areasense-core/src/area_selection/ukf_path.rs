//! Fingerprint-match decision path
//!
//! ```text
//! visible < UKF_MIN_SCANNERS ──► lone-scanner retention? ──no──► TooFewScanners
//!          │                              │
//!          │                             yes ─► keep current area
//!          ▼
//! best = argmax(score + stickiness if current)
//! best < threshold (retention if current, else normal) ──► BelowThreshold
//! scannerless winner   ──► topological check
//! scanner-backed winner ─► RSSI sanity, proximity veto
//! ```

use alloc::collections::BTreeMap;

use crate::{
    confidence::{z_scores_to_confidence, DEFAULT_Z_THRESHOLD},
    constants::ukf::{
        UKF_HIGH_CONFIDENCE_SCORE, UKF_MIN_MATCH_SCORE, UKF_MIN_SCANNERS,
        UKF_PROXIMITY_OVERRIDE_SCORE, UKF_PROXIMITY_VETO_M, UKF_RETENTION_SIGMA,
        UKF_RETENTION_THRESHOLD, UKF_RSSI_SANITY_DB, UKF_STICKINESS_BONUS,
    },
    correlation::{AreaProfile, RoomProfile},
    diagnostics::{AreaTests, DecisionPath},
    errors::UkfRejection,
    fusion::FingerprintMatch,
    model::{Advert, AreaId, AreaSelection, Device, ScannerAddress},
    virtual_distance::virtual_distance,
};

use super::{hysteresis, Confirmed, Cycle};

/// An accepted UKF decision, before hysteresis
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UkfDecision {
    pub area_id: AreaId,
    pub score: f32,
    pub selection: AreaSelection,
    pub retention: bool,
}

fn rssi_of(advert: &Advert) -> f32 {
    advert.rssi.unwrap_or(f32::NEG_INFINITY)
}

/// Decide from the fingerprint matches, or say why not
pub(crate) fn evaluate(
    cycle: &Cycle<'_>,
    device: &Device,
    readings: &BTreeMap<ScannerAddress, f32>,
    matches: &[FingerprintMatch],
    device_profiles: Option<&BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &BTreeMap<AreaId, RoomProfile>,
) -> Result<UkfDecision, UkfRejection> {
    if !cycle.config.use_ukf {
        return Err(UkfRejection::Disabled);
    }
    if readings.len() < UKF_MIN_SCANNERS {
        return retention(cycle, device, readings, device_profiles, room_profiles);
    }

    let current = device.area_id.as_deref();
    let adjusted = |m: &FingerprintMatch| {
        if Some(m.area_id.as_str()) == current {
            m.score + UKF_STICKINESS_BONUS
        } else {
            m.score
        }
    };
    let best = matches
        .iter()
        .fold(None::<(&FingerprintMatch, f32)>, |best, m| {
            let score = adjusted(m);
            match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((m, score)),
            }
        })
        .ok_or(UkfRejection::NoCandidates)?;
    let (winner, score) = best;

    let threshold = if Some(winner.area_id.as_str()) == current {
        UKF_RETENTION_THRESHOLD
    } else {
        UKF_MIN_MATCH_SCORE
    };
    if score < threshold {
        return Err(UkfRejection::BelowThreshold { score, threshold });
    }

    let fresh: alloc::vec::Vec<&Advert> = device
        .fresh_adverts(cycle.now, cycle.config.evidence_window)
        .collect();
    let scanner_area = |advert: &Advert| {
        cycle
            .scanners
            .get(&advert.scanner_address)
            .and_then(|scanner| scanner.area_id.as_deref())
    };
    let scanner_floor = |advert: &Advert| {
        cycle
            .scanners
            .get(&advert.scanner_address)
            .and_then(|scanner| scanner.floor_id.clone())
            .or_else(|| scanner_area(advert).and_then(|area| cycle.topology.floor_of(area)))
    };
    let winner_floor = cycle.topology.floor_of(&winner.area_id);

    if cycle.scannerless.contains(&winner.area_id) {
        let backing = fresh
            .iter()
            .filter(|advert| match (&winner_floor, scanner_floor(advert)) {
                (Some(target), Some(floor)) => *target == floor,
                (None, _) => true,
                (Some(_), None) => false,
            })
            .max_by(|a, b| rssi_of(a).total_cmp(&rssi_of(b)))
            .ok_or(UkfRejection::Topological)?;
        return Ok(UkfDecision {
            area_id: winner.area_id.clone(),
            score: winner.score,
            selection: AreaSelection::scannerless(
                backing,
                winner.area_id.clone(),
                Some(virtual_distance(cycle.config.max_area_radius, winner.score)),
            ),
            retention: false,
        });
    }

    let area_best = fresh
        .iter()
        .filter(|advert| scanner_area(advert) == Some(winner.area_id.as_str()))
        .max_by(|a, b| rssi_of(a).total_cmp(&rssi_of(b)))
        .ok_or(UkfRejection::Topological)?;

    if winner.score < UKF_HIGH_CONFIDENCE_SCORE {
        let strongest = fresh.iter().map(|a| rssi_of(a)).fold(f32::NEG_INFINITY, f32::max);
        let deficit_db = strongest - rssi_of(area_best);
        if deficit_db > UKF_RSSI_SANITY_DB {
            return Err(UkfRejection::RssiSanity { deficit_db });
        }
    }

    for advert in &fresh {
        let Some(distance) = advert.rssi_distance else {
            continue;
        };
        if distance >= UKF_PROXIMITY_VETO_M {
            continue;
        }
        let Some(area) = scanner_area(advert) else {
            continue;
        };
        if area == winner.area_id {
            continue;
        }
        let cross_floor = match (&winner_floor, scanner_floor(advert)) {
            (Some(target), Some(floor)) => *target != floor,
            _ => false,
        };
        if cross_floor || winner.score < UKF_PROXIMITY_OVERRIDE_SCORE {
            return Err(UkfRejection::ProximityVeto {
                distance,
                cross_floor,
            });
        }
    }

    Ok(UkfDecision {
        area_id: winner.area_id.clone(),
        score: winner.score,
        selection: AreaSelection::from_advert(area_best),
        retention: false,
    })
}

/// Keep the current area on a single reading that matches its fingerprint
fn retention(
    cycle: &Cycle<'_>,
    device: &Device,
    readings: &BTreeMap<ScannerAddress, f32>,
    device_profiles: Option<&BTreeMap<AreaId, AreaProfile>>,
    room_profiles: &BTreeMap<AreaId, RoomProfile>,
) -> Result<UkfDecision, UkfRejection> {
    let too_few = UkfRejection::TooFewScanners {
        visible: readings.len(),
        required: UKF_MIN_SCANNERS,
    };
    let (Some(current), Some((scanner, rssi))) = (device.area_id.as_ref(), readings.iter().next())
    else {
        return Err(too_few);
    };
    if readings.len() != 1 || cycle.scanner_status.is_recovering(scanner, cycle.now) {
        return Err(too_few);
    }

    let expected = device_profiles
        .and_then(|profiles| profiles.get(current))
        .and_then(|profile| profile.expected_rssi(scanner))
        .or_else(|| {
            room_profiles
                .get(current)
                .and_then(|room| room.expected_rssi(scanner))
        });
    let Some((mean, sigma)) = expected else {
        return Err(too_few);
    };
    let z = libm::fabsf(rssi - mean) / sigma.max(f32::EPSILON);
    if z > UKF_RETENTION_SIGMA {
        return Err(too_few);
    }
    let Some(advert) = device.adverts.get(scanner) else {
        return Err(too_few);
    };

    let in_area = cycle
        .scanners
        .get(scanner)
        .and_then(|s| s.area_id.as_ref())
        .map_or(false, |area| area == current);
    let selection = AreaSelection {
        scanner_address: scanner.clone(),
        area_id: Some(current.clone()),
        distance: if in_area {
            advert.rssi_distance
        } else {
            device.area_distance
        },
        rssi: advert.rssi,
        // A foreign scanner must not become the incumbent's area.
        scannerless: !in_area || cycle.scannerless.contains(current),
    };
    Ok(UkfDecision {
        area_id: current.clone(),
        score: z_scores_to_confidence(&[z], DEFAULT_Z_THRESHOLD),
        selection,
        retention: true,
    })
}

/// Apply an accepted decision through hysteresis
pub(crate) fn apply(
    cycle: &Cycle<'_>,
    device: &mut Device,
    decision: UkfDecision,
    tests: &mut AreaTests,
) -> Option<Confirmed> {
    tests.path = if decision.retention {
        DecisionPath::UkfRetention
    } else {
        DecisionPath::Ukf
    };
    tests.challenger_area = Some(decision.area_id.clone());
    tests.challenger_distance = decision.selection.distance;
    tests.incumbent_distance = device.area_distance;
    tests.ukf_score = Some(decision.score);

    let floor = cycle.topology.floor_of(&decision.area_id);
    let same_floor = hysteresis::is_same_floor(device.floor_id.as_ref(), floor.as_ref());
    tests.same_floor = Some(same_floor);
    let target = hysteresis::streak_target(cycle.config, same_floor);

    let confirmed = hysteresis::decide(
        cycle,
        device,
        &decision.area_id,
        &decision.selection,
        target,
        false,
        tests,
    );
    confirmed.then(|| Confirmed {
        scanner_address: decision.selection.scanner_address.clone(),
        confidence: decision.score,
        scannerless: decision.selection.scannerless,
    })
}
