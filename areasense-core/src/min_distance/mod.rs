//! Min-distance tournament with cross-floor protection
//!
//! ## Overview
//!
//! The device's current winning advert (the *incumbent*) defends its area
//! against every other fresh advert (*challengers*). Challengers are visited
//! nearest first; each one that beats the current best becomes the new best.
//!
//! ```text
//! incumbent ──► within radius? ──no──► dropped, nearest challenger bootstraps
//!                    │                  (cross-floor ones still need history)
//!                    │
//!                   yes
//!                    ▼
//! for challenger in nearest-first:
//!     same area          → follow the closer scanner
//!     soft incumbent     → profile rescue, else cross-floor history check
//!     cross floor        → history on both sides + percentage margin
//!     rssi priority      → ≥8 dB stronger and within 15% distance wins
//!     distance           → stability margin (near/far field)
//!     rssi veto          → incumbent ≥10 dB stronger blocks the win
//! ```
//!
//! ## Fallbacks
//!
//! When neither an incumbent nor a distance challenger is usable:
//!
//! 1. Any within-radius advert still younger than `AREA_MAX_AD_AGE_S`,
//!    strongest RSSI first, newest stamp breaking ties
//! 2. RSSI-only: the strongest fresh advert above `RSSI_FALLBACK_MIN_DBM`
//! 3. Nothing: the selection is cleared

pub mod contender;
pub mod margins;

pub use contender::Contender;
pub use margins::{
    beats_by_distance, cross_floor_margin, percentage_difference, stability_margin,
    FloorWitnesses,
};

use alloc::{collections::BTreeMap, vec::Vec};
use core::cmp::Ordering;

use heapless::Vec as HVec;

use crate::{
    config::SelectionConfig,
    constants::{
        selection::{
            CROSS_FLOOR_MIN_HISTORY, RESCUE_MIN_CONFIDENCE, RSSI_FALLBACK_MIN_DBM,
            RSSI_PRIORITY_ADVANTAGE_DB, RSSI_PRIORITY_DISTANCE_TOLERANCE, RSSI_VETO_DB,
        },
        timing::AREA_MAX_AD_AGE_S,
    },
    diagnostics::{DecisionPath, MAX_REASONS},
    model::{Advert, Device, MovementState, Scanner, ScannerAddress, Topology},
    time::{elapsed, Timestamp},
    virtual_distance::VirtualCandidate,
};

/// Everything one device's tournament reads
pub struct Tournament<'a> {
    /// Device being placed
    pub device: &'a Device,
    /// Known scanners
    pub scanners: &'a BTreeMap<ScannerAddress, Scanner>,
    /// Area and floor registry
    pub topology: &'a dyn Topology,
    /// Current configuration
    pub config: &'a SelectionConfig,
    /// Scannerless rooms competing with virtual distances
    pub virtual_candidates: &'a [VirtualCandidate],
    /// Absolute-profile confidence for the current area
    pub rescue_confidence: Option<f32>,
    /// Cycle time
    pub now: Timestamp,
}

/// Result of one tournament
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentResult {
    /// Incumbent as seen at the start
    pub incumbent: Option<Contender>,
    /// Winning contender, `None` when the selection should be cleared
    pub winner: Option<Contender>,
    /// Path that produced the winner
    pub path: DecisionPath,
    /// Incumbent existed but was outside the radius
    pub incumbent_out_of_radius: bool,
    /// What happened, oldest first
    pub notes: HVec<&'static str, MAX_REASONS>,
}

impl TournamentResult {
    fn note(&mut self, reason: &'static str) {
        let _ = self.notes.push(reason);
    }

    /// Winner is in a different area than the incumbent
    pub fn is_switch(&self) -> bool {
        match (&self.incumbent, &self.winner) {
            (Some(incumbent), Some(winner)) => incumbent.area_id != winner.area_id,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

fn nearest_first(a: &Contender, b: &Contender) -> Ordering {
    let da = a.distance.unwrap_or(f32::INFINITY);
    let db = b.distance.unwrap_or(f32::INFINITY);
    da.total_cmp(&db).then_with(|| {
        let ra = a.rssi.unwrap_or(f32::NEG_INFINITY);
        let rb = b.rssi.unwrap_or(f32::NEG_INFINITY);
        rb.total_cmp(&ra)
    })
}

fn strongest_first(a: &Contender, b: &Contender) -> Ordering {
    let ra = a.rssi.unwrap_or(f32::NEG_INFINITY);
    let rb = b.rssi.unwrap_or(f32::NEG_INFINITY);
    rb.total_cmp(&ra).then_with(|| b.stamp.total_cmp(&a.stamp))
}

impl<'a> Tournament<'a> {
    /// Run the tournament
    pub fn run(&self) -> TournamentResult {
        let radius = self.config.max_area_radius;
        let incumbent = Contender::incumbent(
            self.device,
            self.scanners,
            self.topology,
            self.virtual_candidates,
            self.now,
            self.config.evidence_window,
        );
        let mut result = TournamentResult {
            incumbent: incumbent.clone(),
            winner: None,
            path: DecisionPath::MinDistance,
            incumbent_out_of_radius: false,
            notes: HVec::new(),
        };

        let (mut best, dropped) = match incumbent {
            Some(incumbent) if incumbent.within_radius(radius) => (Some(incumbent), None),
            Some(incumbent) => {
                result.incumbent_out_of_radius = true;
                result.note("incumbent out of radius");
                (None, Some(incumbent))
            }
            None => (None, None),
        };

        let witnesses = self.witnesses();
        let movement = self.device.get_movement_state(self.now);
        let mut challengers = self.challengers(best.as_ref(), &mut result);
        challengers.sort_by(nearest_first);

        for challenger in challengers {
            let replace = match &best {
                // A dropped incumbent still guards its floor against short histories.
                None => match &dropped {
                    Some(held)
                        if held.is_cross_floor(&challenger)
                            && challenger.hist_len < CROSS_FLOOR_MIN_HISTORY =>
                    {
                        result.note("cross-floor: challenger history short");
                        false
                    }
                    _ => true,
                },
                Some(current) => {
                    self.challenger_wins(current, &challenger, &witnesses, movement, &mut result)
                }
            };
            if replace {
                best = Some(challenger);
            }
        }

        if best.is_some() {
            result.winner = best;
            return result;
        }

        result.path = DecisionPath::Fallback;
        if let Some(winner) = self.fallback_within_radius() {
            result.note("fallback: within radius");
            result.winner = Some(winner);
        } else if let Some(winner) = self.fallback_rssi_only() {
            result.note("fallback: rssi only");
            result.winner = Some(winner);
        } else {
            result.path = DecisionPath::Cleared;
            result.note("nothing within radius");
        }
        result
    }

    fn contender_for(&self, advert: &Advert) -> Option<Contender> {
        Contender::from_advert(
            advert,
            self.scanners.get(&advert.scanner_address),
            self.topology,
            self.now,
        )
    }

    /// Fresh, known, within-radius challengers plus virtual rooms
    fn challengers(
        &self,
        incumbent: Option<&Contender>,
        result: &mut TournamentResult,
    ) -> Vec<Contender> {
        let radius = self.config.max_area_radius;
        let window = self.config.evidence_window;
        let mut challengers = Vec::new();

        for advert in self.device.fresh_adverts(self.now, window) {
            if incumbent.map_or(false, |i| {
                !i.scannerless && i.scanner_address == advert.scanner_address
            }) {
                continue;
            }
            let Some(contender) = self.contender_for(advert) else {
                result.note("challenger without scanner metadata");
                continue;
            };
            match contender.distance {
                Some(distance) if distance <= radius => challengers.push(contender),
                _ => {}
            }
        }

        if let Some(backing) = self
            .device
            .fresh_adverts(self.now, window)
            .max_by(|a, b| {
                a.rssi
                    .unwrap_or(f32::NEG_INFINITY)
                    .total_cmp(&b.rssi.unwrap_or(f32::NEG_INFINITY))
            })
        {
            for candidate in self.virtual_candidates {
                if incumbent.map_or(false, |i| i.scannerless && i.area_id == candidate.area_id) {
                    continue;
                }
                if candidate.distance <= radius {
                    challengers.push(Contender::from_virtual(candidate, backing, self.topology));
                }
            }
        }
        challengers
    }

    /// Scanners per floor that currently hear the device within radius
    fn witnesses(&self) -> FloorWitnesses {
        let radius = self.config.max_area_radius;
        let mut witnesses = FloorWitnesses::new();
        for advert in self.device.fresh_adverts(self.now, self.config.evidence_window) {
            if !advert.rssi_distance.map_or(false, |d| d <= radius) {
                continue;
            }
            if let Some(contender) = self.contender_for(advert) {
                if let Some(floor) = contender.floor_id.as_deref() {
                    witnesses.add(floor, contender.floor_level);
                }
            }
        }
        witnesses
    }

    fn challenger_wins(
        &self,
        current: &Contender,
        challenger: &Contender,
        witnesses: &FloorWitnesses,
        movement: MovementState,
        result: &mut TournamentResult,
    ) -> bool {
        if challenger.area_id == current.area_id {
            return match (current.distance, challenger.distance) {
                (Some(held), Some(offered)) => offered < held,
                (None, Some(_)) => true,
                _ => false,
            };
        }

        let cross_floor = current.is_cross_floor(challenger);

        if current.is_soft() {
            if self
                .rescue_confidence
                .map_or(false, |confidence| confidence >= RESCUE_MIN_CONFIDENCE)
            {
                result.note("soft incumbent rescued by profile");
                return false;
            }
            if cross_floor && challenger.hist_len < CROSS_FLOOR_MIN_HISTORY {
                result.note("cross-floor: challenger history short");
                return false;
            }
            return true;
        }

        let (Some(held), Some(offered)) = (current.distance, challenger.distance) else {
            return false;
        };

        if cross_floor && !self.cross_floor_allows(current, challenger, witnesses, result) {
            return false;
        }

        let rssi_gap = match (current.rssi, challenger.rssi) {
            (Some(held_rssi), Some(offered_rssi)) => Some(offered_rssi - held_rssi),
            _ => None,
        };

        if self.config.rssi_priority {
            if let Some(gap) = rssi_gap {
                if gap >= RSSI_PRIORITY_ADVANTAGE_DB
                    && offered <= held * (1.0 + RSSI_PRIORITY_DISTANCE_TOLERANCE)
                {
                    result.note("rssi priority");
                    return true;
                }
            }
        }

        let margin = stability_margin(movement, current, challenger);
        if !beats_by_distance(held, offered, margin) {
            return false;
        }

        if self.config.rssi_priority && rssi_gap.map_or(false, |gap| -gap >= RSSI_VETO_DB) {
            result.note("rssi veto");
            return false;
        }
        true
    }

    fn cross_floor_allows(
        &self,
        current: &Contender,
        challenger: &Contender,
        witnesses: &FloorWitnesses,
        result: &mut TournamentResult,
    ) -> bool {
        if current.hist_len < CROSS_FLOOR_MIN_HISTORY || challenger.hist_len < CROSS_FLOOR_MIN_HISTORY
        {
            result.note("cross-floor: history short");
            return false;
        }
        let (Some(held), Some(offered)) = (current.hist_avg, challenger.hist_avg) else {
            return false;
        };
        if offered >= held {
            return false;
        }
        let required = cross_floor_margin(current, challenger, witnesses);
        if percentage_difference(held, offered) < required {
            result.note("cross-floor: margin not met");
            return false;
        }
        true
    }

    /// Strongest within-radius advert not older than `AREA_MAX_AD_AGE_S`
    fn fallback_within_radius(&self) -> Option<Contender> {
        let radius = self.config.max_area_radius;
        self.device
            .adverts
            .values()
            .filter(|advert| advert.rssi.is_some())
            .filter(|advert| elapsed(advert.stamp, self.now) <= AREA_MAX_AD_AGE_S)
            .filter(|advert| advert.rssi_distance.map_or(false, |d| d <= radius))
            .filter_map(|advert| self.contender_for(advert))
            .min_by(strongest_first)
    }

    /// Strongest fresh advert above the RSSI floor, distance ignored
    fn fallback_rssi_only(&self) -> Option<Contender> {
        self.device
            .fresh_adverts(self.now, self.config.evidence_window)
            .filter(|advert| advert.rssi.map_or(false, |rssi| rssi >= RSSI_FALLBACK_MIN_DBM))
            .filter_map(|advert| self.contender_for(advert))
            .map(|mut contender| {
                contender.distance = None;
                contender
            })
            .min_by(strongest_first)
    }
}
