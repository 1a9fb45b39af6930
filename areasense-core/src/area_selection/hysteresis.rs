//! Streak-based hysteresis
//!
//! A challenger area must be preferred for several consecutive cycles
//! before it replaces the confirmed area. Cycles only count when some
//! advert carries a stamp newer than the last counted one, so re-reading
//! cached RSSI cannot fake a streak.

use crate::{
    config::SelectionConfig,
    diagnostics::AreaTests,
    model::{AreaSelection, Device, FloorId},
};

use super::Cycle;

/// Whether a pending switch commits this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Streak reached its target
    Commit,
    /// Still counting
    Pending,
}

/// Unknown floors count as the same floor
pub(crate) fn is_same_floor(current: Option<&FloorId>, candidate: Option<&FloorId>) -> bool {
    match (current, candidate) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Consecutive cycles required for a switch
pub(crate) fn streak_target(config: &SelectionConfig, same_floor: bool) -> u32 {
    if same_floor {
        config.same_floor_streak
    } else {
        config.cross_floor_streak
    }
}

/// Count one more cycle for `area`, restarting when the challenger changed
pub(crate) fn advance(device: &mut Device, area: &str, floor: Option<FloorId>, target: u32) -> Step {
    let newest = device.newest_stamp();
    if device.pending_area_id.as_deref() != Some(area) {
        device.pending_area_id = Some(area.into());
        device.pending_floor_id = floor;
        device.pending_streak = 1;
        device.pending_last_stamp = newest;
    } else {
        let fresh = match (newest, device.pending_last_stamp) {
            (Some(newest), Some(last)) => newest > last,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if fresh {
            device.pending_streak = device.pending_streak.saturating_add(1);
            device.pending_last_stamp = newest;
        }
    }
    if device.pending_streak >= target {
        Step::Commit
    } else {
        Step::Pending
    }
}

/// Apply `selection` for `area` subject to hysteresis
///
/// Returns `true` when the device ends the cycle confirmed in `area`.
/// Switches commit immediately when the device has no area or when
/// `immediate` is set.
pub(crate) fn decide(
    cycle: &Cycle<'_>,
    device: &mut Device,
    area: &str,
    selection: &AreaSelection,
    target: u32,
    immediate: bool,
    tests: &mut AreaTests,
) -> bool {
    let floor = cycle.topology.floor_of(area);
    tests.streak_target = target;

    if device.area_id.as_deref() == Some(area) {
        device.apply_scanner_selection(Some(selection), cycle.now);
        device.clear_pending();
        tests.note("held");
        return true;
    }

    if device.area_id.is_none() || immediate {
        commit(cycle, device, area, selection);
        tests.note(if immediate { "switched: incumbent invalid" } else { "bootstrap" });
        return true;
    }

    match advance(device, area, floor, target) {
        Step::Commit => {
            tests.streak = device.pending_streak;
            commit(cycle, device, area, selection);
            tests.note("switched");
            true
        }
        Step::Pending => {
            tests.streak = device.pending_streak;
            tests.note("pending");
            false
        }
    }
}

fn commit(cycle: &Cycle<'_>, device: &mut Device, area: &str, selection: &AreaSelection) {
    log_debug!(
        "{}: switching to {} via {}",
        device.address,
        area,
        selection.scanner_address
    );
    device.apply_scanner_selection(Some(selection), cycle.now);
    device.update_area_and_floor(Some(area), cycle.topology, cycle.now);
    device.clear_pending();
}
