//! Timing Constants
//!
//! All values are seconds on the monotonic advert clock.

// ===== MOVEMENT STATE =====

/// Time after an area change during which a device counts as MOVING.
///
/// Freshly switched devices are likely still walking; margins are looser so
/// the next room can be picked up quickly.
pub const MOVING_WINDOW_S: f64 = 120.0;

/// Time after an area change after which a device counts as STATIONARY.
///
/// Between `MOVING_WINDOW_S` and this value the device is SETTLING.
/// Auto-learning only trusts stationary devices, so this is also the
/// minimum continuous dwell before a device's readings can train a profile.
pub const SETTLING_WINDOW_S: f64 = 600.0;

// ===== SCANNER LIVENESS =====

/// A scanner not heard from (by any device) for this long is offline.
///
/// Computed from the newest advert stamp across all devices, tracked or not,
/// so scanners in rooms nobody is in do not flap offline.
pub const SCANNER_OFFLINE_AFTER_S: f64 = 60.0;

/// Grace period after a scanner comes back online.
///
/// A recovering scanner has a cold RSSI filter and must not be the lone
/// witness that retains a device in its area.
pub const SCANNER_RECOVERY_GRACE_S: f64 = 120.0;

// ===== EVIDENCE AGE =====

/// Default window in which an advert counts as current evidence.
///
/// Each advert may extend this with its own adaptive timeout, capped at
/// `MAX_ADAPTIVE_TIMEOUT_S`.
pub const DEFAULT_EVIDENCE_WINDOW_S: f64 = 20.0;

/// Upper bound on the per-advert adaptive timeout.
pub const MAX_ADAPTIVE_TIMEOUT_S: f64 = 60.0;

/// Oldest advert still usable as a (soft) incumbent reference.
pub const AREA_MAX_AD_AGE_S: f64 = 90.0;

/// Incumbent distance older than this is stale.
///
/// A stale incumbent's own variance is left out of the stability margin.
pub const INCUMBENT_STALE_AFTER_S: f64 = 10.0;

/// Minimum time a device must have been observed before it can train.
pub const DEVICE_INIT_PERIOD_S: f64 = 60.0;
