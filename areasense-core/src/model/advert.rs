//! Per device×scanner observation
//!
//! An [`Advert`] is the most recent view one scanner has of one device. RSSI
//! smoothing and distance estimation happen upstream; this crate only reads
//! the results.

use alloc::string::String;
use heapless::Vec as HVec;

use super::{AreaId, ScannerAddress};
use crate::time::{elapsed, Timestamp};

/// Samples kept in each bounded advert history
pub const ADVERT_HISTORY_LEN: usize = 20;

/// State of the upstream per-advert RSSI Kalman filter
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RssiFilterState {
    /// Filter has seen at least one sample
    pub is_initialized: bool,
    /// Current estimate variance (dB²)
    pub variance: f32,
    /// Stamp of the last filter update
    pub last_update_time: Option<Timestamp>,
}

/// One scanner's latest observation of a device
#[derive(Debug, Clone)]
pub struct Advert {
    /// Scanner that produced this advert
    pub scanner_address: ScannerAddress,
    /// Latest raw RSSI (dBm)
    pub rssi: Option<f32>,
    /// Monotonic stamp of the latest reading
    pub stamp: Timestamp,
    /// Smoothed distance estimate (m)
    pub rssi_distance: Option<f32>,
    /// Per-advert timeout learned from the device's advertising interval
    pub adaptive_timeout: f64,
    /// Area inherited from the scanner
    pub area_id: Option<AreaId>,
    /// Human-readable area name inherited from the scanner
    pub area_name: Option<String>,
    /// Upstream RSSI filter state
    pub rssi_kalman: RssiFilterState,
    /// Distance history, most recent first
    hist_distance_by_interval: HVec<f32, ADVERT_HISTORY_LEN>,
    /// Raw RSSI history, most recent first
    hist_rssi: HVec<f32, ADVERT_HISTORY_LEN>,
    /// Velocity history (m/s), most recent first
    hist_velocity: HVec<f32, ADVERT_HISTORY_LEN>,
}

fn push_front<const N: usize>(history: &mut HVec<f32, N>, value: f32) {
    if history.is_full() {
        history.pop();
    }
    if history.push(value).is_ok() {
        history.rotate_right(1);
    }
}

impl Advert {
    /// Empty advert for `scanner_address`, not yet seen
    pub fn new(scanner_address: impl Into<ScannerAddress>) -> Self {
        Self {
            scanner_address: scanner_address.into(),
            rssi: None,
            stamp: 0.0,
            rssi_distance: None,
            adaptive_timeout: 0.0,
            area_id: None,
            area_name: None,
            rssi_kalman: RssiFilterState::default(),
            hist_distance_by_interval: HVec::new(),
            hist_rssi: HVec::new(),
            hist_velocity: HVec::new(),
        }
    }

    /// Set the area inherited from the scanner
    pub fn with_area(mut self, area_id: impl Into<AreaId>) -> Self {
        self.area_id = Some(area_id.into());
        self
    }

    /// Record a new reading
    ///
    /// Velocity is derived from the change in distance since the previous
    /// reading.
    pub fn record(&mut self, rssi: f32, distance: Option<f32>, stamp: Timestamp) {
        if let (Some(previous), Some(current)) = (self.rssi_distance, distance) {
            let dt = elapsed(self.stamp, stamp);
            if dt > 0.0 {
                push_front(&mut self.hist_velocity, (current - previous) / dt as f32);
            }
        }
        self.rssi = Some(rssi);
        self.rssi_distance = distance;
        self.stamp = stamp;
        push_front(&mut self.hist_rssi, rssi);
        if let Some(distance) = distance {
            push_front(&mut self.hist_distance_by_interval, distance);
        }
        self.rssi_kalman.is_initialized = true;
        self.rssi_kalman.last_update_time = Some(stamp);
    }

    /// Distance history, most recent first
    pub fn hist_distance_by_interval(&self) -> &[f32] {
        &self.hist_distance_by_interval
    }

    /// Velocity history, most recent first
    pub fn hist_velocity(&self) -> &[f32] {
        &self.hist_velocity
    }

    /// Median of the raw RSSI history, falling back to the latest reading
    pub fn median_rssi(&self) -> Option<f32> {
        if self.hist_rssi.is_empty() {
            return self.rssi;
        }
        let mut sorted: HVec<f32, ADVERT_HISTORY_LEN> = self.hist_rssi.clone();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Variance (m²) of the recent distance history
    ///
    /// `None` with fewer than two samples or once the reading is older than
    /// the advert's timeout.
    pub fn get_distance_variance(&self, now: Timestamp) -> Option<f32> {
        let history = self.hist_distance_by_interval();
        if history.len() < 2 {
            return None;
        }
        let timeout = if self.adaptive_timeout > 0.0 {
            self.adaptive_timeout
        } else {
            crate::constants::timing::DEFAULT_EVIDENCE_WINDOW_S
        };
        if elapsed(self.stamp, now) > timeout {
            return None;
        }
        let n = history.len() as f32;
        let mean = history.iter().sum::<f32>() / n;
        let variance = history.iter().map(|d| (d - mean) * (d - mean)).sum::<f32>() / (n - 1.0);
        Some(variance)
    }

    /// Mean of the `count` most recent history distances
    pub fn recent_mean_distance(&self, count: usize) -> Option<f32> {
        let history = self.hist_distance_by_interval();
        let take = count.min(history.len());
        if take == 0 {
            return None;
        }
        Some(history[..take].iter().sum::<f32>() / take as f32)
    }

    /// Reading is within `window` seconds (extended by the adaptive timeout)
    pub fn is_fresh(&self, now: Timestamp, window: f64) -> bool {
        let adaptive = self
            .adaptive_timeout
            .min(crate::constants::timing::MAX_ADAPTIVE_TIMEOUT_S);
        self.rssi.is_some() && elapsed(self.stamp, now) <= window.max(adaptive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_most_recent_first_and_bounded() {
        let mut advert = Advert::new("aa:01");
        for i in 0..(ADVERT_HISTORY_LEN + 5) {
            advert.record(-60.0, Some(i as f32), i as f64);
        }
        let history = advert.hist_distance_by_interval();
        assert_eq!(history.len(), ADVERT_HISTORY_LEN);
        assert_eq!(history[0], (ADVERT_HISTORY_LEN + 4) as f32);
        assert!(history[0] > history[1]);
    }

    #[test]
    fn median_rssi_uses_history() {
        let mut advert = Advert::new("aa:01");
        for (i, rssi) in [-70.0, -50.0, -60.0].iter().enumerate() {
            advert.record(*rssi, None, i as f64);
        }
        assert_eq!(advert.median_rssi(), Some(-60.0));
    }

    #[test]
    fn velocity_tracks_distance_change() {
        let mut advert = Advert::new("aa:01");
        advert.record(-60.0, Some(2.0), 10.0);
        advert.record(-62.0, Some(4.0), 12.0);
        assert_eq!(advert.hist_velocity()[0], 1.0);
    }

    #[test]
    fn distance_variance_needs_fresh_history() {
        let mut advert = Advert::new("aa:01");
        advert.record(-60.0, Some(2.0), 0.0);
        assert!(advert.get_distance_variance(0.0).is_none());
        advert.record(-60.0, Some(4.0), 1.0);
        assert_eq!(advert.get_distance_variance(1.0), Some(2.0));
        assert!(advert.get_distance_variance(500.0).is_none());
    }
}
