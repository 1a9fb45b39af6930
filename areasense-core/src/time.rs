//! Time handling for the selection cycle
//!
//! All stamps handled by this crate are monotonic seconds (the same clock the
//! advert ingestion path stamps readings with). Wall-clock time is never
//! needed: only differences between stamps matter.

/// Monotonic timestamp in seconds
pub type Timestamp = f64;

/// Source of monotonic time for the selection cycle
pub trait TimeSource {
    /// Current monotonic time in seconds
    fn now(&self) -> Timestamp;
}

/// Monotonic clock backed by `std::time::Instant`
///
/// Starts at 0 when created.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Create a clock whose zero is "now"
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Fixed time source for testing and replay
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Create a fixed clock at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute time
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `seconds`
    pub fn advance(&mut self, seconds: f64) {
        self.timestamp += seconds;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Seconds elapsed from `earlier` to `later`, never negative
#[inline]
pub fn elapsed(earlier: Timestamp, later: Timestamp) -> f64 {
    let delta = later - earlier;
    if delta > 0.0 {
        delta
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_advances() {
        let mut clock = FixedTime::new(10.0);
        assert_eq!(clock.now(), 10.0);
        clock.advance(2.5);
        assert_eq!(clock.now(), 12.5);
        clock.set(1.0);
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn elapsed_never_negative() {
        assert_eq!(elapsed(5.0, 3.0), 0.0);
        assert_eq!(elapsed(3.0, 5.0), 2.0);
    }
}
