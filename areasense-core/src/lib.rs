//! Room-level area selection engine for Bluetooth LE presence tracking
//!
//! Decides, once per update cycle, which area ("room") each tracked device is
//! in, using RSSI and distance estimates reported by fixed scanners.
//!
//! Two strategies compete for every device:
//! - **Fingerprint matching**: an Unscented Kalman Filter fuses the device's
//!   simultaneous readings and the fused state is scored against learned
//!   per-area and per-room RSSI profiles.
//! - **Min-distance tournament**: the current area's advert defends against
//!   challengers using variance-aware margins, with extra protection against
//!   cross-floor jumps.
//!
//! Confirmed decisions are fed back through a quality gate into the learned
//! profiles, so fingerprints improve while the system runs.
//!
//! ```no_run
//! use areasense_core::{Context, SelectionConfig, StaticTopology};
//!
//! let topology = StaticTopology::new();
//! let mut ctx = Context::new(SelectionConfig::default(), Box::new(topology))
//!     .expect("default config is valid");
//!
//! // Feed scanners and device adverts, then once per second:
//! ctx.refresh_areas(1000.0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod area_selection;
pub mod confidence;
pub mod config;
pub mod constants;
pub mod context;
pub mod correlation;
pub mod diagnostics;
pub mod errors;
pub mod fusion;
pub mod learning;
pub mod min_distance;
pub mod model;
pub mod scanner_status;
pub mod time;
pub mod virtual_distance;

// Public API
pub use config::SelectionConfig;
pub use context::Context;
pub use correlation::{AreaProfile, RoomProfile};
pub use diagnostics::{AreaTests, DecisionPath};
pub use errors::{ConfigError, LearningSkipReason, UkfRejection};
pub use fusion::UnscentedKalmanFilter;
pub use model::{
    Advert, AreaId, Device, FloorId, MovementState, Scanner, ScannerAddress, StaticTopology,
    Topology,
};
pub use time::{TimeSource, Timestamp};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
