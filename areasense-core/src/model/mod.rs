//! Data consumed and produced by the selection engine
//!
//! Adverts and scanners are filled in by the (external) advertisement
//! ingestion path; devices carry both ingested adverts and the area state this
//! crate maintains. Topology answers "which floor is this area on".

pub mod advert;
pub mod device;
pub mod scanner;
pub mod topology;

pub use advert::{Advert, RssiFilterState, ADVERT_HISTORY_LEN};
pub use device::{AreaSelection, Device, MovementState};
pub use scanner::Scanner;
pub use topology::{StaticTopology, Topology};

use alloc::string::String;

/// Bluetooth address of a scanner (receiver)
pub type ScannerAddress = String;

/// Bluetooth address of a tracked device
pub type DeviceAddress = String;

/// Area (room) identifier from the host's area registry
pub type AreaId = String;

/// Floor identifier from the host's floor registry
pub type FloorId = String;
