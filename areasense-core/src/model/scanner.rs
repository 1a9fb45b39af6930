//! Fixed receivers

use alloc::string::String;

use super::{AreaId, FloorId, ScannerAddress};
use crate::time::Timestamp;

/// A stationary BLE receiver placed in an area
#[derive(Debug, Clone, PartialEq)]
pub struct Scanner {
    /// Bluetooth address
    pub address: ScannerAddress,
    /// Display name
    pub name: String,
    /// Area the scanner is assigned to
    pub area_id: Option<AreaId>,
    /// Floor of that area
    pub floor_id: Option<FloorId>,
    /// Numeric level of that floor (0 = ground)
    pub floor_level: Option<i32>,
    /// Last time the scanner itself reported in
    pub last_seen: Timestamp,
}

impl Scanner {
    /// Scanner in `area_id`, floor unknown
    pub fn new(address: impl Into<ScannerAddress>, area_id: impl Into<AreaId>) -> Self {
        let address = address.into();
        Self {
            name: address.clone(),
            address,
            area_id: Some(area_id.into()),
            floor_id: None,
            floor_level: None,
            last_seen: 0.0,
        }
    }

    /// Place the scanner on a floor
    pub fn on_floor(mut self, floor_id: impl Into<FloorId>, level: i32) -> Self {
        self.floor_id = Some(floor_id.into());
        self.floor_level = Some(level);
        self
    }
}
