//! Area and floor registry lookups
//!
//! The host owns the registry; the engine only needs three questions
//! answered. [`StaticTopology`] is an in-memory implementation for hosts that
//! snapshot their registry, and for tests.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use super::{AreaId, FloorId};

/// Resolves areas to floors and names
pub trait Topology {
    /// Floor an area is on
    fn floor_of(&self, area_id: &str) -> Option<FloorId>;

    /// Human-readable area name
    fn area_name(&self, area_id: &str) -> Option<String>;

    /// Numeric level of a floor
    fn floor_level(&self, floor_id: &str) -> Option<i32>;

    /// All known areas
    fn areas(&self) -> Vec<AreaId>;
}

#[derive(Debug, Clone)]
struct AreaEntry {
    name: String,
    floor_id: Option<FloorId>,
}

/// In-memory topology
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    areas: BTreeMap<AreaId, AreaEntry>,
    floors: BTreeMap<FloorId, i32>,
}

impl StaticTopology {
    /// Empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a floor with its level
    pub fn with_floor(mut self, floor_id: impl Into<FloorId>, level: i32) -> Self {
        self.floors.insert(floor_id.into(), level);
        self
    }

    /// Register an area, optionally on a floor
    pub fn with_area(
        mut self,
        area_id: impl Into<AreaId>,
        name: impl Into<String>,
        floor_id: Option<&str>,
    ) -> Self {
        self.areas.insert(
            area_id.into(),
            AreaEntry {
                name: name.into(),
                floor_id: floor_id.map(String::from),
            },
        );
        self
    }
}

impl Topology for StaticTopology {
    fn floor_of(&self, area_id: &str) -> Option<FloorId> {
        self.areas.get(area_id).and_then(|entry| entry.floor_id.clone())
    }

    fn area_name(&self, area_id: &str) -> Option<String> {
        self.areas.get(area_id).map(|entry| entry.name.clone())
    }

    fn floor_level(&self, floor_id: &str) -> Option<i32> {
        self.floors.get(floor_id).copied()
    }

    fn areas(&self) -> Vec<AreaId> {
        self.areas.keys().cloned().collect()
    }
}
