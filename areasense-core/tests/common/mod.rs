//! Shared fixtures for integration tests
//!
//! A small two-floor house:
//!
//! ```text
//! upstairs (1):  bedroom [s-bedroom]
//! ground   (0):  kitchen [s-kitchen]  lounge [s-lounge]  den (no scanner)
//! ```

#![allow(dead_code)]

use std::collections::BTreeMap;

use areasense_core::{
    Advert, Context, Device, RoomProfile, Scanner, SelectionConfig, StaticTopology, Timestamp,
};

pub const KITCHEN: &str = "kitchen";
pub const LOUNGE: &str = "lounge";
pub const BEDROOM: &str = "bedroom";
pub const DEN: &str = "den";

pub const S_KITCHEN: &str = "s-kitchen";
pub const S_LOUNGE: &str = "s-lounge";
pub const S_BEDROOM: &str = "s-bedroom";

pub const PHONE: &str = "phone";

/// Context wrapper with helpers for feeding adverts
pub struct House {
    pub ctx: Context,
}

impl House {
    pub fn new(config: SelectionConfig) -> Self {
        let topology = StaticTopology::new()
            .with_floor("ground", 0)
            .with_floor("upstairs", 1)
            .with_area(KITCHEN, "Kitchen", Some("ground"))
            .with_area(LOUNGE, "Lounge", Some("ground"))
            .with_area(BEDROOM, "Bedroom", Some("upstairs"))
            .with_area(DEN, "Den", Some("ground"));
        let mut ctx = Context::new(config, Box::new(topology)).expect("valid config");
        ctx.add_scanner(Scanner::new(S_KITCHEN, KITCHEN).on_floor("ground", 0));
        ctx.add_scanner(Scanner::new(S_LOUNGE, LOUNGE).on_floor("ground", 0));
        ctx.add_scanner(Scanner::new(S_BEDROOM, BEDROOM).on_floor("upstairs", 1));
        Self { ctx }
    }

    /// Min-distance only, no learning
    pub fn min_distance_only() -> Self {
        Self::new(
            SelectionConfig::default()
                .with_ukf(false)
                .with_auto_learning(false),
        )
    }

    pub fn with_phone(mut self) -> Self {
        self.ctx.add_device(Device::new(PHONE, 0.0));
        self
    }

    /// Record one reading of `device` by `scanner`
    pub fn hear(&mut self, device: &str, scanner: &str, rssi: f32, distance: f32, stamp: Timestamp) {
        let device = self
            .ctx
            .device_mut(device)
            .unwrap_or_else(|| panic!("unknown device {device}"));
        device
            .adverts
            .entry(scanner.to_string())
            .or_insert_with(|| Advert::new(scanner))
            .record(rssi, Some(distance), stamp);
    }

    /// Hear the phone from several scanners at once, then run a cycle
    pub fn step(&mut self, readings: &[(&str, f32, f32)], now: Timestamp) {
        for (scanner, rssi, distance) in readings {
            self.hear(PHONE, scanner, *rssi, *distance, now);
        }
        self.ctx.refresh_areas(now);
    }

    pub fn phone(&self) -> &Device {
        self.ctx.device(PHONE).expect("phone registered")
    }

    pub fn area(&self) -> Option<&str> {
        self.phone().area_id.as_deref()
    }
}

/// Readings that look like the phone sitting in the kitchen
pub fn kitchen_pattern() -> [(&'static str, f32, f32); 3] {
    [
        (S_KITCHEN, -50.0, 2.0),
        (S_LOUNGE, -75.0, 6.0),
        (S_BEDROOM, -85.0, 9.0),
    ]
}

/// Readings that look like the phone sitting in the lounge
pub fn lounge_pattern() -> [(&'static str, f32, f32); 3] {
    [
        (S_KITCHEN, -75.0, 6.0),
        (S_LOUNGE, -50.0, 2.0),
        (S_BEDROOM, -85.0, 9.0),
    ]
}

/// Room profile button-trained six times on one fixed pattern
pub fn trained_room(area: &str, primary: &str, rssi: f32, others: &[(&str, f32)]) -> RoomProfile {
    let others: BTreeMap<String, f32> = others
        .iter()
        .map(|(scanner, rssi)| (scanner.to_string(), *rssi))
        .collect();
    let mut room = RoomProfile::new(area);
    for step in 0..6 {
        let stamps: BTreeMap<String, f64> =
            [(primary.to_string(), step as f64)].into_iter().collect();
        assert!(room.update_button(rssi, &others, primary, step as f64, None, &stamps));
    }
    room
}
