//! Button training, auto-learning and fingerprint-driven selection

mod common;

use areasense_core::{DecisionPath, Device, LearningSkipReason, SelectionConfig};

use common::{kitchen_pattern, lounge_pattern, House, KITCHEN, LOUNGE, PHONE, S_KITCHEN};

/// Five button samples per area, six seconds apart
fn train(house: &mut House, area: &str, pattern: [(&'static str, f32, f32); 3], start: f64) -> f64 {
    let mut t = start;
    for _ in 0..5 {
        for (scanner, rssi, distance) in pattern {
            house.hear(PHONE, scanner, rssi, distance, t);
        }
        assert!(house.ctx.train_button(PHONE, area, t), "sample at {t} rejected");
        t += 6.0;
    }
    t
}

#[test]
fn button_training_needs_new_data_and_spacing() {
    let mut house = House::new(SelectionConfig::default()).with_phone();
    for (scanner, rssi, distance) in kitchen_pattern() {
        house.hear(PHONE, scanner, rssi, distance, 1.0);
    }
    assert!(house.ctx.train_button(PHONE, KITCHEN, 1.0));
    // Same instant: too soon.
    assert!(!house.ctx.train_button(PHONE, KITCHEN, 1.0));
    // Later, but nothing new was heard.
    assert!(!house.ctx.train_button(PHONE, KITCHEN, 8.0));

    house.hear(PHONE, S_KITCHEN, -51.0, 2.0, 9.0);
    assert!(house.ctx.train_button(PHONE, KITCHEN, 9.0));

    let profile = &house.ctx.correlations[PHONE][KITCHEN];
    assert_eq!(profile.button_updates(), 2);
    assert_eq!(profile.auto_updates(), 0);
    assert!(house.ctx.room_profiles[KITCHEN].has_button_training());
    assert!(!house.ctx.train_button("nobody", KITCHEN, 9.0));
}

#[test]
fn trained_fingerprint_drives_selection() {
    let mut house = House::new(SelectionConfig::default()).with_phone();
    let t = train(&mut house, KITCHEN, kitchen_pattern(), 1.0);
    let t = train(&mut house, LOUNGE, lounge_pattern(), t);
    assert!(house.ctx.correlations[PHONE][KITCHEN].is_mature());

    house.step(&kitchen_pattern(), t + 10.0);
    let phone = house.phone();
    assert_eq!(phone.area_id.as_deref(), Some(KITCHEN));
    let tests = phone.area_tests.as_ref().expect("diagnostics");
    assert_eq!(tests.path, DecisionPath::Ukf);
    assert!(tests.ukf_score.map_or(false, |score| score > 0.5));
}

#[test]
fn reset_training_forgets_profiles() {
    let mut house = House::new(SelectionConfig::default()).with_phone();
    let t = train(&mut house, KITCHEN, kitchen_pattern(), 1.0);
    let t = train(&mut house, LOUNGE, lounge_pattern(), t);

    house.ctx.reset_training(PHONE, Some(KITCHEN));
    let profiles = &house.ctx.correlations[PHONE];
    assert!(!profiles.contains_key(KITCHEN));
    assert!(profiles.contains_key(LOUNGE));

    house.ctx.reset_training(PHONE, None);
    assert!(!house.ctx.correlations.contains_key(PHONE));

    // Room profiles are kept until reset separately.
    assert!(house.ctx.room_profiles.contains_key(KITCHEN));
    house.ctx.reset_room(KITCHEN);
    assert!(!house.ctx.room_profiles.contains_key(KITCHEN));

    for (scanner, rssi, distance) in kitchen_pattern() {
        house.hear(PHONE, scanner, rssi, distance, t);
    }
    assert!(house.ctx.train_button(PHONE, KITCHEN, t));
}

#[test]
fn reference_trackers_learn_once_per_area() {
    let mut house = House::new(SelectionConfig::default());
    for name in ["ref-1", "ref-2", "ref-3"] {
        house.ctx.add_device(Device::new(name, 0.0).as_reference_tracker());
    }
    let hear_all = |house: &mut House, t: f64| {
        for name in ["ref-1", "ref-2", "ref-3"] {
            house.hear(name, S_KITCHEN, -55.0, 1.5, t);
        }
    };

    hear_all(&mut house, 1.0);
    house.ctx.refresh_areas(1.0);
    assert_eq!(house.ctx.learning_stats().performed, 0);

    hear_all(&mut house, 7.0);
    house.ctx.refresh_areas(7.0);
    assert_eq!(house.ctx.learning_stats().performed, 1);
    assert_eq!(house.ctx.room_profiles[KITCHEN].updates(), 1);
    assert!(house.ctx.correlations.contains_key("reference:kitchen"));

    // Within the learning interval nothing more is learned.
    hear_all(&mut house, 8.0);
    house.ctx.refresh_areas(8.0);
    assert_eq!(house.ctx.learning_stats().performed, 1);
    assert_eq!(house.ctx.learning_stats().skipped(LearningSkipReason::TooSoon), 1);
}

#[test]
fn moving_devices_are_not_learned() {
    let mut house = House::new(SelectionConfig::default()).with_phone();
    house.step(&kitchen_pattern(), 100.0);
    assert_eq!(house.area(), Some(KITCHEN));
    house.step(&kitchen_pattern(), 101.0);

    let stats = house.ctx.learning_stats();
    assert_eq!(stats.performed, 0);
    assert!(stats.skipped(LearningSkipReason::NotStationary) >= 1);
}

#[test]
fn reset_room_allows_retraining_from_current_readings() {
    let mut house = House::new(SelectionConfig::default()).with_phone();
    for (scanner, rssi, distance) in kitchen_pattern() {
        house.hear(PHONE, scanner, rssi, distance, 1.0);
    }
    assert!(house.ctx.train_button(PHONE, KITCHEN, 1.0));
    assert!(!house.ctx.train_button(PHONE, KITCHEN, 8.0));

    house.ctx.reset_room(KITCHEN);
    assert!(house.ctx.train_button(PHONE, KITCHEN, 8.0));
    assert_eq!(house.ctx.room_profiles[KITCHEN].updates(), 1);
}

#[test]
fn held_area_without_current_reading_counts_as_skip() {
    let mut house = House::new(SelectionConfig::default()).with_phone();
    house.step(&[(S_KITCHEN, -60.0, 2.0)], 1.0);
    assert_eq!(house.area(), Some(KITCHEN));
    let before = house.ctx.learning_stats().total_skipped();

    // The kitchen advert has left the evidence window but still backs the area.
    house.ctx.refresh_areas(30.0);
    assert_eq!(house.area(), Some(KITCHEN));
    let stats = house.ctx.learning_stats();
    assert_eq!(stats.skipped(LearningSkipReason::PrimaryNotVisible), 1);
    assert_eq!(stats.total_skipped(), before + 1);
}
