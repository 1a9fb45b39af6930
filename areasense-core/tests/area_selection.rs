//! End-to-end area selection through `Context::refresh_areas`

mod common;

use areasense_core::{ConfigError, Context, DecisionPath, SelectionConfig, StaticTopology};

use common::{
    trained_room, House, BEDROOM, DEN, KITCHEN, LOUNGE, PHONE, S_BEDROOM, S_KITCHEN, S_LOUNGE,
};

#[test]
fn bootstrap_commits_without_streak() {
    let mut house = House::min_distance_only().with_phone();
    house.step(&[(S_LOUNGE, -70.0, 5.0)], 1.0);

    let phone = house.phone();
    assert_eq!(phone.area_id.as_deref(), Some(LOUNGE));
    assert_eq!(phone.area_name.as_deref(), Some("Lounge"));
    assert_eq!(phone.floor_id.as_deref(), Some("ground"));
    assert_eq!(phone.pending_streak, 0);
    assert_eq!(phone.area_advert.as_deref(), Some(S_LOUNGE));
}

#[test]
fn out_of_radius_incumbent_is_replaced_immediately() {
    let mut house = House::new(
        SelectionConfig::default()
            .with_max_area_radius(5.0)
            .with_ukf(false)
            .with_auto_learning(false),
    )
    .with_phone();
    house.step(&[(S_KITCHEN, -60.0, 2.0)], 1.0);
    assert_eq!(house.area(), Some(KITCHEN));

    house.step(&[(S_KITCHEN, -80.0, 10.0), (S_LOUNGE, -65.0, 3.0)], 2.0);
    assert_eq!(house.area(), Some(LOUNGE));
    let tests = house.phone().area_tests.as_ref().expect("diagnostics");
    assert!(tests.reasons.contains(&"incumbent out of radius"));
}

#[test]
fn out_of_radius_incumbent_keeps_cross_floor_streak() {
    let mut house = House::new(
        SelectionConfig::default()
            .with_max_area_radius(5.0)
            .with_ukf(false)
            .with_auto_learning(false),
    )
    .with_phone();
    house.step(&[(S_KITCHEN, -60.0, 2.0)], 1.0);
    assert_eq!(house.area(), Some(KITCHEN));

    let upstairs = [(S_KITCHEN, -80.0, 6.0), (S_BEDROOM, -60.0, 4.0)];
    house.step(&upstairs, 2.0);
    let phone = house.phone();
    assert_eq!(phone.area_id.as_deref(), Some(KITCHEN));
    assert_eq!(phone.floor_id.as_deref(), Some("ground"));
    assert_eq!(phone.pending_area_id.as_deref(), Some(BEDROOM));
    assert_eq!(phone.pending_streak, 1);
    let tests = phone.area_tests.as_ref().expect("diagnostics");
    assert!(tests.reasons.contains(&"cross-floor: challenger history short"));
    assert!(!tests.reasons.contains(&"switched: incumbent invalid"));

    for t in 3..7 {
        house.step(&upstairs, t as f64);
        assert_eq!(house.area(), Some(KITCHEN));
    }
    house.step(&upstairs, 7.0);
    assert_eq!(house.area(), Some(BEDROOM));
    assert_eq!(house.phone().floor_id.as_deref(), Some("upstairs"));
}

#[test]
fn near_field_improvement_below_floor_holds() {
    let mut house = House::new(
        SelectionConfig::default()
            .with_max_area_radius(10.0)
            .with_ukf(false)
            .with_auto_learning(false),
    )
    .with_phone();
    house.step(&[(S_KITCHEN, -45.0, 0.5)], 1.0);
    house.step(&[(S_KITCHEN, -45.0, 0.5), (S_LOUNGE, -45.0, 0.49)], 2.0);

    assert_eq!(house.area(), Some(KITCHEN));
    assert_eq!(house.phone().pending_area_id, None);
}

#[test]
fn switch_needs_streak_of_new_data() {
    let mut house = House::min_distance_only().with_phone();
    house.step(&[(S_KITCHEN, -70.0, 4.0)], 1.0);
    assert_eq!(house.area(), Some(KITCHEN));

    let moved = [(S_KITCHEN, -70.0, 4.0), (S_LOUNGE, -55.0, 1.0)];
    house.step(&moved, 2.0);
    assert_eq!(house.area(), Some(KITCHEN));
    assert_eq!(house.phone().pending_area_id.as_deref(), Some(LOUNGE));
    assert_eq!(house.phone().pending_streak, 1);

    // A cycle without fresh stamps does not count.
    house.ctx.refresh_areas(2.5);
    assert_eq!(house.phone().pending_streak, 1);

    house.step(&moved, 3.0);
    house.step(&moved, 4.0);
    assert_eq!(house.area(), Some(KITCHEN));
    assert_eq!(house.phone().pending_streak, 3);

    house.step(&moved, 5.0);
    assert_eq!(house.area(), Some(LOUNGE));
    assert_eq!(house.phone().pending_streak, 0);
    assert_eq!(house.phone().pending_area_id, None);
}

#[test]
fn cross_floor_jump_needs_history() {
    let mut house = House::min_distance_only().with_phone();
    house.step(&[(S_KITCHEN, -65.0, 3.0)], 1.0);

    for t in 2..5 {
        house.step(&[(S_KITCHEN, -65.0, 3.0), (S_BEDROOM, -55.0, 1.0)], t as f64);
        assert_eq!(house.area(), Some(KITCHEN));
        assert_eq!(house.phone().pending_area_id, None);
    }
}

#[test]
fn nothing_usable_clears_the_area() {
    let mut house = House::new(
        SelectionConfig::default()
            .with_max_area_radius(5.0)
            .with_ukf(false)
            .with_auto_learning(false),
    )
    .with_phone();
    house.step(&[(S_KITCHEN, -60.0, 2.0)], 1.0);
    house.step(&[(S_KITCHEN, -95.0, 9.0)], 2.0);

    let phone = house.phone();
    assert_eq!(phone.area_id, None);
    assert_eq!(phone.area_advert, None);
    assert_eq!(
        phone.area_tests.as_ref().map(|t| t.path),
        Some(DecisionPath::Cleared)
    );
}

#[test]
fn area_lock_overrides_evidence() {
    let mut house = House::min_distance_only().with_phone();
    house.step(&[(S_KITCHEN, -60.0, 2.0)], 1.0);
    assert!(house.ctx.set_area_lock(PHONE, Some(BEDROOM)));

    house.step(&[(S_KITCHEN, -60.0, 2.0)], 2.0);
    let phone = house.phone();
    assert_eq!(phone.area_id.as_deref(), Some(BEDROOM));
    assert_eq!(phone.floor_id.as_deref(), Some("upstairs"));
    assert_eq!(
        phone.area_tests.as_ref().map(|t| t.path),
        Some(DecisionPath::Locked)
    );
    assert!(!house.ctx.set_area_lock("unknown", Some(BEDROOM)));
}

#[test]
fn scanners_and_untracked_devices_are_skipped() {
    let mut house = House::min_distance_only().with_phone();
    if let Some(phone) = house.ctx.device_mut(PHONE) {
        phone.tracked = false;
    }
    house.step(&[(S_KITCHEN, -60.0, 2.0)], 1.0);
    assert_eq!(house.area(), None);
    assert!(house.phone().area_tests.is_none());
}

#[test]
fn diagnostics_describe_every_decision() {
    let mut house = House::min_distance_only().with_phone();
    house.step(&[(S_KITCHEN, -60.0, 2.0)], 1.0);
    let summary = house.phone().diag_area_switch.clone().expect("summary");
    assert!(summary.starts_with("min-distance"));
    assert!(summary.contains("bootstrap"));
}

#[test]
fn silent_scanners_go_offline() {
    let mut house = House::min_distance_only().with_phone();
    house.step(&[(S_KITCHEN, -60.0, 2.0), (S_LOUNGE, -70.0, 4.0)], 1.0);
    assert!(house.ctx.scanner_status.is_online(S_KITCHEN));
    assert!(!house.ctx.scanner_status.is_online(S_BEDROOM));

    house.step(&[(S_KITCHEN, -60.0, 2.0)], 100.0);
    assert!(house.ctx.scanner_status.is_online(S_KITCHEN));
    assert!(!house.ctx.scanner_status.is_online(S_LOUNGE));
}

#[test]
fn invalid_config_is_rejected() {
    let result = Context::new(
        SelectionConfig::default().with_max_area_radius(0.0),
        Box::new(StaticTopology::new()),
    );
    assert!(matches!(result, Err(ConfigError::InvalidRadius(_))));
}

#[test]
fn poorly_matching_challenger_needs_double_streak() {
    let mut house = House::min_distance_only().with_phone();
    house.step(&[(S_KITCHEN, -70.0, 5.0)], 1.0);
    assert_eq!(house.area(), Some(KITCHEN));

    house.ctx.room_profiles.insert(
        KITCHEN.to_string(),
        trained_room(KITCHEN, S_KITCHEN, -70.0, &[(S_LOUNGE, -55.0)]),
    );
    house.ctx.room_profiles.insert(
        LOUNGE.to_string(),
        trained_room(LOUNGE, S_LOUNGE, -45.0, &[(S_KITCHEN, -90.0)]),
    );

    house.step(&[(S_KITCHEN, -70.0, 5.0), (S_LOUNGE, -55.0, 2.0)], 2.0);
    let phone = house.phone();
    assert_eq!(phone.area_id.as_deref(), Some(KITCHEN));
    assert_eq!(phone.pending_area_id.as_deref(), Some(LOUNGE));
    let tests = phone.area_tests.as_ref().expect("diagnostics");
    assert!(tests.reasons.contains(&"low-confidence challenger"));
    assert_eq!(tests.streak_target, house.ctx.config.same_floor_streak * 2);
}

#[test]
fn trained_scannerless_room_wins_the_tournament() {
    let mut house = House::min_distance_only().with_phone();
    let den_pattern = [
        (S_KITCHEN, -62.0, 3.0),
        (S_LOUNGE, -66.0, 4.0),
        (S_BEDROOM, -85.0, 9.0),
    ];
    house.step(&den_pattern, 1.0);
    assert_eq!(house.area(), Some(KITCHEN));

    house.ctx.room_profiles.insert(
        DEN.to_string(),
        trained_room(DEN, S_KITCHEN, -62.0, &[(S_LOUNGE, -66.0), (S_BEDROOM, -85.0)]),
    );

    let mut t = 2.0;
    while house.area() != Some(DEN) && t < 40.0 {
        house.step(&den_pattern, t);
        t += 1.0;
    }

    let phone = house.phone();
    assert_eq!(phone.area_id.as_deref(), Some(DEN));
    assert_eq!(phone.floor_id.as_deref(), Some("ground"));
    assert!(phone.ukf_scannerless_area);
    assert_eq!(phone.area_advert.as_deref(), Some(S_KITCHEN));
    let tests = phone.area_tests.as_ref().expect("diagnostics");
    assert_eq!(tests.path, DecisionPath::MinDistance);
    assert!(tests.reasons.contains(&"switched"));
}
