use clock_core::config::TimeConfig;
use clock_core::time_sync::{UnixSeconds, ZoneRule};
use time::{Month, Weekday};

/// 2026-03-29T01:00:00Z, the spring transition.
const SPRING_FORWARD: i64 = 1_774_746_000;
/// 2026-10-25T01:00:00Z, the autumn transition.
const FALL_BACK: i64 = 1_792_890_000;

fn lisbon() -> ZoneRule {
    ZoneRule::from(&TimeConfig {
        base_offset_secs: 0,
        dst_enabled: true,
        ..TimeConfig::default()
    })
}

#[test]
fn summer_time_starts_at_one_utc_on_last_march_sunday() {
    let rule = lisbon();

    assert!(!rule.is_dst(UnixSeconds::new(SPRING_FORWARD - 1)));
    assert!(rule.is_dst(UnixSeconds::new(SPRING_FORWARD)));
    assert_eq!(rule.total_offset(UnixSeconds::new(SPRING_FORWARD - 1)), 0);
    assert_eq!(rule.total_offset(UnixSeconds::new(SPRING_FORWARD)), 3_600);
}

#[test]
fn summer_time_ends_at_one_utc_on_last_october_sunday() {
    let rule = lisbon();

    assert!(rule.is_dst(UnixSeconds::new(FALL_BACK - 1)));
    assert!(!rule.is_dst(UnixSeconds::new(FALL_BACK)));
}

#[test]
fn local_clock_jumps_an_hour_at_spring_transition() {
    let rule = lisbon();
    let before = rule
        .local_time(UnixSeconds::new(SPRING_FORWARD - 1))
        .civil()
        .expect("in range");
    let after = rule
        .local_time(UnixSeconds::new(SPRING_FORWARD))
        .civil()
        .expect("in range");

    assert_eq!((before.hour, before.minute, before.second), (0, 59, 59));
    assert_eq!((after.hour, after.minute, after.second), (2, 0, 0));
    assert_eq!(after.month, Month::March);
    assert_eq!(after.day, 29);
    assert_eq!(after.weekday, Weekday::Sunday);
}

#[test]
fn base_offset_applies_on_both_sides() {
    let rule = ZoneRule::new(3_600, true);

    assert_eq!(rule.total_offset(UnixSeconds::new(FALL_BACK - 1)), 7_200);
    assert_eq!(rule.total_offset(UnixSeconds::new(FALL_BACK)), 3_600);
    assert_eq!(
        rule.local_time(UnixSeconds::new(FALL_BACK)),
        UnixSeconds::new(FALL_BACK + 3_600)
    );
}
