//! Tests for the rrule-backed recurrence oracle.

use agenda_engine::expander::normalize_rule;
use agenda_engine::{EngineError, RRuleOracle, RecurrenceOracle};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::{Los_Angeles, New_York};
use chrono_tz::Tz;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn anchor(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
    tz.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Window bounds
// ---------------------------------------------------------------------------

#[test]
fn daily_rule_yields_single_instance_in_day_window() {
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "FREQ=DAILY",
            &anchor(Tz::UTC, 2026, 3, 1, 9, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .expect("should expand successfully");

    assert_eq!(result, vec![utc(2026, 3, 17, 9, 0)]);
}

#[test]
fn window_start_is_inclusive_and_end_exclusive() {
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "FREQ=DAILY",
            &anchor(Tz::UTC, 2026, 3, 1, 0, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap();

    // Mar 17 00:00 is in, Mar 18 00:00 is not.
    assert_eq!(result, vec![utc(2026, 3, 17, 0, 0)]);
}

#[test]
fn hourly_rule_returns_every_instance_in_window() {
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "FREQ=HOURLY;INTERVAL=6",
            &anchor(Tz::UTC, 2026, 3, 16, 0, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap();

    assert_eq!(
        result,
        vec![
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 17, 6, 0),
            utc(2026, 3, 17, 12, 0),
            utc(2026, 3, 17, 18, 0),
        ]
    );
}

#[test]
fn instance_limit_keeps_earliest_instances() {
    let oracle = RRuleOracle::with_limit(3);
    let result = oracle
        .expand(
            "FREQ=HOURLY",
            &anchor(Tz::UTC, 2026, 3, 16, 0, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap();

    assert_eq!(
        result,
        vec![
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 17, 1, 0),
            utc(2026, 3, 17, 2, 0),
        ]
    );
}

#[test]
fn weekly_byday_skips_other_days() {
    // Mar 17 2026 is a Tuesday.
    let oracle = RRuleOracle::new();
    let on_tuesday = oracle
        .expand(
            "FREQ=WEEKLY;BYDAY=MO,WE,FR",
            &anchor(Tz::UTC, 2026, 3, 2, 10, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap();
    assert!(on_tuesday.is_empty(), "no MO/WE/FR instance on a Tuesday");

    let on_wednesday = oracle
        .expand(
            "FREQ=WEEKLY;BYDAY=MO,WE,FR",
            &anchor(Tz::UTC, 2026, 3, 2, 10, 0),
            utc(2026, 3, 18, 0, 0),
            utc(2026, 3, 19, 0, 0),
        )
        .unwrap();
    assert_eq!(on_wednesday, vec![utc(2026, 3, 18, 10, 0)]);
}

#[test]
fn count_exhausted_before_window_yields_nothing() {
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "FREQ=DAILY;COUNT=3",
            &anchor(Tz::UTC, 2026, 3, 1, 9, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn anchor_after_window_yields_nothing() {
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "FREQ=DAILY",
            &anchor(Tz::UTC, 2026, 4, 1, 9, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn empty_window_yields_nothing() {
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "FREQ=DAILY",
            &anchor(Tz::UTC, 2026, 3, 1, 9, 0),
            utc(2026, 3, 18, 0, 0),
            utc(2026, 3, 17, 0, 0),
        )
        .unwrap();
    assert!(result.is_empty());
}

// ---------------------------------------------------------------------------
// DST: wall-clock time is preserved in the anchor's zone
// ---------------------------------------------------------------------------

#[test]
fn daily_instance_keeps_wall_clock_across_spring_forward() {
    // Anchored in EST (UTC-5); DST starts Mar 8 2026, so Mar 17 is EDT (UTC-4).
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "FREQ=DAILY",
            &anchor(New_York, 2026, 3, 2, 9, 0),
            utc(2026, 3, 17, 4, 0),
            utc(2026, 3, 18, 4, 0),
        )
        .unwrap();

    assert_eq!(result, vec![utc(2026, 3, 17, 13, 0)], "09:00 EDT = 13:00 UTC");
}

#[test]
fn monthly_third_tuesday_in_los_angeles() {
    // 3rd Tuesday of March 2026 is Mar 17; 14:00 PDT = 21:00 UTC.
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "FREQ=MONTHLY;BYDAY=TU;BYSETPOS=3",
            &anchor(Los_Angeles, 2026, 2, 17, 14, 0),
            utc(2026, 3, 17, 7, 0),
            utc(2026, 3, 18, 7, 0),
        )
        .unwrap();

    assert_eq!(result, vec![utc(2026, 3, 17, 21, 0)]);
}

// ---------------------------------------------------------------------------
// Rule text handling
// ---------------------------------------------------------------------------

#[test]
fn property_prefix_is_accepted() {
    let oracle = RRuleOracle::new();
    let result = oracle
        .expand(
            "RRULE:FREQ=DAILY",
            &anchor(Tz::UTC, 2026, 3, 1, 9, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap();
    assert_eq!(result.len(), 1);
}

#[test]
fn malformed_rule_is_invalid_rule_error() {
    let oracle = RRuleOracle::new();
    let err = oracle
        .expand(
            "FREQ=SOMETIMES",
            &anchor(Tz::UTC, 2026, 3, 1, 9, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRule(_)), "got {err:?}");
}

#[test]
fn blank_rule_is_invalid_rule_error() {
    let oracle = RRuleOracle::new();
    let err = oracle
        .expand(
            "   ",
            &anchor(Tz::UTC, 2026, 3, 1, 9, 0),
            utc(2026, 3, 17, 0, 0),
            utc(2026, 3, 18, 0, 0),
        )
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidRule("empty RRULE string".to_string()));
}

#[test]
fn normalize_rule_unwraps_property_lines() {
    assert_eq!(normalize_rule("FREQ=DAILY").as_deref(), Some("FREQ=DAILY"));
    assert_eq!(
        normalize_rule("RRULE:FREQ=WEEKLY;BYDAY=TU").as_deref(),
        Some("FREQ=WEEKLY;BYDAY=TU")
    );
    assert_eq!(
        normalize_rule("DTSTART:20260301T090000Z\nRRULE:FREQ=DAILY;COUNT=4\n").as_deref(),
        Some("FREQ=DAILY;COUNT=4")
    );
    assert_eq!(normalize_rule(""), None);
    assert_eq!(normalize_rule("RRULE:"), None);
    assert_eq!(normalize_rule("EXDATE:20260301T090000Z\nSUMMARY:x"), None);
}
