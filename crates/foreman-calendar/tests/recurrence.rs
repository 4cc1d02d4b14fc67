// Verify next_event against known instants.
// These pin the scan semantics: finest-first, overflow escalation, anchors
// with carrying arithmetic.

use chrono::{NaiveDate, NaiveDateTime};
use foreman_calendar::{Calendar, Unit};

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

/// The reference instant used throughout: a Friday.
fn friday_noonish() -> NaiveDateTime {
    dt(2018, 7, 13, 11, 58, 5)
}

#[test]
fn default_rule_ticks_every_second() {
    let cal = Calendar::default();
    assert_eq!(cal.next_event(friday_noonish()), dt(2018, 7, 13, 11, 58, 6));
}

#[test]
fn repeating_month_with_day_anchor() {
    let cal = Calendar::builder()
        .every(Unit::Month, 1)
        .at(Unit::Day, 15)
        .build()
        .unwrap();
    assert_eq!(cal.next_event(friday_noonish()), dt(2018, 7, 16, 0, 0, 0));
}

#[test]
fn week_repeat_with_weekday_anchor() {
    // Every second year, every second ISO week, on Tuesday.
    let cal = Calendar::builder()
        .every(Unit::Year, 2)
        .every(Unit::Week, 2)
        .at(Unit::Day, 1)
        .build()
        .unwrap();
    assert_eq!(cal.next_event(friday_noonish()), dt(2018, 7, 24, 0, 0, 0));
}

#[test]
fn daily_fires_at_next_midnight() {
    let cal = Calendar::from_spec("daily").unwrap();
    assert_eq!(cal.next_event(friday_noonish()), dt(2018, 7, 14, 0, 0, 0));
}

#[test]
fn hourly_fires_at_the_top_of_the_next_hour() {
    let cal = Calendar::from_spec("hourly").unwrap();
    assert_eq!(cal.next_event(friday_noonish()), dt(2018, 7, 13, 12, 0, 0));
}

#[test]
fn monthly_fires_on_the_first_of_the_next_month() {
    let cal = Calendar::from_spec("monthly").unwrap();
    assert_eq!(cal.next_event(friday_noonish()), dt(2018, 8, 1, 0, 0, 0));
}

#[test]
fn yearly_fires_on_january_first() {
    let cal = Calendar::from_spec("yearly").unwrap();
    assert_eq!(cal.next_event(friday_noonish()), dt(2019, 1, 1, 0, 0, 0));
}

#[test]
fn weekly_fires_on_the_next_monday() {
    let cal = Calendar::from_spec("weekly").unwrap();
    assert_eq!(cal.next_event(friday_noonish()), dt(2018, 7, 16, 0, 0, 0));
}

#[test]
fn sub_second_component_is_truncated() {
    let cal = Calendar::default();
    let current = dt(2018, 7, 13, 11, 58, 5) + chrono::Duration::milliseconds(250);
    assert_eq!(cal.next_event(current), dt(2018, 7, 13, 11, 58, 6));
}

#[test]
fn second_overflow_escalates_to_the_minute() {
    let cal = Calendar::default();
    // Second 59 + 1 overflows; the second resets to its interval and the
    // minute steps.
    assert_eq!(
        cal.next_event(dt(2018, 7, 13, 11, 58, 59)),
        dt(2018, 7, 13, 11, 59, 1)
    );
}

#[test]
fn month_end_overflow_escalates_to_the_month() {
    let cal = Calendar::from_spec("daily").unwrap();
    // July 31 has no next day-of-month; the day resets to its interval and
    // the month steps.
    assert_eq!(
        cal.next_event(dt(2018, 7, 31, 6, 0, 0)),
        dt(2018, 8, 2, 0, 0, 0)
    );
}

#[test]
fn anchor_past_month_length_carries_forward() {
    // Day index 29 is the 30th — February has no 30th, so the anchor carries
    // into early March and the rule still advances.
    let cal = Calendar::builder()
        .every(Unit::Month, 1)
        .at(Unit::Day, 29)
        .build()
        .unwrap();
    let next = cal.next_event(dt(2018, 2, 10, 12, 0, 0));
    assert_eq!(next, dt(2018, 3, 2, 0, 0, 0));
    assert!(next > dt(2018, 2, 10, 12, 0, 0));
}

#[test]
fn progress_guarantee_over_many_steps() {
    // Whatever the rule, repeatedly asking for the next event must strictly
    // advance — no rule may loop in place.
    for spec in ["secondly", "minutely", "hourly", "daily", "weekly", "monthly"] {
        let cal = Calendar::from_spec(spec).unwrap();
        let mut t = friday_noonish();
        for _ in 0..500 {
            let next = cal.next_event(t);
            assert!(next > t, "{spec} stalled at {t}");
            t = next;
        }
    }
}

#[test]
fn interval_repeat_lands_on_multiples() {
    // Every 15 minutes: from 11:58 the minute position 58 rounds down to 45,
    // so the next tick is the top of the hour's next multiple.
    let cal = Calendar::parse("[15M]").unwrap();
    assert_eq!(
        cal.next_event(friday_noonish()),
        dt(2018, 7, 13, 12, 15, 0)
    );
}
