use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

/// The seven calendar units a recurrence rule is composed of, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Unit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl Unit {
    /// All units, coarsest → finest. `next_event` scans this in reverse.
    pub const ALL: [Unit; 7] = [
        Unit::Year,
        Unit::Month,
        Unit::Week,
        Unit::Day,
        Unit::Hour,
        Unit::Minute,
        Unit::Second,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// One-letter code used by the compact textual form. Case distinguishes
    /// month/minute and the sub-day units.
    pub fn code(self) -> char {
        match self {
            Unit::Year => 'y',
            Unit::Month => 'm',
            Unit::Week => 'w',
            Unit::Day => 'd',
            Unit::Hour => 'H',
            Unit::Minute => 'M',
            Unit::Second => 'S',
        }
    }

    pub fn from_code(code: char) -> Option<Unit> {
        Unit::ALL.into_iter().find(|u| u.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Unit::Year => "year",
            Unit::Month => "month",
            Unit::Week => "week",
            Unit::Day => "day",
            Unit::Hour => "hour",
            Unit::Minute => "minute",
            Unit::Second => "second",
        }
    }

    pub fn from_name(name: &str) -> Option<Unit> {
        Unit::ALL.into_iter().find(|u| u.name() == name)
    }
}

/// Current cyclic position of `t` in the given unit.
///
/// With `month_anchor` set, `day` is the 0-based day of month and `week` is
/// the 1-based week-of-month; without it, `day` is the weekday index
/// (Monday = 0) and `week` is the ISO week number. `month` is 0-based either
/// way; `year` positions are the calendar year itself.
pub(crate) fn position(t: NaiveDateTime, unit: Unit, month_anchor: bool) -> i64 {
    match unit {
        Unit::Year => i64::from(t.year()),
        Unit::Month => i64::from(t.month0()),
        Unit::Week => {
            if month_anchor {
                i64::from(t.day()) / 7 + 1
            } else {
                i64::from(t.iso_week().week())
            }
        }
        Unit::Day => {
            if month_anchor {
                i64::from(t.day0())
            } else {
                i64::from(t.weekday().num_days_from_monday())
            }
        }
        Unit::Hour => i64::from(t.hour()),
        Unit::Minute => i64::from(t.minute()),
        Unit::Second => i64::from(t.second()),
    }
}

/// Set a unit to an exact position, failing on out-of-range results.
///
/// A `None` here is what escalates a repeat step to the next coarser unit:
/// second 60, day 31 in a 30-day month, month 12, or a month change that
/// invalidates the current day all come back as `None`.
pub(crate) fn set_checked(
    t: NaiveDateTime,
    unit: Unit,
    value: i64,
    month_anchor: bool,
) -> Option<NaiveDateTime> {
    match unit {
        Unit::Year => i32::try_from(value).ok().and_then(|y| t.with_year(y)),
        Unit::Month => {
            if (0..=11).contains(&value) {
                t.with_month0(value as u32)
            } else {
                None
            }
        }
        // Difference arithmetic never leaves the valid range.
        Unit::Week => Some(set_carry(t, unit, value, month_anchor)),
        Unit::Day => {
            if month_anchor {
                u32::try_from(value).ok().and_then(|d| t.with_day0(d))
            } else {
                Some(set_carry(t, unit, value, month_anchor))
            }
        }
        Unit::Hour => {
            if (0..=23).contains(&value) {
                t.with_hour(value as u32)
            } else {
                None
            }
        }
        Unit::Minute => {
            if (0..=59).contains(&value) {
                t.with_minute(value as u32)
            } else {
                None
            }
        }
        Unit::Second => {
            if (0..=59).contains(&value) {
                t.with_second(value as u32)
            } else {
                None
            }
        }
    }
}

/// Set a unit to a position with carrying arithmetic: an out-of-range value
/// rolls into the next coarser unit (February 30 lands in early March).
pub(crate) fn set_carry(t: NaiveDateTime, unit: Unit, value: i64, month_anchor: bool) -> NaiveDateTime {
    match unit {
        Unit::Year => i32::try_from(value)
            .ok()
            .and_then(|y| t.with_year(y))
            .unwrap_or(t),
        Unit::Month => {
            let day0 = i64::from(t.day0());
            let years = value.div_euclid(12);
            let month0 = value.rem_euclid(12) as u32;
            let base = t
                .with_day0(0)
                .expect("day 1 exists in every month")
                .with_month0(month0)
                .expect("months 0-11 are valid with day 1");
            let base = match i32::try_from(i64::from(base.year()) + years) {
                Ok(y) => base.with_year(y).unwrap_or(base),
                Err(_) => base,
            };
            base + Duration::days(day0)
        }
        Unit::Week => t + Duration::weeks(value - position(t, Unit::Week, month_anchor)),
        Unit::Day => {
            if month_anchor {
                t.with_day0(0).expect("day 1 exists in every month") + Duration::days(value)
            } else {
                t + Duration::days(value - position(t, Unit::Day, month_anchor))
            }
        }
        Unit::Hour => t.with_hour(0).expect("hour 0 is always valid") + Duration::hours(value),
        Unit::Minute => {
            t.with_minute(0).expect("minute 0 is always valid") + Duration::minutes(value)
        }
        Unit::Second => {
            t.with_second(0).expect("second 0 is always valid") + Duration::seconds(value)
        }
    }
}
