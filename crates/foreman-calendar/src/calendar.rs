use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::Deserialize;

use crate::error::{CalendarError, Result};
use crate::unit::{position, set_carry, set_checked, Unit};

/// What a single unit contributes to the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSpec {
    /// The unit takes no part in the scan (only `week`, and `month` once a
    /// `week` is given, end up here).
    Skip,
    /// Repeat every `n` positions; tick positions are `n * k` for `k >= 1`.
    Every(u32),
    /// Anchor the unit at an exact position.
    At(u32),
}

/// A recurrence rule composed of per-unit repeat/anchor specs.
///
/// Built from a preset name, a compact textual form, or a per-unit map;
/// immutable afterwards. [`Calendar::next_event`] computes the first valid
/// occurrence strictly after a given instant (or at that instant with
/// sub-second truncated, when an anchor already satisfies the constraint).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    units: [UnitSpec; 7],
    /// True when `month` participates: `day` is then the 0-based day of the
    /// month and `week` the week-of-month. A rule with `week` set instead
    /// interprets `day` as a weekday index and `week` as the ISO week —
    /// never both, since specifying `week` clears `month`.
    month_anchor: bool,
}

/// Named presets and their compact equivalents.
const PRESETS: &[(&[&str], &str)] = &[
    (&["yearly", "every_year"], "*y"),
    (&["monthly", "every_month"], "*y *m"),
    (&["weekly", "every_week"], "*y *w"),
    (&["daily", "every_day"], "*y *m *d"),
    (&["hourly", "every_hour"], "*y *m *d *H"),
    (&["minutely", "every_minute"], "*y *m *d *H *M"),
    (&["secondly", "every_second"], "*y *m *d *H *M *S"),
];

fn find_preset(name: &str) -> Option<&'static str> {
    let name = name.to_lowercase();
    PRESETS
        .iter()
        .find(|(names, _)| names.contains(&name.as_str()))
        .map(|(_, compact)| *compact)
}

/// A `run` value as it appears in the task definition: either a string
/// (preset name or compact form) or a per-unit map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CalendarSpec {
    Text(String),
    Units(BTreeMap<String, UnitValue>),
}

/// A per-unit map entry: a bare integer anchors the unit, a string holds one
/// of the compact value forms (`*`, `N`, `@N`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UnitValue {
    Anchor(u32),
    Text(String),
}

impl Calendar {
    /// Build from any config-level spec (preset, compact form, or map).
    pub fn from_config(spec: &CalendarSpec) -> Result<Calendar> {
        match spec {
            CalendarSpec::Text(text) => Calendar::from_spec(text),
            CalendarSpec::Units(map) => {
                let mut given: [Option<UnitSpec>; 7] = [None; 7];
                for (name, value) in map {
                    let unit = Unit::from_name(name).ok_or_else(|| CalendarError::UnknownUnit {
                        unit: name.clone(),
                    })?;
                    let spec = match value {
                        UnitValue::Anchor(v) => UnitSpec::At(*v),
                        UnitValue::Text(text) => {
                            parse_value(text).ok_or_else(|| CalendarError::BadToken {
                                token: format!("{text}{}", unit.code()),
                            })?
                        }
                    };
                    if let UnitSpec::Every(0) = spec {
                        return Err(CalendarError::ZeroInterval { unit: unit.name() });
                    }
                    given[unit.index()] = Some(spec);
                }
                Ok(normalise(given))
            }
        }
    }

    /// Build from a preset name, falling back to the compact form.
    pub fn from_spec(spec: &str) -> Result<Calendar> {
        match find_preset(spec) {
            Some(compact) => Calendar::parse(compact),
            None => Calendar::parse(spec),
        }
    }

    /// Parse the compact textual form: whitespace-separated `<spec><code>`
    /// tokens, optionally wrapped in brackets. `<spec>` is `*` (every),
    /// a number (every N) or `@N` (anchor); `<code>` is one of `y m w d H M S`.
    pub fn parse(spec: &str) -> Result<Calendar> {
        let trimmed = spec.trim();
        let body = match trimmed.strip_prefix('[') {
            Some(rest) => rest
                .strip_suffix(']')
                .ok_or_else(|| CalendarError::Malformed {
                    spec: trimmed.to_string(),
                })?,
            None => trimmed,
        };

        let mut given: [Option<UnitSpec>; 7] = [None; 7];
        for token in body.split_whitespace() {
            let code = token.chars().next_back().expect("token is non-empty");
            let unit = Unit::from_code(code).ok_or_else(|| CalendarError::BadToken {
                token: token.to_string(),
            })?;
            let head = &token[..token.len() - code.len_utf8()];
            let value = parse_value(head).ok_or_else(|| CalendarError::BadToken {
                token: token.to_string(),
            })?;
            if let UnitSpec::Every(0) = value {
                return Err(CalendarError::ZeroInterval { unit: unit.name() });
            }
            if given[unit.index()].replace(value).is_some() {
                return Err(CalendarError::DuplicateUnit { unit: unit.name() });
            }
        }
        Ok(normalise(given))
    }

    pub fn builder() -> CalendarBuilder {
        CalendarBuilder::default()
    }

    pub fn month_anchor(&self) -> bool {
        self.month_anchor
    }

    pub fn unit(&self, unit: Unit) -> UnitSpec {
        self.units[unit.index()]
    }

    /// First occurrence strictly after `current` — or at `current` with the
    /// sub-second component truncated, when anchors alone already satisfy
    /// the rule.
    ///
    /// Scans finest → coarsest. The first `Every` unit is stepped to its
    /// next tick; on overflow it is reset to its interval (the first tick of
    /// the next coarser period) and the scan escalates outward. `At` units
    /// are set with carrying arithmetic and stop the scan once the result
    /// has advanced past `current`.
    pub fn next_event(&self, current: NaiveDateTime) -> NaiveDateTime {
        let mut next = current.with_nanosecond(0).unwrap_or(current);

        for unit in Unit::ALL.into_iter().rev() {
            match self.units[unit.index()] {
                UnitSpec::Skip => {}
                UnitSpec::At(value) => {
                    next = set_carry(next, unit, i64::from(value), self.month_anchor);
                    if next > current {
                        break;
                    }
                }
                UnitSpec::Every(interval) => {
                    let interval = i64::from(interval);
                    let pos = position(next, unit, self.month_anchor);
                    let target = interval * pos.div_euclid(interval) + interval;
                    match set_checked(next, unit, target, self.month_anchor) {
                        Some(stepped) => {
                            next = stepped;
                            break;
                        }
                        None => {
                            next = set_carry(next, unit, interval, self.month_anchor);
                        }
                    }
                }
            }
        }

        next
    }
}

impl Default for Calendar {
    /// With nothing specified every unit repeats — the rule ticks once a
    /// second.
    fn default() -> Self {
        normalise([None; 7])
    }
}

impl fmt::Display for Calendar {
    /// Renders the compact form the rule was parsed from. Zero anchors and
    /// skipped units are implied and don't render, so presets normalise to
    /// their compact equivalent.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<String> = Vec::new();
        for unit in Unit::ALL {
            match self.units[unit.index()] {
                UnitSpec::Skip | UnitSpec::At(0) => {}
                UnitSpec::Every(1) => tokens.push(format!("*{}", unit.code())),
                UnitSpec::Every(n) => tokens.push(format!("{}{}", n, unit.code())),
                UnitSpec::At(v) => tokens.push(format!("@{}{}", v, unit.code())),
            }
        }
        write!(f, "[{}]", tokens.join(" "))
    }
}

/// Incremental construction for rules assembled in code rather than parsed.
#[derive(Debug, Default)]
pub struct CalendarBuilder {
    given: [Option<UnitSpec>; 7],
}

impl CalendarBuilder {
    /// Repeat `unit` every `interval` positions.
    pub fn every(mut self, unit: Unit, interval: u32) -> Self {
        self.given[unit.index()] = Some(UnitSpec::Every(interval));
        self
    }

    /// Anchor `unit` at an exact position.
    pub fn at(mut self, unit: Unit, value: u32) -> Self {
        self.given[unit.index()] = Some(UnitSpec::At(value));
        self
    }

    pub fn build(self) -> Result<Calendar> {
        for unit in Unit::ALL {
            if let Some(UnitSpec::Every(0)) = self.given[unit.index()] {
                return Err(CalendarError::ZeroInterval { unit: unit.name() });
            }
        }
        Ok(normalise(self.given))
    }
}

/// Fill the gaps around the explicitly-given units.
///
/// Units coarser than the finest given one default to `Every(1)`; finer ones
/// default to `At(0)` (first-of-period anchors). `week` only participates
/// when given, and giving it clears `month` — the two interpretations of
/// `day`/`week` are never active together.
fn normalise(given: [Option<UnitSpec>; 7]) -> Calendar {
    let finest = given.iter().rposition(Option::is_some);
    let week_given = given[Unit::Week.index()].is_some();

    let mut units = [UnitSpec::Skip; 7];
    for unit in Unit::ALL {
        let i = unit.index();
        units[i] = match given[i] {
            Some(spec) => spec,
            None if unit == Unit::Week => UnitSpec::Skip,
            None if finest.is_none_or(|f| i < f) => UnitSpec::Every(1),
            None => UnitSpec::At(0),
        };
    }
    if week_given {
        units[Unit::Month.index()] = UnitSpec::Skip;
    }

    let month_anchor = units[Unit::Month.index()] != UnitSpec::Skip;
    Calendar {
        units,
        month_anchor,
    }
}

/// Parse one value head: `*` → every 1, `N` → every N, `@N` → anchor N.
fn parse_value(head: &str) -> Option<UnitSpec> {
    if head == "*" {
        return Some(UnitSpec::Every(1));
    }
    if let Some(num) = head.strip_prefix('@') {
        return num.parse().ok().map(UnitSpec::At);
    }
    head.parse().ok().map(UnitSpec::Every)
}
