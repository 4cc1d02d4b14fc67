//! `foreman-calendar` — the recurrence engine.
//!
//! # Overview
//!
//! A [`Calendar`] composes seven units (year, month, week, day, hour, minute,
//! second), each repeating, anchored, or skipped. [`Calendar::next_event`]
//! computes the first occurrence strictly after a given instant by scanning
//! finest → coarsest, stepping the first repeating unit and escalating
//! outward on overflow.
//!
//! # Spec forms
//!
//! | Form            | Example                      | Meaning                         |
//! |-----------------|------------------------------|---------------------------------|
//! | Preset          | `daily`                      | normalises to `[*y *m *d]`      |
//! | Compact         | `[*y @3m]`                   | yearly, anchored at month 3     |
//! | Per-unit map    | `{ month = "*", day = 15 }`  | 16th of every month             |
//!
//! Compact tokens are `<spec><code>` with `<spec>` ∈ {`*`, `N`, `@N`} and
//! `<code>` one of `y m w d H M S`. Rendering a parsed rule round-trips to
//! the same compact form.
//!
//! This crate stands alone: no dependency on the rest of the workspace.

pub mod calendar;
pub mod error;
pub mod unit;

pub use calendar::{Calendar, CalendarBuilder, CalendarSpec, UnitSpec, UnitValue};
pub use error::{CalendarError, Result};
pub use unit::Unit;
