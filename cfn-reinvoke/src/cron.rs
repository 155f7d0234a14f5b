//! One-shot schedule expressions.
//!
//! CloudWatch Events / EventBridge rules only fire on a schedule expression,
//! and their cron grammar has no "run once" form. A single future instant is
//! pinned instead by fixing every field, including the year:
//!
//! ```text
//! cron(MM HH DD MO ? YYYY)
//! ```
//!
//! The day-of-week field is always `?` because the grammar requires one of
//! day-of-month / day-of-week to be a wildcard. Minute, hour, day and month
//! are zero-padded to two digits. Scheduling granularity is one minute, so
//! seconds and sub-seconds of the base time are dropped.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use cfn_reinvoke::cron::OneShotSchedule;
//!
//! let base = Utc.with_ymd_and_hms(2009, 11, 17, 20, 34, 58).unwrap();
//! assert_eq!(OneShotSchedule::build(base, 0).expression(), "cron(34 20 17 11 ? 2009)");
//!
//! // Rolls over the end of the year.
//! let base = Utc.with_ymd_and_hms(2019, 12, 31, 23, 59, 30).unwrap();
//! assert_eq!(OneShotSchedule::build(base, 1).expression(), "cron(00 00 01 01 ? 2020)");
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReinvokeError;

/// Latest minute a schedule can name; the cron year field has four digits.
fn latest_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Earliest minute a schedule can name.
fn earliest_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A schedule expression designating exactly one instant, at minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OneShotSchedule {
    minute: u32,
    hour: u32,
    day: u32,
    month: u32,
    year: i32,
}

impl OneShotSchedule {
    /// Builds the schedule for `base + max(minutes_from_now, 0)` minutes.
    ///
    /// Never fails. Non-positive offsets pin the schedule to `base` itself.
    /// Instants past 9999-12-31T23:59Z saturate there.
    pub fn build(base: DateTime<Utc>, minutes_from_now: i64) -> Self {
        let effective = minutes_from_now.max(0);
        let instant = TimeDelta::try_minutes(effective)
            .and_then(|delta| base.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::at(instant)
    }

    /// Builds the schedule for the minute containing `instant`.
    ///
    /// Instants outside years 0000 to 9999 are clamped into that range.
    pub fn at(instant: DateTime<Utc>) -> Self {
        let instant = instant.clamp(earliest_instant(), latest_instant());
        Self {
            minute: instant.minute(),
            hour: instant.hour(),
            day: instant.day(),
            month: instant.month(),
            year: instant.year(),
        }
    }

    /// Returns the `cron(MM HH DD MO ? YYYY)` expression.
    pub fn expression(&self) -> String {
        self.to_string()
    }

    /// Returns the instant the schedule fires at, floored to the minute.
    pub fn fire_at(&self) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(self.year, self.month, self.day, self.hour, self.minute, 0)
            .single()
    }

    /// Minute of the hour, 0 to 59.
    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Hour of the day, 0 to 23.
    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Day of the month, starting at 1.
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Month of the year, starting at 1.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Calendar year, 0000 to 9999.
    pub fn year(&self) -> i32 {
        self.year
    }
}

impl fmt::Display for OneShotSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cron({:02} {:02} {:02} {:02} ? {:04})",
            self.minute, self.hour, self.day, self.month, self.year
        )
    }
}

impl FromStr for OneShotSchedule {
    type Err = ReinvokeError;

    /// Parses an expression previously produced by [`OneShotSchedule::build`].
    ///
    /// Recurring expressions (wildcards, ranges, lists, steps) are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReinvokeError::validation(format!("not a one-shot schedule: {s:?}"));

        let body = s
            .strip_prefix("cron(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let fields: Vec<&str> = body.split(' ').collect();
        let [minute, hour, day, month, weekday, year] = fields.as_slice() else {
            return Err(invalid());
        };
        if *weekday != "?" {
            return Err(invalid());
        }

        let two_digits = |field: &str| -> Result<u32, ReinvokeError> {
            if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            field.parse().map_err(|_| invalid())
        };

        let four_digits = |field: &str| -> Result<i32, ReinvokeError> {
            if field.len() != 4 || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            field.parse().map_err(|_| invalid())
        };

        let schedule = Self {
            minute: two_digits(*minute)?,
            hour: two_digits(*hour)?,
            day: two_digits(*day)?,
            month: two_digits(*month)?,
            year: four_digits(*year)?,
        };

        // Reject field combinations that name no real instant (e.g. 31 02).
        schedule.fire_at().ok_or_else(invalid)?;
        Ok(schedule)
    }
}

/// Returns the one-shot cron expression for `base + max(minutes_from_now, 0)`.
pub fn one_time_cron_expression(base: DateTime<Utc>, minutes_from_now: i64) -> String {
    OneShotSchedule::build(base, minutes_from_now).expression()
}
