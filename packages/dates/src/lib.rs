#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Date string validation for query ranges.
//!
//! User input arrives as `YYYY-MM-DD` strings. The helpers here parse and
//! bounds-check those strings, and [`DateRange::parse`] combines every check
//! into a validated range whose upper bound is exclusive (one day past the
//! user's inclusive end date), ready to be dropped into a query clause.

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};

/// Input and output format for every date string handled by this crate.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Maximum allowed span of a [`DateRange`] in days (the longest calendar
/// quarter, e.g. 2023Q3).
pub const MAX_RANGE_DAYS: i64 = 92;

/// Errors from parsing or shifting date strings.
#[derive(Debug, thiserror::Error)]
pub enum DateError {
    /// The string is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    Parse {
        /// The rejected input.
        input: String,
        /// Underlying chrono parse failure.
        #[source]
        source: chrono::ParseError,
    },

    /// The date has no successor in the supported calendar range.
    #[error("date {0} cannot be advanced by one day")]
    Overflow(NaiveDate),
}

/// Reasons a user-supplied start/end pair is rejected.
///
/// Variants are ordered the way [`DateRange::parse`] checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `start_date` is not `YYYY-MM-DD`.
    #[error("Invalid start_date format. Please use YYYY-MM-DD.")]
    InvalidStartFormat,

    /// `end_date` is not `YYYY-MM-DD`.
    #[error("Invalid end_date format. Please use YYYY-MM-DD.")]
    InvalidEndFormat,

    /// The dates do not satisfy `start_date < end_date < current_date`.
    #[error("Invalid date range. Please ensure start_date < end_date < current_date.")]
    InvalidRange,

    /// The range spans more than [`MAX_RANGE_DAYS`] days.
    #[error("Date range cannot exceed: {max} days (requested {days}).")]
    RangeTooLong {
        /// Days between the start and the exclusive end.
        days: i64,
        /// The configured maximum.
        max: i64,
    },
}

/// Parses a `YYYY-MM-DD` string into a [`NaiveDate`].
///
/// # Errors
///
/// Returns [`DateError::Parse`] if `s` is not a valid calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|source| DateError::Parse {
        input: s.to_string(),
        source,
    })
}

/// Returns `true` iff `s` parses as a `YYYY-MM-DD` calendar date.
#[must_use]
pub fn is_valid_date_format(s: &str) -> bool {
    parse_date(s).is_ok()
}

/// Returns the calendar date one day after `date_str`, in the same format.
///
/// # Errors
///
/// Returns [`DateError`] if `date_str` is malformed or has no successor.
pub fn add_one_day(date_str: &str) -> Result<String, DateError> {
    let date = parse_date(date_str)?;
    let next = date.succ_opt().ok_or(DateError::Overflow(date))?;
    Ok(next.format(DATE_FORMAT).to_string())
}

/// Signed number of calendar days from `a` to `b` (`b - a`).
///
/// # Errors
///
/// Returns [`DateError::Parse`] if either string is malformed.
pub fn days_between(a: &str, b: &str) -> Result<i64, DateError> {
    let a = parse_date(a)?;
    let b = parse_date(b)?;
    Ok((b - a).num_days())
}

/// Returns `true` iff `start < end < now`, with both dates taken at midnight
/// and compared against the current local date-time.
///
/// # Errors
///
/// Returns [`DateError::Parse`] if either string is malformed.
pub fn is_valid_range(start: &str, end: &str) -> Result<bool, DateError> {
    is_valid_range_at(start, end, Local::now().naive_local())
}

/// Same as [`is_valid_range`] with an explicit reference instant.
///
/// # Errors
///
/// Returns [`DateError::Parse`] if either string is malformed.
pub fn is_valid_range_at(start: &str, end: &str, now: NaiveDateTime) -> Result<bool, DateError> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    Ok(is_ordered(start, end, now))
}

/// Parses a Socrata floating timestamp (`YYYY-MM-DDTHH:MM:SS` with optional
/// fractional seconds). A bare `YYYY-MM-DD` is read as midnight.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    parse_date(s).ok().map(NaiveDateTime::from)
}

fn is_ordered(start: NaiveDate, end: NaiveDate, now: NaiveDateTime) -> bool {
    let start = NaiveDateTime::from(start);
    let end = NaiveDateTime::from(end);
    start < end && end < now
}

/// A validated query range with an exclusive upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Validates a user-supplied inclusive `start`/`end` pair against `now`.
    ///
    /// Checks, in order: start format, end format, `start < end < now`, and
    /// that the span from `start` to the exclusive end (`end` + 1 day) is at
    /// most [`MAX_RANGE_DAYS`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn parse(start: &str, end: &str, now: NaiveDateTime) -> Result<Self, ValidationError> {
        let start = parse_date(start).map_err(|_| ValidationError::InvalidStartFormat)?;
        let end = parse_date(end).map_err(|_| ValidationError::InvalidEndFormat)?;

        if !is_ordered(start, end, now) {
            return Err(ValidationError::InvalidRange);
        }

        let exclusive_end = end
            .checked_add_signed(TimeDelta::days(1))
            .ok_or(ValidationError::InvalidRange)?;
        let range = Self {
            start,
            end: exclusive_end,
        };

        let days = range.days();
        if days > MAX_RANGE_DAYS {
            return Err(ValidationError::RangeTooLong {
                days,
                max: MAX_RANGE_DAYS,
            });
        }

        Ok(range)
    }

    /// Inclusive lower bound.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive upper bound.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered by the range.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// The lower bound formatted as `YYYY-MM-DD`.
    #[must_use]
    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// The exclusive upper bound formatted as `YYYY-MM-DD`.
    #[must_use]
    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}
