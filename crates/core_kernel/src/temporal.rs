//! Calendar handling for claim and transaction dates
//!
//! Source systems deliver dates either as plain calendar dates
//! (`2021-01-15`) or as RFC 3339 timestamps (`2021-01-15T09:30:00Z`).
//! The pipeline reasons in calendar days, so everything is reduced to
//! `NaiveDate` at the ingestion boundary.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid range: start {start} must not be after end {end}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Unparseable date: {0}")]
    Unparseable(String),
}

/// Whole days from `start` to `end` (negative when `end` precedes `start`)
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Parses a source date or timestamp into a calendar date
pub fn parse_source_date(raw: &str) -> Result<NaiveDate, TemporalError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_source_timestamp(raw).map(|ts| ts.date_naive())
}

/// Parses a source timestamp; naive timestamps are taken as UTC
pub fn parse_source_timestamp(raw: &str) -> Result<DateTime<Utc>, TemporalError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(TemporalError::Unparseable(raw.to_string()))
}

/// An inclusive calendar date range, either end may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Creates a range, rejecting a start after the end
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(TemporalError::InvalidRange { start: s, end: e });
            }
        }
        Ok(Self { start, end })
    }

    /// A range that admits every date
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns true if the date falls inside the range (bounds inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Like `contains`, but an absent date only matches an unbounded range
    pub fn contains_optional(&self, date: Option<NaiveDate>) -> bool {
        match date {
            Some(d) => self.contains(d),
            None => self.is_unbounded(),
        }
    }

    /// Returns true if neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(date(2021, 1, 1), date(2021, 1, 15)), 14);
        assert_eq!(days_between(date(2021, 1, 15), date(2021, 1, 1)), -14);
    }

    #[test]
    fn test_parse_source_date_formats() {
        assert_eq!(parse_source_date("2021-01-15").unwrap(), date(2021, 1, 15));
        assert_eq!(
            parse_source_date("2021-01-15T23:10:00Z").unwrap(),
            date(2021, 1, 15)
        );
        assert_eq!(
            parse_source_date("2021-01-15 08:00:00").unwrap(),
            date(2021, 1, 15)
        );
        assert!(parse_source_date("15/01/2021").is_err());
    }

    #[test]
    fn test_range_inclusive_bounds() {
        let range = DateRange::new(Some(date(2021, 1, 1)), Some(date(2021, 1, 31))).unwrap();
        assert!(range.contains(date(2021, 1, 1)));
        assert!(range.contains(date(2021, 1, 31)));
        assert!(!range.contains(date(2021, 2, 1)));
        assert!(!range.contains_optional(None));
        assert!(DateRange::unbounded().contains_optional(None));
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(DateRange::new(Some(date(2021, 2, 1)), Some(date(2021, 1, 1))).is_err());
    }
}
