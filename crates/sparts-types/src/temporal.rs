use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const DAY_FORMAT: &str = "%Y%m%d";

/// UTC wall-clock stamp recorded on every state record.
///
/// Encoded on the wire as `YYYY-MM-DD HH:MM:SS.ffffff`. Parsing also accepts
/// the form without a fractional part, which older records contain when the
/// microsecond component was zero. Values are held at microsecond precision
/// so that a stamp and its wire form always compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Sub-microsecond digits are dropped.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(6))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Calendar day of this stamp (UTC).
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    pub fn parse(s: &str) -> Result<Self, TypeError> {
        NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| Self::from_datetime(naive.and_utc()))
            .map_err(|e| TypeError::InvalidTimestamp {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WIRE_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.to_string()
    }
}

/// Inclusive calendar-day range used by ranged history queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TypeError> {
        if start > end {
            return Err(TypeError::InvertedRange {
                start: start.format(DAY_FORMAT).to_string(),
                end: end.format(DAY_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two `YYYYMMDD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TypeError> {
        Self::new(parse_day(start)?, parse_day(end)?)
    }

    /// A range covering exactly one day.
    pub fn day(day: &str) -> Result<Self, TypeError> {
        let d = parse_day(day)?;
        Ok(Self { start: d, end: d })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns `true` if `date` falls before the start of the range.
    pub fn precedes(&self, date: NaiveDate) -> bool {
        date < self.start
    }
}

fn parse_day(value: &str) -> Result<NaiveDate, TypeError> {
    let trimmed = value.trim();
    if trimmed.len() != 8 {
        return Err(TypeError::InvalidDate {
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, DAY_FORMAT).map_err(|_| TypeError::InvalidDate {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, hh, mm, ss).unwrap())
    }

    #[test]
    fn now_survives_its_wire_form() {
        for _ in 0..100 {
            let now = Timestamp::now();
            assert_eq!(Timestamp::parse(&now.to_string()).unwrap(), now);
        }
    }

    #[test]
    fn sub_microsecond_digits_are_dropped() {
        let precise = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let ts = Timestamp::from_datetime(precise);
        assert_eq!(ts.to_string(), "2024-05-01 10:00:00.123456");
        assert_eq!(Timestamp::parse("2024-05-01 10:00:00.123456789").unwrap(), ts);
    }

    #[test]
    fn display_uses_microsecond_wire_format() {
        let ts = at(2018, 3, 9, 14, 5, 7);
        assert_eq!(ts.to_string(), "2018-03-09 14:05:07.000000");
    }

    #[test]
    fn parse_accepts_with_and_without_fraction() {
        let with = Timestamp::parse("2018-03-09 14:05:07.123456").unwrap();
        let without = Timestamp::parse("2018-03-09 14:05:07").unwrap();
        assert_eq!(with.date(), without.date());
        assert!(with > without);
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn wire_round_trip_preserves_value() {
        let now = Timestamp::now();
        let parsed = Timestamp::parse(&now.to_string()).unwrap();
        assert_eq!(parsed.to_string(), now.to_string());
    }

    #[test]
    fn range_is_inclusive() {
        let range = DateRange::parse("20180301", "20180331").unwrap();
        assert!(range.contains(at(2018, 3, 1, 0, 0, 0).date()));
        assert!(range.contains(at(2018, 3, 31, 23, 59, 59).date()));
        assert!(!range.contains(at(2018, 4, 1, 0, 0, 0).date()));
        assert!(range.precedes(at(2018, 2, 28, 12, 0, 0).date()));
    }

    #[test]
    fn single_day_range() {
        let range = DateRange::day("20180309").unwrap();
        assert_eq!(range.start(), range.end());
        assert!(range.contains(at(2018, 3, 9, 8, 0, 0).date()));
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        assert!(DateRange::parse("2018-03-01", "20180331").is_err());
        assert!(DateRange::parse("20181301", "20181331").is_err());
        assert!(matches!(
            DateRange::parse("20180331", "20180301"),
            Err(TypeError::InvertedRange { .. })
        ));
    }
}
