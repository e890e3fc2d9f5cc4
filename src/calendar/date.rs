//! Parsing of the date strings used in the calendar spreadsheets.
//!
//! Three encodings are in use:
//!
//! * `1/30/2026 -> 2/2/2026`: a range that may cross month (and year) boundaries,
//! * `3/18-19/2026`: a range within a single month,
//! * `3/5/2026`: a single day.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::fmt;

/// English month names, indexed by `month - 1`.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const SHORT_DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Separator of the two sides of a cross-month range.
const RANGE_ARROW: &str = "->";

/// Error returned for date strings that match none of the known encodings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("expected a date like `M/D/YYYY`, got `{0}`")]
    Malformed(String),
    #[error("`{0}` is not a number")]
    InvalidNumber(String),
    #[error("month {0} is out of range")]
    MonthOutOfRange(i64),
    #[error("`{0}` is outside of the supported calendar range")]
    OutOfRange(String),
}

/// The encoding a date string was parsed from.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DateFormat {
    CrossMonthRange,
    SameMonthRange,
    SingleDay,
}

/// The normalized form of an event's date string.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ParsedDate {
    pub start_date: NaiveDate,
    /// Equal to `start_date` for single day events.
    pub end_date: NaiveDate,
    /// Short label for the date badge, e.g. `5` or `18-19`.
    pub display: String,
    /// Weekday name, or a pair of abbreviated names for ranges.
    pub day_of_week: String,
    /// The date used for ordering; always `start_date`.
    pub sort_key: NaiveDate,
    /// Month (1-12) as written in the first date of the string.
    pub month: u32,
    /// Year as written in the first date of the string.
    pub year: i32,
    pub format: DateFormat,
}

/// A `M/D/YYYY` triple as written in the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WrittenDate {
    month: u32,
    day: i64,
    year: i32,
}

impl WrittenDate {
    fn parse(s: &str) -> Result<WrittenDate, DateParseError> {
        let mut parts = s.trim().split('/');

        match (parts.next(), parts.next(), parts.next()) {
            (Some(month), Some(day), Some(year)) => WrittenDate::from_parts(month, day, year),
            _ => Err(DateParseError::Malformed(s.to_owned())),
        }
    }

    fn from_parts(month: &str, day: &str, year: &str) -> Result<WrittenDate, DateParseError> {
        Ok(WrittenDate {
            month: parse_month(month)?,
            day: parse_int(day)?,
            year: parse_year(year)?,
        })
    }

    /// Resolves the written date to a calendar date. Days past the end of the month roll over
    /// into the following month, day `0` is the last day of the previous month.
    fn to_date(self) -> Result<NaiveDate, DateParseError> {
        resolve(self.year, self.month, self.day)
    }
}

/// The three date encodings with the tokens each of them carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateSpec<'a> {
    CrossMonthRange {
        start: WrittenDate,
        end: WrittenDate,
    },
    SameMonthRange {
        month: u32,
        year: i32,
        start_day: i64,
        end_day: i64,
        days: &'a str,
    },
    SingleDay {
        date: WrittenDate,
        day: &'a str,
    },
}

impl<'a> DateSpec<'a> {
    /// Detects the encoding of `raw`. The arrow form is checked first, then the dash form.
    fn detect(raw: &'a str) -> Result<DateSpec<'a>, DateParseError> {
        if let Some((start, end)) = raw.split_once(RANGE_ARROW) {
            return Ok(DateSpec::CrossMonthRange {
                start: WrittenDate::parse(start)?,
                end: WrittenDate::parse(end)?,
            });
        }

        let mut parts = raw.split('/');
        let (month, day_part, year) = match (parts.next(), parts.next(), parts.next()) {
            (Some(month), Some(day_part), Some(year)) => (month, day_part, year),
            _ => return Err(DateParseError::Malformed(raw.to_owned())),
        };

        match day_part.split_once('-') {
            Some((start_day, end_day)) => Ok(DateSpec::SameMonthRange {
                month: parse_month(month)?,
                year: parse_year(year)?,
                start_day: parse_int(start_day)?,
                end_day: parse_int(end_day)?,
                days: day_part,
            }),
            None => Ok(DateSpec::SingleDay {
                date: WrittenDate::from_parts(month, day_part, year)?,
                day: day_part,
            }),
        }
    }

    fn format(&self) -> DateFormat {
        match self {
            DateSpec::CrossMonthRange { .. } => DateFormat::CrossMonthRange,
            DateSpec::SameMonthRange { .. } => DateFormat::SameMonthRange,
            DateSpec::SingleDay { .. } => DateFormat::SingleDay,
        }
    }

    fn resolve(self) -> Result<ParsedDate, DateParseError> {
        let format = self.format();

        let (start_date, end_date, display, month, year) = match self {
            DateSpec::CrossMonthRange { start, end } => (
                start.to_date()?,
                end.to_date()?,
                format!("{}-{}", start.day, end.day),
                start.month,
                start.year,
            ),
            DateSpec::SameMonthRange {
                month,
                year,
                start_day,
                end_day,
                days,
            } => (
                resolve(year, month, start_day)?,
                resolve(year, month, end_day)?,
                days.to_owned(),
                month,
                year,
            ),
            DateSpec::SingleDay { date, day } => {
                let resolved = date.to_date()?;
                (resolved, resolved, day.to_owned(), date.month, date.year)
            }
        };

        let day_of_week = match format {
            DateFormat::SingleDay => day_name(start_date).to_owned(),
            _ => format!("{}-{}", short_day_name(start_date), short_day_name(end_date)),
        };

        Ok(ParsedDate {
            start_date,
            end_date,
            display,
            day_of_week,
            sort_key: start_date,
            month,
            year,
            format,
        })
    }
}

/// Parses one of the calendar date encodings into a [`ParsedDate`].
///
/// ```
/// use church_calendar::calendar::date::parse_date_string;
///
/// let parsed = parse_date_string("3/18-19/2026").unwrap();
/// assert_eq!(parsed.display, "18-19");
/// assert_eq!(parsed.day_of_week, "Wed-Thu");
/// ```
pub fn parse_date_string(raw: &str) -> Result<ParsedDate, DateParseError> {
    DateSpec::detect(raw)?.resolve()
}

/// Returns the English name of a month in the range 1-12.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

fn day_name(date: NaiveDate) -> &'static str {
    DAY_NAMES[date.weekday().num_days_from_sunday() as usize]
}

fn short_day_name(date: NaiveDate) -> &'static str {
    SHORT_DAY_NAMES[date.weekday().num_days_from_sunday() as usize]
}

fn resolve(year: i32, month: u32, day: i64) -> Result<NaiveDate, DateParseError> {
    let out_of_range = || DateParseError::OutOfRange(format!("{month}/{day}/{year}"));

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(out_of_range)?;
    let offset = day - 1;

    let date = if offset >= 0 {
        first.checked_add_days(Days::new(offset.unsigned_abs()))
    } else {
        first.checked_sub_days(Days::new(offset.unsigned_abs()))
    };

    date.ok_or_else(out_of_range)
}

fn parse_month(s: &str) -> Result<u32, DateParseError> {
    let month = parse_int(s)?;

    match u32::try_from(month) {
        Ok(month @ 1..=12) => Ok(month),
        _ => Err(DateParseError::MonthOutOfRange(month)),
    }
}

fn parse_year(s: &str) -> Result<i32, DateParseError> {
    let year = parse_int(s)?;
    i32::try_from(year).map_err(|_| DateParseError::OutOfRange(s.trim().to_owned()))
}

/// Parses the leading integer of `s`, skipping leading whitespace and ignoring anything after the
/// digits. Spreadsheet cells regularly carry stray characters after the number.
fn parse_int(s: &str) -> Result<i64, DateParseError> {
    let trimmed = s.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    let value: i64 = digits[..end]
        .parse()
        .map_err(|_| DateParseError::InvalidNumber(s.to_owned()))?;

    Ok(if negative { -value } else { value })
}

impl fmt::Display for ParsedDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.display, self.day_of_week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! date {
        ($y:expr, $m:expr, $d:expr) => {
            NaiveDate::from_ymd_opt($y, $m, $d).unwrap()
        };
    }

    #[test]
    fn cross_month_range() {
        let parsed = parse_date_string("1/30/2026 -> 2/2/2026").unwrap();

        assert_eq!(parsed.start_date, date!(2026, 1, 30));
        assert_eq!(parsed.end_date, date!(2026, 2, 2));
        assert_eq!(parsed.display, "30-2");
        assert_eq!(parsed.day_of_week, "Fri-Mon");
        assert_eq!(parsed.sort_key, date!(2026, 1, 30));
        assert_eq!(parsed.month, 1);
        assert_eq!(parsed.year, 2026);
        assert_eq!(parsed.format, DateFormat::CrossMonthRange);
    }

    #[test]
    fn cross_year_range() {
        let parsed = parse_date_string("12/30/2025->1/2/2026").unwrap();

        assert_eq!(parsed.start_date, date!(2025, 12, 30));
        assert_eq!(parsed.end_date, date!(2026, 1, 2));
        assert_eq!(parsed.display, "30-2");
        assert_eq!(parsed.month, 12);
        assert_eq!(parsed.year, 2025);
    }

    #[test]
    fn same_month_range() {
        let parsed = parse_date_string("3/18-19/2026").unwrap();

        assert_eq!(parsed.start_date, date!(2026, 3, 18));
        assert_eq!(parsed.end_date, date!(2026, 3, 19));
        assert_eq!(parsed.display, "18-19");
        assert_eq!(parsed.day_of_week, "Wed-Thu");
        assert_eq!(parsed.month, 3);
        assert_eq!(parsed.year, 2026);
        assert_eq!(parsed.format, DateFormat::SameMonthRange);
    }

    #[test]
    fn single_day() {
        let parsed = parse_date_string("3/5/2026").unwrap();

        assert_eq!(parsed.start_date, date!(2026, 3, 5));
        assert_eq!(parsed.end_date, parsed.start_date);
        assert_eq!(parsed.display, "5");
        assert_eq!(parsed.day_of_week, "Thursday");
        assert_eq!(parsed.sort_key, parsed.start_date);
        assert_eq!(parsed.format, DateFormat::SingleDay);
    }

    #[test]
    fn lenient_numbers() {
        let parsed = parse_date_string(" 3/05/2026 ").unwrap();

        assert_eq!(parsed.start_date, date!(2026, 3, 5));
        assert_eq!(parsed.display, "05");
        assert_eq!(parsed.year, 2026);
    }

    #[test]
    fn day_overflow_rolls_into_next_month() {
        let parsed = parse_date_string("2/30/2026").unwrap();

        assert_eq!(parsed.start_date, date!(2026, 3, 2));
        // The month token is kept as written.
        assert_eq!(parsed.month, 2);

        let parsed = parse_date_string("3/0/2026").unwrap();
        assert_eq!(parsed.start_date, date!(2026, 2, 28));
    }

    #[test]
    fn malformed() {
        assert_eq!(
            parse_date_string("TBD"),
            Err(DateParseError::Malformed("TBD".into()))
        );
        assert_eq!(
            parse_date_string("3/x/2026"),
            Err(DateParseError::InvalidNumber("x".into()))
        );
        assert_eq!(
            parse_date_string("13/1/2026"),
            Err(DateParseError::MonthOutOfRange(13))
        );
        assert!(parse_date_string("1/30/2026 -> soon").is_err());
        assert!(parse_date_string("").is_err());
    }

    #[test]
    fn month_names() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }
}
