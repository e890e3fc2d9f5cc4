//! Grouping of calendar events by month and the "upcoming" filter.

use super::date::{month_name, parse_date_string, ParsedDate, MONTH_NAMES};
use super::Event;
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifies a calendar month. Formats as e.g. `March 2026`, the form used for month headings
/// and month notes in the metadata sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    /// Month in the range 1-12.
    month: u32,
}

impl MonthKey {
    /// Creates a new `MonthKey`. Returns `None` if `month` is not in the range 1-12.
    pub fn new(year: i32, month: u32) -> Option<MonthKey> {
        month_name(month).map(|_| MonthKey { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month in the range 1-12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The English name of the month.
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

/// Error returned when parsing a `MonthKey` from a string fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("expected a month like `March 2026`, got `{0}`")]
pub struct ParseMonthKeyError(String);

impl FromStr for MonthKey {
    type Err = ParseMonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthKeyError(s.to_owned());
        let (name, year) = s.split_once(char::is_whitespace).ok_or_else(err)?;
        let year = year.trim_start();

        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let month = MONTH_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .ok_or_else(err)?;

        Ok(MonthKey {
            year: year.parse().map_err(|_| err())?,
            month: month as u32 + 1,
        })
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// An event together with its parsed date.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DatedEvent {
    pub event: Event,
    pub parsed: ParsedDate,
}

/// The events of a single month, in display order.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MonthGroup {
    pub key: MonthKey,
    /// English month name.
    pub month: &'static str,
    pub year: i32,
    /// Sort key of the event that created the group. This is not necessarily the earliest date
    /// in the group.
    pub sort_key: NaiveDate,
    pub events: Vec<DatedEvent>,
}

/// Parses the date of each event, logging and dropping events whose date can't be parsed.
pub fn parse_events<'a, I>(events: I) -> impl Iterator<Item = DatedEvent> + 'a
where
    I: IntoIterator<Item = &'a Event>,
    I::IntoIter: 'a,
{
    events
        .into_iter()
        .filter_map(|event| match parse_date_string(&event.date) {
            Ok(parsed) => Some(DatedEvent {
                event: event.clone(),
                parsed,
            }),
            Err(err) => {
                log::warn!("skipping event `{event}`: {err}");
                None
            }
        })
}

/// Groups events by the month of their (first) date.
///
/// Groups are ordered by the sort key of the event that created them, events within a group by
/// their own sort key. Both sorts are stable, so events with equal dates keep their input order.
pub fn group_events_by_month(events: &[Event]) -> Vec<MonthGroup> {
    group_dated_events(parse_events(events))
}

/// Same as [`group_events_by_month`] for events whose dates are already parsed.
pub fn group_dated_events<I>(events: I) -> Vec<MonthGroup>
where
    I: IntoIterator<Item = DatedEvent>,
{
    let mut groups: IndexMap<MonthKey, MonthGroup> = IndexMap::new();

    for dated in events {
        // The parser only accepts months in the range 1-12.
        let key = MonthKey {
            year: dated.parsed.year,
            month: dated.parsed.month,
        };

        let sort_key = dated.parsed.sort_key;

        groups
            .entry(key)
            .or_insert_with(|| MonthGroup {
                key,
                month: key.month_name(),
                year: key.year,
                sort_key,
                events: Vec::new(),
            })
            .events
            .push(dated);
    }

    let mut groups: Vec<MonthGroup> = groups.into_values().collect();

    for group in &mut groups {
        group.events.sort_by_key(|dated| dated.parsed.sort_key);
    }

    groups.sort_by_key(|group| group.sort_key);
    groups
}

/// Returns the first day of the month of `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Retains events ending on or after the first day of the month of `today`.
///
/// Single day events end on their start date, so the end date is always the date compared.
/// Events with unparsable dates are dropped.
pub fn filter_upcoming_events(events: &[Event], today: NaiveDate) -> Vec<Event> {
    let cutoff = first_of_month(today);

    parse_events(events)
        .filter(|dated| dated.parsed.end_date >= cutoff)
        .map(|dated| dated.event)
        .collect()
}
