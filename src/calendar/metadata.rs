use super::grouping::MonthKey;
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Title used when the metadata sheet doesn't provide one.
pub const DEFAULT_TITLE: &str = "Event Calendar";

/// Which events a calendar displays.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// All events; the rendered page scrolls to the current month.
    #[default]
    All,
    /// Only events ending in the current month or later.
    Upcoming,
}

impl DisplayMode {
    fn from_sheet(value: &str) -> DisplayMode {
        match value.to_ascii_lowercase().as_str() {
            "upcoming" => DisplayMode::Upcoming,
            "all" => DisplayMode::All,
            other => {
                log::warn!("unknown calendar mode `{other}`, showing all events");
                DisplayMode::All
            }
        }
    }
}

/// Outer spacing of the rendered calendar.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Padding {
    #[default]
    Default,
    None,
}

/// Per-calendar settings maintained in the metadata tab of the events spreadsheet.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CalendarMetadata {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub created: Option<String>,
    pub updated: String,
    #[serde(default)]
    pub mode: DisplayMode,
    #[serde(default)]
    pub padding: Padding,
    /// Notes displayed next to month headings.
    #[serde(default)]
    pub month_notes: IndexMap<MonthKey, String>,
}

impl CalendarMetadata {
    /// Metadata used when the sheet is empty or can't be fetched.
    pub fn fallback(today: NaiveDate) -> CalendarMetadata {
        CalendarMetadata {
            title: DEFAULT_TITLE.to_owned(),
            subtitle: String::new(),
            created: None,
            updated: format_sheet_date(today),
            mode: DisplayMode::All,
            padding: Padding::Default,
            month_notes: IndexMap::new(),
        }
    }

    /// Builds metadata from the rows of a metadata tab. The first row is a header and is skipped.
    ///
    /// Each remaining row is a key/value pair. Keys of the form `March 2026` are month notes,
    /// every other key is matched case-insensitively.
    pub fn from_rows(rows: &[Vec<String>], today: NaiveDate) -> CalendarMetadata {
        let mut metadata = CalendarMetadata::fallback(today);

        if rows.is_empty() {
            log::info!("no calendar metadata found, using defaults");
            return metadata;
        }

        let mut values: HashMap<String, String> = HashMap::new();

        for row in rows.iter().skip(1) {
            let (key, value) = match row.as_slice() {
                [key, value, ..] => (key.trim(), value.trim()),
                _ => continue,
            };

            match key.parse::<MonthKey>() {
                Ok(month) => {
                    metadata.month_notes.insert(month, value.to_owned());
                }
                Err(_) => {
                    values.insert(key.to_lowercase(), value.to_owned());
                }
            }
        }

        let mut take = |key: &str| values.remove(key).filter(|value| !value.is_empty());

        if let Some(title) = take("title") {
            metadata.title = title;
        }
        if let Some(subtitle) = take("subtitle") {
            metadata.subtitle = subtitle;
        }
        metadata.created = take("created").filter(|created| created != "N/A");
        if let Some(updated) = take("updated") {
            metadata.updated = updated;
        }
        if let Some(mode) = take("mode") {
            metadata.mode = DisplayMode::from_sheet(&mode);
        }
        if let Some(padding) = take("padding") {
            metadata.padding = match padding.to_ascii_lowercase().as_str() {
                "none" => Padding::None,
                _ => Padding::Default,
            };
        }

        metadata
    }

    /// Returns the note for a month, if any.
    pub fn month_note(&self, month: &MonthKey) -> Option<&str> {
        self.month_notes.get(month).map(String::as_str)
    }
}

/// Formats a date the way dates are written in the spreadsheets, e.g. `3/5/2026`.
pub fn format_sheet_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}
