//! Conversion of sheet rows into records keyed by the header row.

use crate::calendar::{CalendarTarget, Event, EventKind};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Converts a header cell into a camelCase field name, e.g. `Event Name` into `eventName`.
///
/// The first character is lower-cased, the first character of every following word is
/// upper-cased and whitespace is removed. Capitals inside a word are kept.
pub fn to_camel_case(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut prev_is_word = false;

    for (i, c) in header.chars().enumerate() {
        let is_word = c.is_ascii_alphanumeric() || c == '_';

        if c.is_whitespace() {
            // dropped
        } else if i == 0 && is_word {
            out.push(c.to_ascii_lowercase());
        } else if is_word && !prev_is_word {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }

        prev_is_word = is_word;
    }

    out
}

/// Maps column indices to field names.
pub fn header_map(header: &[String]) -> Vec<String> {
    header.iter().map(|cell| to_camel_case(cell)).collect()
}

/// Converts a data row into a record. Returns `None` for empty rows.
///
/// `index` is the index of the row below the header, so the record's `rowIndex` is the sheet row
/// number.
pub fn row_to_record(row: &[String], index: usize, fields: &[String]) -> Option<IndexMap<String, String>> {
    if row.is_empty() {
        return None;
    }

    let mut record: IndexMap<String, String> = fields
        .iter()
        .zip(row)
        .map(|(field, value)| (field.clone(), value.trim().to_owned()))
        .collect();

    record.insert("rowIndex".to_owned(), (index + 2).to_string());

    Some(record)
}

/// Converts all rows below the header into records.
pub fn records(mut rows: Vec<Vec<String>>) -> Vec<IndexMap<String, String>> {
    if rows.is_empty() {
        return Vec::new();
    }

    let fields = header_map(&rows.remove(0));

    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| row_to_record(row, index, &fields))
        .collect()
}

/// Converts the rows of an events tab into events. Rows without a date can't be placed on the
/// calendar and are dropped.
pub fn events(rows: Vec<Vec<String>>) -> Vec<Event> {
    records(rows)
        .into_iter()
        .filter_map(|record| {
            let row_index = record.get("rowIndex").and_then(|i| i.parse().ok());
            let object: Map<String, Value> = record
                .into_iter()
                .filter(|(key, value)| key != "rowIndex" && !value.is_empty())
                .map(|(key, value)| (key, Value::String(value)))
                .collect();

            match serde_json::from_value::<Event>(Value::Object(object)) {
                Ok(event) => Some(Event { row_index, ..event }),
                Err(err) => {
                    log::info!("skipping row {}: {err}", row_index.unwrap_or_default());
                    None
                }
            }
        })
        .collect()
}

/// Converts the rows of the calendar config tab into calendar targets, skipping rows that miss
/// any of the required columns.
pub fn calendar_targets(rows: Vec<Vec<String>>) -> Vec<CalendarTarget> {
    if rows.is_empty() {
        log::info!("no calendar config found");
        return Vec::new();
    }

    let targets: Vec<CalendarTarget> = records(rows)
        .into_iter()
        .filter_map(|record| {
            let field = |name: &str| record.get(name).filter(|value| !value.is_empty()).cloned();

            match (
                field("eventsSheet"),
                field("eventsTab"),
                field("metadataTab"),
                field("notionPage"),
            ) {
                (Some(events_sheet), Some(events_tab), Some(metadata_tab), Some(notion_page)) => {
                    Some(CalendarTarget {
                        events_sheet,
                        events_tab,
                        metadata_tab,
                        notion_page,
                        kind: field("type")
                            .map(|kind| EventKind::from_sheet(&kind))
                            .unwrap_or_default(),
                    })
                }
                _ => {
                    log::warn!("skipping invalid calendar config row, missing required fields: {record:?}");
                    None
                }
            }
        })
        .collect();

    log::info!("loaded {} valid calendar config(s) from sheet", targets.len());

    targets
}
