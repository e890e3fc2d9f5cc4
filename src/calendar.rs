pub mod date;
pub mod google;
pub mod grouping;
pub mod metadata;
pub mod templating;

use super::Result;
use crate::{Error, SourceConfig};
use async_trait::async_trait;
use chrono::NaiveDate;
use google::GoogleSheetsClient;
use indexmap::IndexMap;
use metadata::CalendarMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A single row of an events sheet.
///
/// Which display fields are filled depends on the [`EventKind`] of the calendar.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// The date in one of the encodings understood by [`date::parse_date_string`].
    pub date: String,
    /// Title of a ministry event.
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    /// CSS class applied to the title of a ministry event.
    #[serde(default)]
    pub style: Option<String>,
    /// Title of a fellowship event.
    #[serde(default)]
    pub church_activity: Option<String>,
    #[serde(default)]
    pub fellowship_activity: Option<String>,
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    /// Row of the event in its sheet, the header being row 1.
    #[serde(default, skip_serializing)]
    pub row_index: Option<usize>,
}

impl Event {
    /// Returns the title of the event, whichever kind it is.
    pub fn title(&self) -> Option<&str> {
        [
            &self.event_name,
            &self.church_activity,
            &self.fellowship_activity,
        ]
        .into_iter()
        .find_map(|field| non_empty(field))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.title() {
            Some(title) => write!(f, "{} ({})", title, self.date),
            None => self.date.fmt(f),
        }
    }
}

/// Returns the trimmed field value unless it is missing or blank.
pub(crate) fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// The kind of a calendar. Determines the sheet columns and the card layout.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Columns `Date`, `Event Name`, `Details`, `Time`, `Style`.
    #[default]
    Ministry,
    /// Columns `Date`, `Church Activity`, `Fellowship Activity`, `Leader`, `Detail`.
    Fellowship,
}

impl EventKind {
    /// Parses the `Type` column of the calendar config sheet. Anything but `fellowship` is a
    /// ministry calendar.
    pub fn from_sheet(value: &str) -> EventKind {
        if value.trim().eq_ignore_ascii_case("fellowship") {
            EventKind::Fellowship
        } else {
            EventKind::Ministry
        }
    }

    /// The last sheet column holding event data.
    pub fn last_column(&self) -> char {
        match self {
            EventKind::Ministry => 'E',
            EventKind::Fellowship => 'F',
        }
    }

    /// Whether an event has the fields required to be displayed.
    pub fn is_displayable(&self, event: &Event) -> bool {
        match self {
            EventKind::Ministry => non_empty(&event.event_name).is_some(),
            EventKind::Fellowship => {
                non_empty(&event.church_activity).is_some()
                    || non_empty(&event.fellowship_activity).is_some()
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Ministry => "ministry",
            EventKind::Fellowship => "fellowship",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// One calendar to sync: where its events come from and where it is published.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CalendarTarget {
    /// Spreadsheet holding the events and metadata tabs.
    pub events_sheet: String,
    pub events_tab: String,
    pub metadata_tab: String,
    /// Notion page the rendered calendar is published to.
    pub notion_page: String,
    #[serde(default, rename = "type")]
    pub kind: EventKind,
}

impl fmt::Display for CalendarTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.events_tab, self.notion_page)
    }
}

/// Trait that needs to be implemented by a source of calendars.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Fetches the list of calendars to sync. An empty list means the source has no
    /// configuration of its own.
    async fn fetch_targets(&self) -> Result<Vec<CalendarTarget>>;

    /// Fetches the displayable events of a calendar.
    async fn fetch_events(&self, target: &CalendarTarget) -> Result<Vec<Event>>;

    /// Fetches the metadata of a calendar. Sources fall back to
    /// [`CalendarMetadata::fallback`] instead of failing.
    async fn fetch_metadata(&self, target: &CalendarTarget, today: NaiveDate) -> CalendarMetadata;

    /// Fetches the last modification time of the calendar's spreadsheet.
    async fn fetch_modified_time(&self, target: &CalendarTarget) -> Result<String>;
}

/// A calendar in a static calendar file.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StaticCalendar {
    #[serde(flatten)]
    pub target: CalendarTarget,
    #[serde(default)]
    pub metadata: Option<CalendarMetadata>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Deserialize)]
struct StaticCalendarFile {
    #[serde(default)]
    calendars: Vec<StaticCalendar>,
}

/// A `CalendarSource` that serves calendars from memory, e.g. loaded from a JSON file.
pub struct StaticCalendarSource {
    calendars: IndexMap<(String, String), StaticCalendar>,
}

impl StaticCalendarSource {
    /// Creates a new `StaticCalendarSource` from an iterator.
    pub fn new<I>(iter: I) -> StaticCalendarSource
    where
        I: IntoIterator<Item = StaticCalendar>,
    {
        StaticCalendarSource {
            calendars: iter
                .into_iter()
                .map(|calendar| (Self::key(&calendar.target), calendar))
                .collect(),
        }
    }

    /// Loads calendars from a JSON file of the form `{"calendars": [...]}`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<StaticCalendarSource> {
        let contents = fs::read_to_string(path)?;
        let file: StaticCalendarFile = serde_json::from_str(&contents)?;
        Ok(StaticCalendarSource::new(file.calendars))
    }

    fn key(target: &CalendarTarget) -> (String, String) {
        (target.events_sheet.clone(), target.events_tab.clone())
    }

    fn get(&self, target: &CalendarTarget) -> Result<&StaticCalendar> {
        self.calendars
            .get(&Self::key(target))
            .ok_or_else(|| Error::UnknownCalendar(target.to_string()))
    }
}

#[async_trait]
impl CalendarSource for StaticCalendarSource {
    async fn fetch_targets(&self) -> Result<Vec<CalendarTarget>> {
        Ok(self
            .calendars
            .values()
            .map(|calendar| calendar.target.clone())
            .collect())
    }

    async fn fetch_events(&self, target: &CalendarTarget) -> Result<Vec<Event>> {
        let calendar = self.get(target)?;

        Ok(calendar
            .events
            .iter()
            .filter(|event| target.kind.is_displayable(event))
            .cloned()
            .collect())
    }

    async fn fetch_metadata(&self, target: &CalendarTarget, today: NaiveDate) -> CalendarMetadata {
        self.get(target)
            .ok()
            .and_then(|calendar| calendar.metadata.clone())
            .unwrap_or_else(|| CalendarMetadata::fallback(today))
    }

    async fn fetch_modified_time(&self, target: &CalendarTarget) -> Result<String> {
        Ok(self.get(target)?.modified_time.clone().unwrap_or_default())
    }
}

/// A `CalendarSource` backed by the Google Sheets and Drive APIs.
#[derive(Debug)]
pub struct GoogleSheetsCalendarSource {
    client: GoogleSheetsClient,
    config_sheet: String,
    config_tab: String,
}

impl GoogleSheetsCalendarSource {
    /// Creates a new source reading its calendar list from `config_tab` of `config_sheet`.
    pub async fn new(config_sheet: String, config_tab: String) -> Result<GoogleSheetsCalendarSource> {
        Ok(GoogleSheetsCalendarSource {
            client: GoogleSheetsClient::new().await?,
            config_sheet,
            config_tab,
        })
    }
}

#[async_trait]
impl CalendarSource for GoogleSheetsCalendarSource {
    async fn fetch_targets(&self) -> Result<Vec<CalendarTarget>> {
        let rows = self
            .client
            .get_values(&self.config_sheet, &format!("{}!A1:E", self.config_tab))
            .await?;

        Ok(google::records::calendar_targets(rows))
    }

    async fn fetch_events(&self, target: &CalendarTarget) -> Result<Vec<Event>> {
        let range = format!("{}!A1:{}", target.events_tab, target.kind.last_column());
        let rows = self.client.get_values(&target.events_sheet, &range).await?;

        if rows.is_empty() {
            return Err(Error::EmptySheet(target.events_tab.clone()));
        }

        Ok(google::records::events(rows)
            .into_iter()
            .filter(|event| target.kind.is_displayable(event))
            .collect())
    }

    async fn fetch_metadata(&self, target: &CalendarTarget, today: NaiveDate) -> CalendarMetadata {
        let range = format!("{}!A1:B", target.metadata_tab);

        match self.client.get_values(&target.events_sheet, &range).await {
            Ok(rows) => CalendarMetadata::from_rows(&rows, today),
            Err(err) => {
                log::warn!("failed to fetch calendar metadata: {err}");
                CalendarMetadata::fallback(today)
            }
        }
    }

    async fn fetch_modified_time(&self, target: &CalendarTarget) -> Result<String> {
        Ok(self.client.get_modified_time(&target.events_sheet).await?)
    }
}

#[async_trait]
impl<T> CalendarSource for Box<T>
where
    T: CalendarSource + ?Sized,
{
    async fn fetch_targets(&self) -> Result<Vec<CalendarTarget>> {
        (**self).fetch_targets().await
    }

    async fn fetch_events(&self, target: &CalendarTarget) -> Result<Vec<Event>> {
        (**self).fetch_events(target).await
    }

    async fn fetch_metadata(&self, target: &CalendarTarget, today: NaiveDate) -> CalendarMetadata {
        (**self).fetch_metadata(target, today).await
    }

    async fn fetch_modified_time(&self, target: &CalendarTarget) -> Result<String> {
        (**self).fetch_modified_time(target).await
    }
}

#[async_trait]
impl<T> CalendarSource for Arc<T>
where
    T: CalendarSource + ?Sized,
{
    async fn fetch_targets(&self) -> Result<Vec<CalendarTarget>> {
        (**self).fetch_targets().await
    }

    async fn fetch_events(&self, target: &CalendarTarget) -> Result<Vec<Event>> {
        (**self).fetch_events(target).await
    }

    async fn fetch_metadata(&self, target: &CalendarTarget, today: NaiveDate) -> CalendarMetadata {
        (**self).fetch_metadata(target, today).await
    }

    async fn fetch_modified_time(&self, target: &CalendarTarget) -> Result<String> {
        (**self).fetch_modified_time(target).await
    }
}

/// Creates the calendar source selected in the configuration.
pub async fn source_from_config(config: &SourceConfig) -> Result<Box<dyn CalendarSource>> {
    let source: Box<dyn CalendarSource> = match config {
        SourceConfig::GoogleSheets {
            config_sheet_id,
            config_tab,
        } => Box::new(
            GoogleSheetsCalendarSource::new(config_sheet_id.clone(), config_tab.clone()).await?,
        ),
        SourceConfig::Static { path } => {
            log::info!("loading calendars from {}", path.display());
            Box::new(StaticCalendarSource::from_path(path)?)
        }
    };

    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(tab: &str, kind: EventKind) -> CalendarTarget {
        CalendarTarget {
            events_sheet: "sheet".into(),
            events_tab: tab.into(),
            metadata_tab: "Metadata".into(),
            notion_page: "page".into(),
            kind,
        }
    }

    #[test]
    fn displayable_events() {
        let ministry = Event {
            date: "3/5/2026".into(),
            event_name: Some("Prayer meeting".into()),
            ..Default::default()
        };
        let fellowship = Event {
            date: "3/5/2026".into(),
            fellowship_activity: Some("Bible study".into()),
            ..Default::default()
        };
        let blank = Event {
            date: "3/5/2026".into(),
            event_name: Some("  ".into()),
            ..Default::default()
        };

        assert!(EventKind::Ministry.is_displayable(&ministry));
        assert!(!EventKind::Ministry.is_displayable(&fellowship));
        assert!(!EventKind::Ministry.is_displayable(&blank));
        assert!(EventKind::Fellowship.is_displayable(&fellowship));
        assert!(!EventKind::Fellowship.is_displayable(&ministry));
    }

    #[test]
    fn event_kind_from_sheet() {
        assert_eq!(EventKind::from_sheet("fellowship"), EventKind::Fellowship);
        assert_eq!(EventKind::from_sheet(" Fellowship "), EventKind::Fellowship);
        assert_eq!(EventKind::from_sheet("ministry"), EventKind::Ministry);
        assert_eq!(EventKind::from_sheet(""), EventKind::Ministry);
    }

    #[test]
    fn event_display() {
        let event = Event {
            date: "3/5/2026".into(),
            church_activity: Some("Picnic".into()),
            ..Default::default()
        };

        assert_eq!(event.to_string(), "Picnic (3/5/2026)");
    }

    #[tokio::test]
    async fn static_source() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let source = StaticCalendarSource::new([StaticCalendar {
            target: target("2026 Events", EventKind::Ministry),
            metadata: None,
            modified_time: Some("2026-03-01T10:00:00Z".into()),
            events: vec![
                Event {
                    date: "3/5/2026".into(),
                    event_name: Some("Prayer meeting".into()),
                    ..Default::default()
                },
                Event {
                    date: "3/6/2026".into(),
                    ..Default::default()
                },
            ],
        }]);

        let targets = source.fetch_targets().await.unwrap();
        assert_eq!(targets, vec![target("2026 Events", EventKind::Ministry)]);

        let events = source.fetch_events(&targets[0]).await.unwrap();
        assert_eq!(events.len(), 1);

        assert_eq!(
            source.fetch_metadata(&targets[0], today).await,
            CalendarMetadata::fallback(today)
        );
        assert_eq!(
            source.fetch_modified_time(&targets[0]).await.unwrap(),
            "2026-03-01T10:00:00Z"
        );

        let unknown = target("2025 Events", EventKind::Ministry);
        assert!(matches!(
            source.fetch_events(&unknown).await,
            Err(Error::UnknownCalendar(_))
        ));
    }

    #[tokio::test]
    async fn demo_calendar_file() {
        let source = StaticCalendarSource::from_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/demos/calendars.json"
        ))
        .unwrap();

        let targets = source.fetch_targets().await.unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].kind, EventKind::Fellowship);

        let today = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let metadata = source.fetch_metadata(&targets[0], today).await;
        assert_eq!(metadata.title, "2026 Church Calendar");
        assert_eq!(metadata.month_notes.len(), 1);
    }

    #[test]
    fn static_calendar_file() {
        let file: StaticCalendarFile = serde_json::from_str(
            r#"{
                "calendars": [{
                    "events_sheet": "sheet",
                    "events_tab": "Fellowship",
                    "metadata_tab": "Metadata",
                    "notion_page": "page",
                    "type": "fellowship",
                    "events": [
                        {"date": "3/18-19/2026", "churchActivity": "Retreat", "leader": "Grace"}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let calendar = &file.calendars[0];
        assert_eq!(calendar.target.kind, EventKind::Fellowship);
        assert_eq!(calendar.events[0].church_activity.as_deref(), Some("Retreat"));
        assert_eq!(calendar.events[0].leader.as_deref(), Some("Grace"));
        assert!(calendar.metadata.is_none());
    }
}
