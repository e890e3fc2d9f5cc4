use super::grouping::{filter_upcoming_events, group_events_by_month, DatedEvent, MonthGroup};
use super::metadata::{CalendarMetadata, DisplayMode, Padding};
use super::{non_empty, Event, EventKind};
use crate::Result;
use chrono::NaiveDate;
use minijinja::value::{StructObject, Value};
use minijinja::{context, Environment};

const CALENDAR_TEMPLATE: &str = include_str!("../../templates/calendar.html");

/// Title of fellowship events that have neither a church nor a fellowship activity.
const UNTITLED_EVENT: &str = "Event";

/// An event card as seen by the template.
struct EventCard {
    dated: DatedEvent,
    kind: EventKind,
}

impl EventCard {
    fn title(&self) -> &str {
        let event = &self.dated.event;

        match self.kind {
            EventKind::Ministry => non_empty(&event.event_name).unwrap_or_default(),
            EventKind::Fellowship => non_empty(&event.church_activity)
                .or_else(|| non_empty(&event.fellowship_activity))
                .unwrap_or(UNTITLED_EVENT),
        }
    }

    /// The fellowship activity is shown below the title when both activities are set.
    fn subtitle(&self) -> Option<&str> {
        let event = &self.dated.event;

        non_empty(&event.church_activity).and(non_empty(&event.fellowship_activity))
    }
}

impl StructObject for EventCard {
    fn get_field(&self, name: &str) -> Option<Value> {
        let event = &self.dated.event;
        let parsed = &self.dated.parsed;

        let value = match name {
            "kind" => Value::from(self.kind.as_str()),
            "display" => Value::from(parsed.display.as_str()),
            "day_of_week" => Value::from(parsed.day_of_week.as_str()),
            "title" => Value::from(self.title()),
            "subtitle" => Value::from(self.subtitle()?),
            "style" => Value::from(non_empty(&event.style)?),
            "details" => {
                let lines: Vec<Value> = non_empty(&event.details)?
                    .lines()
                    .map(Value::from)
                    .collect();
                Value::from(lines)
            }
            "time" => Value::from(non_empty(&event.time)?),
            "leader" => Value::from(non_empty(&event.leader)?),
            "detail" => Value::from(non_empty(&event.detail)?),
            _ => return None,
        };

        Some(value)
    }
}

/// Renders calendar fragments. A renderer is created per sync run and reused for all calendars.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Renderer> {
        let mut env = Environment::new();
        env.add_template("calendar.html", CALENDAR_TEMPLATE)?;
        Ok(Renderer { env })
    }

    /// Renders the calendar HTML for `events`.
    ///
    /// In [`DisplayMode::Upcoming`] events that ended before the month of `today` are left out.
    pub fn render(
        &self,
        events: &[Event],
        metadata: &CalendarMetadata,
        kind: EventKind,
        today: NaiveDate,
    ) -> Result<String> {
        let groups = match metadata.mode {
            DisplayMode::All => group_events_by_month(events),
            DisplayMode::Upcoming => {
                let upcoming = filter_upcoming_events(events, today);
                log::info!(
                    "filtered to {} upcoming events (from {} total)",
                    upcoming.len(),
                    events.len()
                );
                group_events_by_month(&upcoming)
            }
        };

        let months: Vec<Value> = groups
            .into_iter()
            .map(|group| month_section(group, metadata, kind))
            .collect();

        let html = self.env.get_template("calendar.html")?.render(context! {
            title => &metadata.title,
            subtitle => &metadata.subtitle,
            created => &metadata.created,
            updated => &metadata.updated,
            padded => metadata.padding == Padding::Default,
            scroll => metadata.mode == DisplayMode::All,
            months => months,
        })?;

        Ok(html)
    }
}

fn month_section(group: MonthGroup, metadata: &CalendarMetadata, kind: EventKind) -> Value {
    let events: Vec<Value> = group
        .events
        .into_iter()
        .map(|dated| Value::from_struct_object(EventCard { dated, kind }))
        .collect();

    context! {
        heading => group.key.to_string(),
        note => metadata.month_note(&group.key),
        events => events,
    }
}

/// Renders a calendar with a one-off [`Renderer`].
pub fn render_calendar(
    events: &[Event],
    metadata: &CalendarMetadata,
    kind: EventKind,
    today: NaiveDate,
) -> Result<String> {
    Renderer::new()?.render(events, metadata, kind, today)
}
