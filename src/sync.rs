//! Synchronization of calendars from their source to their publisher.
//!
//! Calendars are processed one at a time with a fixed delay between them to stay below the rate
//! limits of the upstream APIs. A failing calendar is logged and skipped; it is picked up again by
//! the next run.

use crate::calendar::templating::Renderer;
use crate::calendar::{CalendarSource, CalendarTarget};
use crate::publish::Publisher;
use crate::Result;
use chrono::NaiveDate;
use std::time::Duration;

/// Default delay between two calendars.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(350);

/// Outcome of a single calendar sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// The calendar was rendered and published.
    Published,
    /// The calendar has no events and was left untouched.
    Skipped,
}

/// Summary of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub published: Vec<CalendarTarget>,
    pub skipped: Vec<CalendarTarget>,
    pub failed: Vec<CalendarTarget>,
}

impl SyncReport {
    /// Whether every calendar was synced without error.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Syncs calendars from a source to a publisher.
pub struct CalendarSync<S, P> {
    source: S,
    publisher: P,
    renderer: Renderer,
    fallback: Vec<CalendarTarget>,
    delay: Duration,
}

impl<S, P> CalendarSync<S, P>
where
    S: CalendarSource,
    P: Publisher,
{
    pub fn new(source: S, publisher: P) -> Result<CalendarSync<S, P>> {
        Ok(CalendarSync {
            source,
            publisher,
            renderer: Renderer::new()?,
            fallback: Vec::new(),
            delay: DEFAULT_REQUEST_DELAY,
        })
    }

    /// Calendars to sync when the source doesn't provide any.
    pub fn with_fallback(mut self, fallback: Vec<CalendarTarget>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Delay after each published calendar.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fetches the list of calendars, falling back to the configured calendars if the source
    /// has none.
    async fn targets(&self) -> Result<Vec<CalendarTarget>> {
        let targets = self.source.fetch_targets().await?;

        if targets.is_empty() {
            log::info!("no valid calendar config from source, using fallback config");
            Ok(self.fallback.clone())
        } else {
            log::info!("using calendar config from source");
            Ok(targets)
        }
    }

    /// Syncs a single calendar.
    pub async fn sync_one(&self, target: &CalendarTarget, today: NaiveDate) -> Result<SyncStatus> {
        log::info!("processing calendar {target}");

        let modified_time = self.source.fetch_modified_time(target).await?;
        log::info!("sheet last modified: {modified_time}");
        log::info!("calendar type: {}", target.kind);

        let events = self.source.fetch_events(target).await?;
        let metadata = self.source.fetch_metadata(target, today).await;

        if events.is_empty() {
            log::info!("no events found in {}", target.events_tab);
            return Ok(SyncStatus::Skipped);
        }

        log::info!("found {} events, generating calendar HTML", events.len());

        let html = self.renderer.render(&events, &metadata, target.kind, today)?;
        self.publisher
            .publish(target, &html, &metadata, &modified_time)
            .await?;

        log::info!("calendar updated successfully for {}", target.events_tab);
        Ok(SyncStatus::Published)
    }

    /// Syncs all calendars once. Only a failure to fetch the calendar list aborts the run.
    pub async fn run(&self, today: NaiveDate) -> Result<SyncReport> {
        let targets = match self.targets().await {
            Ok(targets) => targets,
            Err(err) => {
                log::error!("failed to fetch calendar config: {err}");
                if self.fallback.is_empty() {
                    return Err(err);
                }
                self.fallback.clone()
            }
        };

        let mut report = SyncReport::default();

        for target in targets {
            match self.sync_one(&target, today).await {
                Ok(SyncStatus::Published) => {
                    report.published.push(target);
                    tokio::time::sleep(self.delay).await;
                }
                Ok(SyncStatus::Skipped) => report.skipped.push(target),
                Err(err) => {
                    log::error!("failed to sync calendar for {}: {err}", target.events_tab);
                    report.failed.push(target);
                }
            }
        }

        log::info!(
            "calendar sync finished: {} published, {} skipped, {} failed",
            report.published.len(),
            report.skipped.len(),
            report.failed.len()
        );

        Ok(report)
    }
}
