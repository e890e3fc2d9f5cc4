pub mod notion;

use crate::calendar::metadata::CalendarMetadata;
use crate::calendar::CalendarTarget;
use crate::{PublisherConfig, Result};
use async_trait::async_trait;
use notion::NotionPublisher;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Trait that needs to be implemented by a destination for rendered calendars.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes the rendered calendar of `target`. `modified_time` is the last modification time
    /// of the calendar's spreadsheet.
    async fn publish(
        &self,
        target: &CalendarTarget,
        html: &str,
        metadata: &CalendarMetadata,
        modified_time: &str,
    ) -> Result<()>;
}

/// Writes each calendar to `<dir>/<notion page>.html`.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    dir: PathBuf,
}

impl DirectoryPublisher {
    pub fn new<P: Into<PathBuf>>(dir: P) -> DirectoryPublisher {
        DirectoryPublisher { dir: dir.into() }
    }

    /// The file a calendar is written to. Path separators in the page id are replaced.
    pub fn path_for(&self, target: &CalendarTarget) -> PathBuf {
        let name: String = target
            .notion_page
            .chars()
            .map(|c| if std::path::is_separator(c) { '_' } else { c })
            .collect();

        self.dir.join(format!("{name}.html"))
    }
}

#[async_trait]
impl Publisher for DirectoryPublisher {
    async fn publish(
        &self,
        target: &CalendarTarget,
        html: &str,
        _metadata: &CalendarMetadata,
        _modified_time: &str,
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(target);
        tokio::fs::write(&path, html).await?;

        log::info!("wrote calendar {} to {}", target, path.display());
        Ok(())
    }
}

/// Prints calendars to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutPublisher;

#[async_trait]
impl Publisher for StdoutPublisher {
    async fn publish(
        &self,
        target: &CalendarTarget,
        html: &str,
        _metadata: &CalendarMetadata,
        _modified_time: &str,
    ) -> Result<()> {
        log::debug!("printing calendar {target}");

        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{html}")?;
        stdout.flush()?;
        Ok(())
    }
}

#[async_trait]
impl<T> Publisher for Box<T>
where
    T: Publisher + ?Sized,
{
    async fn publish(
        &self,
        target: &CalendarTarget,
        html: &str,
        metadata: &CalendarMetadata,
        modified_time: &str,
    ) -> Result<()> {
        (**self).publish(target, html, metadata, modified_time).await
    }
}

#[async_trait]
impl<T> Publisher for Arc<T>
where
    T: Publisher + ?Sized,
{
    async fn publish(
        &self,
        target: &CalendarTarget,
        html: &str,
        metadata: &CalendarMetadata,
        modified_time: &str,
    ) -> Result<()> {
        (**self).publish(target, html, metadata, modified_time).await
    }
}

/// Creates the publisher selected in the configuration. `delay` is waited between requests to
/// remote APIs.
pub fn publisher_from_config(
    config: &PublisherConfig,
    delay: Duration,
) -> Result<Box<dyn Publisher>> {
    let publisher: Box<dyn Publisher> = match config {
        PublisherConfig::Notion => Box::new(NotionPublisher::new(delay)?),
        PublisherConfig::Directory { output_dir } => {
            Box::new(DirectoryPublisher::new(output_dir.clone()))
        }
        PublisherConfig::Stdout => Box::new(StdoutPublisher),
    };

    Ok(publisher)
}
