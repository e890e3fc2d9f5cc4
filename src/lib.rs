use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod calendar;
pub mod publish;
pub mod sync;

/// Result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by all fallible operations within this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("google API error: {0}")]
    Google(#[from] calendar::google::ClientError),
    #[error("notion API error: {0}")]
    Notion(#[from] publish::notion::NotionError),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("no event data found in {0}")]
    EmptySheet(String),
    #[error("unknown calendar {0}")]
    UnknownCalendar(String),
}

/// Where calendars and their events are read from.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceConfig {
    /// Read the calendar list from a config tab and events from the sheets it names.
    GoogleSheets {
        /// Spreadsheet holding the calendar config tab.
        config_sheet_id: String,
        /// Name of the calendar config tab.
        #[serde(default = "default_config_tab")]
        config_tab: String,
    },
    /// Read calendars from a local JSON file.
    Static {
        path: PathBuf,
    },
}

fn default_config_tab() -> String {
    "CalendarConfig".into()
}

/// Where rendered calendars are published to.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PublisherConfig {
    /// Replace the content of each calendar's Notion page.
    Notion,
    /// Write `<notion page>.html` files to a directory.
    Directory { output_dir: PathBuf },
    /// Print calendars to stdout.
    Stdout,
}

/// Sync loop configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SyncConfig {
    /// Delay between two calendars in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl SyncConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    sync::DEFAULT_REQUEST_DELAY.as_millis() as u64
}

/// Global application configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AppConfig {
    /// Sync configuration section.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Calendar source section.
    pub source: SourceConfig,
    /// Publisher section.
    pub publisher: PublisherConfig,
    /// Calendars to sync when the source doesn't list any.
    #[serde(default)]
    pub fallback_calendars: Vec<calendar::CalendarTarget>,
}

impl AppConfig {
    /// Loads the application configuration from files in the `config/` directory and environment
    /// variables.
    pub fn load() -> Result<AppConfig> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        log::info!("loading configuration using {} environment", app_env);

        let config = Config::builder()
            // Configuration defaults from `config/default.toml`.
            .add_source(File::with_name("config/default"))
            // Optional environment specific config overrides, e.g. `config/production.toml`.
            .add_source(File::with_name(&format!("config/{}", app_env)).required(false))
            // Optional local config overrides from `config/local.toml` (on .gitignore).
            .add_source(File::with_name("config/local").required(false))
            // Config from environment variables prefixed with `CC_`, e.g.
            // `CC_SOURCE__CONFIG_SHEET_ID`.
            .add_source(
                Environment::with_prefix("CC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        log::debug!("loaded configuration: {:?}", config);

        Ok(config)
    }
}
