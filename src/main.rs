use chrono::{Local, NaiveDate};
use church_calendar::calendar::{source_from_config, StaticCalendarSource};
use church_calendar::publish::{publisher_from_config, DirectoryPublisher, Publisher, StdoutPublisher};
use church_calendar::sync::{CalendarSync, SyncReport};
use church_calendar::{AppConfig, PublisherConfig};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync all configured calendars from their source and publish them
    Sync {
        /// Write calendars to this directory instead of the configured publisher
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Print calendars to stdout instead of the configured publisher
        #[arg(long, conflicts_with = "output_dir")]
        stdout: bool,

        /// Date used as "today", e.g. 2026-03-05
        #[arg(long, value_name = "DATE")]
        today: Option<NaiveDate>,
    },
    /// Render the calendars of a local JSON file without any remote access
    Render {
        /// Path to the calendar file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write calendars to this directory instead of stdout
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Date used as "today", e.g. 2026-03-05
        #[arg(long, value_name = "DATE")]
        today: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv().ok();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            log::error!("{} calendar(s) failed to sync", report.failed.len());
            ExitCode::FAILURE
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> church_calendar::Result<SyncReport> {
    match command {
        Command::Sync {
            output_dir,
            stdout,
            today,
        } => {
            let config = AppConfig::load()?;

            let publisher_config = match (output_dir, stdout) {
                (Some(output_dir), _) => PublisherConfig::Directory { output_dir },
                (None, true) => PublisherConfig::Stdout,
                (None, false) => config.publisher.clone(),
            };

            let source = source_from_config(&config.source).await?;
            let publisher = publisher_from_config(&publisher_config, config.sync.request_delay())?;

            CalendarSync::new(source, publisher)?
                .with_fallback(config.fallback_calendars.clone())
                .with_delay(config.sync.request_delay())
                .run(today.unwrap_or_else(local_today))
                .await
        }
        Command::Render {
            file,
            output_dir,
            today,
        } => {
            log::info!("loading calendars from {}", file.display());
            let source = StaticCalendarSource::from_path(&file)?;

            let publisher: Box<dyn Publisher> = match output_dir {
                Some(dir) => Box::new(DirectoryPublisher::new(dir)),
                None => Box::new(StdoutPublisher),
            };

            CalendarSync::new(source, publisher)?
                .with_delay(Default::default())
                .run(today.unwrap_or_else(local_today))
                .await
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
