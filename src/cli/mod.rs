mod report;
mod track;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::TrackerConfig;
use crate::services::{Aggregator, UsageStore};
use crate::types::{Result, ScreentrackError};
use report::UsageReport;
use track::TrackArgs;

/// Foreground application screen time tracker
#[derive(Parser)]
#[command(name = "screentrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Usage store path (default: ~/.screentrack/usage.json)
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Track foreground app usage until Ctrl-C (default)
    Track(TrackArgs),

    /// Show today's usage
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show lifetime top apps
    Top {
        /// Number of apps to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show usage for one day
    Daily {
        /// Date as YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ScreentrackError::Parse(format!("expected YYYY-MM-DD: {}", e)))
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(self) -> anyhow::Result<()> {
        let config = TrackerConfig::load_default()?;
        let store = match self.store.or_else(|| config.store_path.clone()) {
            Some(path) => UsageStore::with_path(path),
            None => UsageStore::new()?,
        };

        match self.command {
            None => TrackArgs::default().run(config, store),
            Some(Commands::Track(args)) => args.run(config, store),
            Some(Commands::Today { json }) => {
                let aggregator = load_aggregator(&store)?;
                UsageReport::for_date(&aggregator, Local::now().date_naive()).print(json)
            }
            Some(Commands::Top { limit, json }) => {
                let aggregator = load_aggregator(&store)?;
                UsageReport::lifetime(&aggregator, limit.unwrap_or(config.top_limit)).print(json)
            }
            Some(Commands::Daily { date, json }) => {
                let aggregator = load_aggregator(&store)?;
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                UsageReport::for_date(&aggregator, date).print(json)
            }
        }
    }
}

/// Read-only view of the stored usage
fn load_aggregator(store: &UsageStore) -> anyhow::Result<Aggregator> {
    let aggregator = Aggregator::new();
    if !aggregator
        .load(store)
        .with_context(|| format!("failed to read {}", store.path().display()))?
    {
        log::debug!("no usage store at {}", store.path().display());
    }
    Ok(aggregator)
}
