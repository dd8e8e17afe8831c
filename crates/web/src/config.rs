use std::{net::SocketAddr, path::PathBuf, time::Duration};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "bikeshare", about = "Bike-share station dashboard")]
pub struct Config {
    /// Address the web server listens on.
    #[arg(long, env = "BIKESHARE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Directory served for every path outside of the API.
    #[arg(long, env = "BIKESHARE_WEB_ROOT", default_value = "./resources/www/")]
    pub web_root: PathBuf,

    /// CityBikes network endpoint.
    #[arg(
        long,
        env = "BIKESHARE_FEED_URL",
        default_value = citybikes::DEFAULT_FEED_URL
    )]
    pub feed_url: String,

    /// Seconds between two status polls.
    #[arg(long, env = "BIKESHARE_STATUS_INTERVAL", default_value_t = 60)]
    pub status_interval: u64,

    /// Calendar day the trend charts show.
    #[arg(long, env = "BIKESHARE_TREND_DAY", default_value = "2025-11-18")]
    pub trend_day: NaiveDate,

    /// Serve without polling the feed in the background.
    #[arg(long, env = "BIKESHARE_DISABLE_COLLECTORS")]
    pub disable_collectors: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Runs the web server (default).
    Serve,
    /// Polls the feed and records station status until interrupted.
    Collect {
        /// Records one round of status and exits.
        #[arg(long)]
        once: bool,
    },
    /// Refreshes the station registry once.
    SyncStations,
    /// Replaces one day of snapshots with random hourly data.
    SeedSnapshots {
        /// Day to seed, defaults to yesterday (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

impl Config {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval.max(1))
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
