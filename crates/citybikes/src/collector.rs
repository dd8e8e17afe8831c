use std::time::Duration;

use async_trait::async_trait;
use dashboard::{
    client::Client,
    collector::{Collector, Continuation, SupervisionStrategy},
    database::Database,
};

use crate::{Feed, FeedError};

pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Refreshes the station registry once, then exits.
pub struct StationsCollector {
    feed: Feed,
}

impl StationsCollector {
    pub fn new(feed: Feed) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl Collector for StationsCollector {
    type Error = FeedError;

    fn name(&self) -> &'static str {
        "CityBikes Stations"
    }

    async fn run<D: Database>(&mut self, client: &Client<D>) -> Result<Continuation, Self::Error> {
        self.feed.sync_stations(client).await?;
        Ok(Continuation::Exit)
    }

    fn tick(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    fn on_error(&self, error: &Self::Error) -> SupervisionStrategy {
        log::warn!("could not sync stations: {}", error);
        SupervisionStrategy::Resume
    }
}

/// Records a status log and a snapshot of every registered station per tick.
pub struct StatusCollector {
    feed: Feed,
    interval: Duration,
}

impl StatusCollector {
    pub fn new(feed: Feed, interval: Duration) -> Self {
        Self { feed, interval }
    }
}

#[async_trait]
impl Collector for StatusCollector {
    type Error = FeedError;

    fn name(&self) -> &'static str {
        "CityBikes Status"
    }

    async fn run<D: Database>(&mut self, client: &Client<D>) -> Result<Continuation, Self::Error> {
        let report = self.feed.record_status(client).await?;
        log::info!(
            "recorded {} status logs and {} new snapshots",
            report.status_logs,
            report.snapshots
        );
        Ok(Continuation::Continue)
    }

    fn tick(&self) -> Option<Duration> {
        Some(self.interval)
    }

    fn backoff(&self, last_backoff: Duration) -> Duration {
        (last_backoff * 2).min(self.interval * 10)
    }

    fn on_error(&self, error: &Self::Error) -> SupervisionStrategy {
        log::warn!("could not record station status: {}", error);
        SupervisionStrategy::Resume
    }
}
