use std::{error::Error, fmt::Display, time::Duration};

use chrono::Utc;
use dashboard::{
    client::{Client, NamedReading, StatusReport},
    database::Database,
    RequestError,
};
use model::station::{Reading, Station};
use serde::Deserialize;

pub mod collector;

pub const DEFAULT_FEED_URL: &str = "https://api.citybik.es/v2/networks/pittsburgh";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum FeedError {
    Http(reqwest::Error),
    Request(RequestError),
}

impl Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(why) => write!(f, "feed unavailable: {}", why),
            Self::Request(why) => write!(f, "could not store feed data: {}", why),
        }
    }
}

impl Error for FeedError {}

impl From<reqwest::Error> for FeedError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<RequestError> for FeedError {
    fn from(value: RequestError) -> Self {
        Self::Request(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkResponse {
    pub network: Network,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub stations: Vec<FeedStation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedStation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub free_bikes: Option<i32>,
    pub empty_slots: Option<i32>,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Extra {
    pub slots: Option<i32>,
}

impl FeedStation {
    pub fn to_station(&self) -> Station {
        Station {
            name: self.name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            slots: self.extra.slots.unwrap_or(0),
        }
    }

    pub fn to_reading(&self) -> NamedReading {
        NamedReading {
            name: self.name.clone(),
            reading: Reading {
                free_bikes: self.free_bikes.unwrap_or(0),
                empty_slots: self.empty_slots.unwrap_or(0),
            },
        }
    }
}

impl NetworkResponse {
    pub fn stations(&self) -> Vec<Station> {
        self.network.stations.iter().map(FeedStation::to_station).collect()
    }

    pub fn readings(&self) -> Vec<NamedReading> {
        self.network.stations.iter().map(FeedStation::to_reading).collect()
    }
}

/// A CityBikes network endpoint.
#[derive(Debug, Clone)]
pub struct Feed {
    url: String,
    http: reqwest::Client,
}

impl Feed {
    pub fn new<S: Into<String>>(url: S) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<NetworkResponse, FeedError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }

    /// Upserts every station of the network into the registry.
    pub async fn sync_stations<D: Database>(&self, client: &Client<D>) -> Result<usize, FeedError> {
        let response = self.fetch().await?;
        let count = client.sync_stations(response.stations()).await?;
        log::info!("synced {} stations from {}", count, self.url);
        Ok(count)
    }

    /// Records the current counts of all registered stations.
    pub async fn record_status<D: Database>(
        &self,
        client: &Client<D>,
    ) -> Result<StatusReport, FeedError> {
        let response = self.fetch().await?;
        let report = client.record_status(response.readings(), Utc::now()).await?;
        if report.skipped > 0 {
            log::debug!("skipped {} unregistered stations", report.skipped);
        }
        Ok(report)
    }

    /// Fills an empty registry with the stations and one round of status.
    pub async fn bootstrap<D: Database>(&self, client: &Client<D>) -> Result<(), FeedError> {
        if client.has_stations().await? {
            return Ok(());
        }
        self.sync_stations(client).await?;
        self.record_status(client).await?;
        Ok(())
    }
}
