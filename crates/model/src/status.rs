use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{
    id::{HasId, Id},
    serde::hour_minute,
};

use crate::station::{Reading, Station};

/// A per-poll status record. Used for "latest status" lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatusLog {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub empty_slots: i32,
    pub free_bikes: i32,
    pub empty: bool,
    pub full: bool,
    pub station: Id<Station>,
}

impl HasId for StatusLog {
    type IdType = i32;
}

impl StatusLog {
    pub fn record(station: Id<Station>, reading: Reading, at: DateTime<Utc>) -> Self {
        Self {
            date: at.date_naive(),
            time: at.time(),
            empty_slots: reading.empty_slots,
            free_bikes: reading.free_bikes,
            empty: reading.free_bikes == 0,
            full: reading.empty_slots == 0,
            station,
        }
    }
}

/// A deduplicated record of a station's counts, unique per station and
/// timestamp. Trend charts are built from these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    pub station: Id<Station>,
    pub timestamp: DateTime<Utc>,
    pub free_bikes: i32,
    pub empty_slots: i32,
}

impl HasId for Snapshot {
    type IdType = i32;
}

impl Snapshot {
    pub fn record(station: Id<Station>, reading: Reading, at: DateTime<Utc>) -> Self {
        Self {
            station,
            timestamp: at,
            free_bikes: reading.free_bikes,
            empty_slots: reading.empty_slots,
        }
    }
}

/// The free bike counts of the most recent status logs, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecentStatus {
    pub labels: Vec<String>,
    pub values: Vec<i32>,
}

impl RecentStatus {
    /// Expects the logs newest first, as they come out of the database.
    pub fn from_newest_first(logs: Vec<StatusLog>) -> Self {
        let mut recent = Self::default();
        for log in logs.into_iter().rev() {
            recent.labels.push(log.time.format(hour_minute::FORMAT).to_string());
            recent.values.push(log.free_bikes);
        }
        recent
    }
}
