use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dashboard::database::{Result, StatusRepo};
use model::{
    station::Station,
    status::{Snapshot, StatusLog},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::status::{
        delete_snapshots_between, latest_per_station, newest_of_station, put_snapshot,
        put_status_log, snapshots_between,
    },
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct StatusLogRow {
    pub id: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub empty_slots: i32,
    pub free_bikes: i32,
    pub is_empty: bool,
    pub is_full: bool,
    pub station_id: i32,
}

impl DatabaseRow for StatusLogRow {
    type Model = StatusLog;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        StatusLog {
            date: self.date,
            time: self.time,
            empty_slots: self.empty_slots,
            free_bikes: self.free_bikes,
            empty: self.is_empty,
            full: self.is_full,
            station: Id::new(self.station_id),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    pub id: i32,
    pub station_id: i32,
    pub timestamp: DateTime<Utc>,
    pub free_bikes: i32,
    pub empty_slots: i32,
}

impl DatabaseRow for SnapshotRow {
    type Model = Snapshot;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Snapshot {
            station: Id::new(self.station_id),
            timestamp: self.timestamp,
            free_bikes: self.free_bikes,
            empty_slots: self.empty_slots,
        }
    }
}

#[async_trait]
impl StatusRepo for PgDatabaseAutocommit {
    async fn put_status_log(&mut self, log: StatusLog) -> Result<WithId<StatusLog>> {
        put_status_log(&self.pool, log).await
    }

    async fn latest_status_logs(&mut self) -> Result<Vec<StatusLog>> {
        latest_per_station(&self.pool).await
    }

    async fn status_logs_of_station(
        &mut self,
        station: &Id<Station>,
        limit: i64,
    ) -> Result<Vec<StatusLog>> {
        newest_of_station(&self.pool, station, limit).await
    }

    async fn put_snapshot(&mut self, snapshot: Snapshot) -> Result<bool> {
        put_snapshot(&self.pool, snapshot).await
    }

    async fn snapshots_between(
        &mut self,
        station: &Id<Station>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>> {
        snapshots_between(&self.pool, station, start, end).await
    }

    async fn delete_snapshots_between(
        &mut self,
        station: &Id<Station>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        delete_snapshots_between(&self.pool, station, start, end).await
    }
}

#[async_trait]
impl<'a> StatusRepo for PgDatabaseTransaction<'a> {
    async fn put_status_log(&mut self, log: StatusLog) -> Result<WithId<StatusLog>> {
        put_status_log(&mut *self.tx, log).await
    }

    async fn latest_status_logs(&mut self) -> Result<Vec<StatusLog>> {
        latest_per_station(&mut *self.tx).await
    }

    async fn status_logs_of_station(
        &mut self,
        station: &Id<Station>,
        limit: i64,
    ) -> Result<Vec<StatusLog>> {
        newest_of_station(&mut *self.tx, station, limit).await
    }

    async fn put_snapshot(&mut self, snapshot: Snapshot) -> Result<bool> {
        put_snapshot(&mut *self.tx, snapshot).await
    }

    async fn snapshots_between(
        &mut self,
        station: &Id<Station>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>> {
        snapshots_between(&mut *self.tx, station, start, end).await
    }

    async fn delete_snapshots_between(
        &mut self,
        station: &Id<Station>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        delete_snapshots_between(&mut *self.tx, station, start, end).await
    }
}
