use chrono::{DateTime, Utc};
use dashboard::database::Result;
use model::{
    station::Station,
    status::{Snapshot, StatusLog},
    WithId,
};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    status::{SnapshotRow, StatusLogRow},
    with_id, DatabaseRow as _,
};

use super::convert_error;

pub async fn put_status_log<'c, E>(executor: E, log: StatusLog) -> Result<WithId<StatusLog>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO station_status_logs (
            date, time, empty_slots, free_bikes, is_empty, is_full, station_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, date, time, empty_slots, free_bikes, is_empty, is_full, station_id;
        ",
    )
    .bind(log.date)
    .bind(log.time)
    .bind(log.empty_slots)
    .bind(log.free_bikes)
    .bind(log.empty)
    .bind(log.full)
    .bind(log.station.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: StatusLogRow| with_id(row))
}

pub async fn latest_per_station<'c, E>(executor: E) -> Result<Vec<StatusLog>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT DISTINCT ON (station_id)
            id, date, time, empty_slots, free_bikes, is_empty, is_full, station_id
        FROM station_status_logs
        ORDER BY station_id, date DESC, time DESC, id DESC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<StatusLogRow>| {
        Ok(rows.into_iter().map(|row| row.to_model()).collect())
    })
}

pub async fn newest_of_station<'c, E>(
    executor: E,
    station: &Id<Station>,
    limit: i64,
) -> Result<Vec<StatusLog>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, date, time, empty_slots, free_bikes, is_empty, is_full, station_id
        FROM station_status_logs
        WHERE station_id = $1
        ORDER BY date DESC, time DESC, id DESC
        LIMIT $2;
        ",
    )
    .bind(station.raw())
    .bind(limit)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<StatusLogRow>| {
        Ok(rows.into_iter().map(|row| row.to_model()).collect())
    })
}

/// Returns `false` if a snapshot with the same station and timestamp exists.
pub async fn put_snapshot<'c, E>(executor: E, snapshot: Snapshot) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO station_snapshots (station_id, timestamp, free_bikes, empty_slots)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (station_id, timestamp) DO NOTHING;
        ",
    )
    .bind(snapshot.station.raw())
    .bind(snapshot.timestamp)
    .bind(snapshot.free_bikes)
    .bind(snapshot.empty_slots)
    .execute(executor)
    .await
    .map_err(convert_error)
    .map(|result| result.rows_affected() > 0)
}

pub async fn snapshots_between<'c, E>(
    executor: E,
    station: &Id<Station>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Snapshot>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, station_id, timestamp, free_bikes, empty_slots
        FROM station_snapshots
        WHERE station_id = $1 AND timestamp >= $2 AND timestamp < $3
        ORDER BY timestamp ASC;
        ",
    )
    .bind(station.raw())
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<SnapshotRow>| {
        Ok(rows.into_iter().map(|row| row.to_model()).collect())
    })
}

pub async fn delete_snapshots_between<'c, E>(
    executor: E,
    station: &Id<Station>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        DELETE FROM station_snapshots
        WHERE station_id = $1 AND timestamp >= $2 AND timestamp < $3;
        ",
    )
    .bind(station.raw())
    .bind(start)
    .bind(end)
    .execute(executor)
    .await
    .map_err(convert_error)
    .map(|result| result.rows_affected())
}
