use dashboard::database::Result;
use model::{station::Station, WithId};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{station::StationRow, with_id, with_ids};

use super::convert_error;

pub async fn get_all<'c, E>(executor: E) -> Result<Vec<WithId<Station>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, latitude, longitude, slots
        FROM stations
        ORDER BY name ASC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<StationRow>| Ok(with_ids(rows)))
}

pub async fn get<'c, E>(executor: E, id: &Id<Station>) -> Result<WithId<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, latitude, longitude, slots
        FROM stations
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: StationRow| with_id(row))
}

pub async fn get_by_name<'c, E>(executor: E, name: &str) -> Result<Option<WithId<Station>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, latitude, longitude, slots
        FROM stations
        WHERE name = $1;
        ",
    )
    .bind(name)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .map(|row: Option<StationRow>| row.map(with_id))
}

/// Upserts by name.
pub async fn put<'c, E>(executor: E, station: Station) -> Result<WithId<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO stations (name, latitude, longitude, slots)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name)
        DO UPDATE SET
            latitude = EXCLUDED.latitude,
            longitude = EXCLUDED.longitude,
            slots = EXCLUDED.slots
        RETURNING id, name, latitude, longitude, slots;
        ",
    )
    .bind(station.name)
    .bind(station.latitude)
    .bind(station.longitude)
    .bind(station.slots)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: StationRow| with_id(row))
}

pub async fn count<'c, E>(executor: E) -> Result<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM stations;")
        .fetch_one(executor)
        .await
        .map_err(convert_error)
}
