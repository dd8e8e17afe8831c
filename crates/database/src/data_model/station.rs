use async_trait::async_trait;
use dashboard::database::{Result, StationRepo};
use model::{station::Station, WithId};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::station::{count, get, get_all, get_by_name, put},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct StationRow {
    pub id: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub slots: i32,
}

impl DatabaseRow for StationRow {
    type Model = Station;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Station {
            name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            slots: self.slots,
        }
    }
}

#[async_trait]
impl StationRepo for PgDatabaseAutocommit {
    async fn get_stations(&mut self) -> Result<Vec<WithId<Station>>> {
        get_all(&self.pool).await
    }

    async fn get_station(&mut self, id: &Id<Station>) -> Result<WithId<Station>> {
        get(&self.pool, id).await
    }

    async fn station_by_name(&mut self, name: &str) -> Result<Option<WithId<Station>>> {
        get_by_name(&self.pool, name).await
    }

    async fn put_station(&mut self, station: Station) -> Result<WithId<Station>> {
        put(&self.pool, station).await
    }

    async fn count_stations(&mut self) -> Result<i64> {
        count(&self.pool).await
    }
}

#[async_trait]
impl<'a> StationRepo for PgDatabaseTransaction<'a> {
    async fn get_stations(&mut self) -> Result<Vec<WithId<Station>>> {
        get_all(&mut *self.tx).await
    }

    async fn get_station(&mut self, id: &Id<Station>) -> Result<WithId<Station>> {
        get(&mut *self.tx, id).await
    }

    async fn station_by_name(&mut self, name: &str) -> Result<Option<WithId<Station>>> {
        get_by_name(&mut *self.tx, name).await
    }

    async fn put_station(&mut self, station: Station) -> Result<WithId<Station>> {
        put(&mut *self.tx, station).await
    }

    async fn count_stations(&mut self) -> Result<i64> {
        count(&mut *self.tx).await
    }
}
