use std::{env, error::Error, fmt};

use async_trait::async_trait;
use dashboard::database::{
    Database, DatabaseAutocommit, DatabaseOperations, DatabaseTransaction,
};
use queries::convert_error;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Transaction,
};

pub mod data_model;
pub mod queries;

const MAX_CONNECTIONS: u32 = 10;

/// An environment variable that is required but not set or not parseable.
#[derive(Debug)]
pub struct MissingVariable(pub &'static str);

impl fmt::Display for MissingVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "environment variable {} is missing or invalid", self.0)
    }
}

impl Error for MissingVariable {}

fn var(name: &'static str) -> Result<String, MissingVariable> {
    env::var(name).map_err(|_| MissingVariable(name))
}

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    /// Reads `DATABASE_USER`, `DATABASE_PASSWORD`, `DATABASE_HOST`,
    /// `DATABASE_PORT` and `DATABASE_NAME`.
    pub fn from_env() -> Result<Self, MissingVariable> {
        Ok(Self {
            username: var("DATABASE_USER")?,
            password: var("DATABASE_PASSWORD")?,
            hostname: var("DATABASE_HOST")?,
            port: var("DATABASE_PORT")?
                .parse()
                .map_err(|_| MissingVariable("DATABASE_PORT"))?,
            database: var("DATABASE_NAME")?,
        })
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .username(&self.username)
            .password(&self.password)
            .host(&self.hostname)
            .port(self.port)
            .database(&self.database)
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
}

pub struct PgDatabaseTransaction<'a> {
    tx: Transaction<'a, sqlx::Postgres>,
}

#[async_trait]
impl<'a> DatabaseTransaction for PgDatabaseTransaction<'a> {
    async fn commit(self) -> dashboard::database::Result<()> {
        self.tx.commit().await.map_err(convert_error)
    }
}

impl<'a> DatabaseOperations for PgDatabaseTransaction<'a> {}

pub struct PgDatabaseAutocommit {
    pool: sqlx::PgPool,
}

impl DatabaseAutocommit for PgDatabaseAutocommit {}

impl DatabaseOperations for PgDatabaseAutocommit {}

impl PgDatabase {
    /// Connects and applies pending migrations.
    pub async fn connect(info: DatabaseConnectionInfo) -> Result<Self, Box<dyn Error>> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(info.connect_options())
            .await?;
        log::info!(
            "connected to database {} at {}:{}",
            info.database,
            info.hostname,
            info.port
        );

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("database migrations applied");

        Ok(Self { connection: pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgDatabaseTransaction<'static>;
    type Autocommit = PgDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        PgDatabaseAutocommit {
            pool: self.connection.clone(),
        }
    }

    async fn transaction(&self) -> dashboard::database::Result<Self::Transaction> {
        let tx: Transaction<'_, sqlx::Postgres> =
            self.connection.begin().await.map_err(convert_error)?;

        Ok(PgDatabaseTransaction { tx })
    }
}

#[cfg(test)]
mod tests {
    const MIGRATION: &str = include_str!("../migrations/20251118000000_dashboard.sql");

    /// Definition of `column` in the `CREATE TABLE` statement of `table`.
    fn column(table: &str, column: &str) -> &'static str {
        let create = format!("CREATE TABLE IF NOT EXISTS {} (", table);
        let prefix = format!("{} ", column);
        MIGRATION
            .split(';')
            .find(|statement| statement.contains(&create))
            .unwrap_or_else(|| panic!("no table {}", table))
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with(&prefix))
            .unwrap_or_else(|| panic!("no column {}.{}", table, column))
    }

    #[test]
    fn history_and_comments_block_deletes() {
        for (table, name) in [
            ("station_status_logs", "station_id"),
            ("comments", "commented_to"),
            ("comments", "commentor"),
            ("replies", "reply_to"),
            ("replies", "replier"),
        ] {
            assert!(
                column(table, name).contains("ON DELETE RESTRICT"),
                "{}.{}",
                table,
                name
            );
        }
    }

    #[test]
    fn derived_rows_follow_their_parent() {
        for (table, name) in [
            ("station_snapshots", "station_id"),
            ("sessions", "user_id"),
            ("tours", "assigned_to"),
            ("stops", "tour_id"),
            ("tasks", "stop_id"),
        ] {
            assert!(
                column(table, name).contains("ON DELETE CASCADE"),
                "{}.{}",
                table,
                name
            );
        }
    }

    #[test]
    fn stop_order_is_not_negative() {
        assert!(column("stops", "stop_order").contains("CHECK (stop_order >= 0)"));
    }
}
