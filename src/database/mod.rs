use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::info;

use crate::config;

/// Errors from the store layer
#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost:5432/gardem";

/// Handle to the process-wide connection pool. Constructed once in `main`
/// and passed to handlers through router state.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Build the pool from `DATABASE_URL`. Connections are established
    /// lazily so the server can come up (and report degraded health) while
    /// the database is unreachable.
    pub fn connect() -> Result<Self, DbError> {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            tracing::warn!("DATABASE_URL not set, using default local database");
            DEFAULT_DATABASE_URL.to_string()
        });

        let parsed =
            url::Url::parse(&database_url).map_err(|_| DbError::InvalidDatabaseUrl)?;
        info!(
            host = parsed.host_str().unwrap_or("?"),
            database = parsed.path().trim_start_matches('/'),
            "configuring database pool"
        );

        let db_config = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(Duration::from_secs(db_config.acquire_timeout_secs))
            .connect_lazy(&database_url)?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Create the schema if absent. Safe to run on every startup; there is
    /// no migration versioning.
    pub async fn migrate(&self) -> Result<(), DbError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("database schema is up to date");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS gardens (
        id SERIAL PRIMARY KEY,
        code VARCHAR(10) NOT NULL UNIQUE,
        size INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS seeds (
        id SERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS farms (
        id SERIAL PRIMARY KEY,
        code VARCHAR(10) NOT NULL UNIQUE,
        born_date DATE NOT NULL,
        state VARCHAR(20) NOT NULL,
        gardem_id INTEGER NOT NULL REFERENCES gardens (id),
        seed_id INTEGER NOT NULL REFERENCES seeds (id)
    )",
    "CREATE INDEX IF NOT EXISTS farms_born_date_idx ON farms (born_date)",
    "CREATE INDEX IF NOT EXISTS farms_state_idx ON farms (state)",
    // Notes are owned by their farm and removed with it
    "CREATE TABLE IF NOT EXISTS farm_notes (
        id SERIAL PRIMARY KEY,
        farm_id INTEGER NOT NULL REFERENCES farms (id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        note TEXT NOT NULL,
        note_type VARCHAR(20) NOT NULL DEFAULT 'note',
        value NUMERIC(12, 10) NOT NULL DEFAULT 0
    )",
];
