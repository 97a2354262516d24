use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/wayfarer-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a pool sized by `config.max_connections`.
///
/// Connections go back to the pool when the guard or transaction holding
/// them drops, whether the operation succeeded or not.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Apply every embedded migration not yet recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    for migration in MIGRATOR.iter() {
        debug!(version = migration.version, name = %migration.description, "known migration");
    }
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(count = MIGRATOR.iter().count(), "schema up to date");
    Ok(())
}

/// Only plain identifiers may be interpolated into `CREATE DATABASE`.
fn check_database_name(name: &str) -> Result<()> {
    let plain = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if !plain {
        anyhow::bail!("database name {name:?} must be a plain identifier");
    }
    Ok(())
}

/// Create the configured database through the `postgres` maintenance
/// database when it does not exist yet.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("database URL names no database")?;
    check_database_name(db_name)?;

    let maintenance_url = config.maintenance_url();
    let admin = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to reach maintenance database at {maintenance_url}"))?;

    let present: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&admin)
            .await
            .context("failed to look up database")?;

    if present {
        info!(db = db_name, "using existing database");
    } else {
        admin
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "created database");
    }

    admin.close().await;
    Ok(())
}

/// Row counts reported by `wayfarer db-init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub itineraries: i64,
    pub public_itineraries: i64,
    pub activities: i64,
}

pub async fn store_stats(pool: &PgPool) -> Result<StoreStats> {
    let (itineraries, public_itineraries, activities): (i64, i64, i64) = sqlx::query_as(
        "SELECT \
             (SELECT COUNT(*) FROM itineraries), \
             (SELECT COUNT(*) FROM itineraries WHERE visibility = 'public'), \
             (SELECT COUNT(*) FROM activities)",
    )
    .fetch_one(pool)
    .await
    .context("failed to count stored rows")?;

    Ok(StoreStats {
        itineraries,
        public_itineraries,
        activities,
    })
}
