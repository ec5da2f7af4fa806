//! Database layer for ballot.
//!
//! Polls live in three tables: `poll`, `poll_option` (one row per option,
//! holding its vote counter) and `poll_vote` (which voter chose which
//! option). Options and votes are deleted together with their poll.
//! User profiles live in `profile`, keyed by the gateway's user ID.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use ballot_common::{AppError, AppResult, config::DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::log::LevelFilter;

/// Open a connection pool with the configured limits.
pub async fn init(config: &DatabaseConfig) -> AppResult<DatabaseConnection> {
    let mut opt = ConnectOptions::new(&config.url);

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Apply pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Open a pool and bring the schema up to date.
pub async fn connect(config: &DatabaseConfig) -> AppResult<DatabaseConnection> {
    let db = init(config).await?;
    tracing::info!(
        max_connections = config.max_connections,
        "Connected to database"
    );

    migrate(&db).await?;
    tracing::info!("Database schema is up to date");

    Ok(db)
}
