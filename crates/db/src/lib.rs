//! Database layer with `SeaORM` entities and the `PostgreSQL` record store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`PgStore`], the `PostgreSQL` implementation of the core store traits
//! - Database migrations

pub mod entities;
pub mod error;
pub mod migration;
pub mod store;

pub use error::map_db_err;
pub use store::{PgStore, PgUnit};

use std::time::Duration;

use bankcore_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool sized and timed by the database configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Connects and wraps the pool in a [`PgStore`] using the configured lock timeout.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_store(config: &DatabaseConfig) -> Result<PgStore, DbErr> {
    let db = connect(config).await?;
    Ok(PgStore::new(db, Duration::from_millis(config.lock_timeout_ms)))
}
