//! Database wiring: SeaORM connection plus entities and repositories.

pub mod entities;
pub mod repositories;

use std::time::Duration;

use log::LevelFilter;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

pub use repositories::SeaOrmRepositoryProvider;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Connect with pool settings sized for the HTTP worker pool plus the
/// station actors.
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(&config.url);
    options
        .max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(options).await
}
