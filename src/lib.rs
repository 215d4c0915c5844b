pub mod api;
pub mod config;
pub mod entities;
pub mod middleware;
pub mod services;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Opens the pool. An in-memory SQLite database only lives as long as its
/// connection, so it is pinned to a single one.
pub async fn connect_database(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");

    let mut options = ConnectOptions::new(url.to_owned());
    options
        .max_connections(if in_memory { 1 } else { max_connections.max(1) })
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    if in_memory {
        let forever = Duration::from_secs(60 * 60 * 24 * 365);
        options.idle_timeout(forever).max_lifetime(forever);
    }

    Database::connect(options).await
}
