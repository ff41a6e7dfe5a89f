//! Connection pool for the upstream mined-transaction database.
//!
//! Uses sqlx's `Any` driver so the same read path serves Postgres in
//! production and SQLite snapshots in tests.

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;

/// Open a single-connection pool for one read.
pub async fn create_pool(database_url: &str) -> Result<AnyPool, sqlx::Error> {
    install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
}
