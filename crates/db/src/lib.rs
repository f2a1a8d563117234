//! PostgreSQL persistence for the retrace version-history engine.
//!
//! - [`PgVersionStore`] — the `VersionStore` implementation.
//! - [`models`] / [`repositories`] — row structs and table queries.
//! - [`DbConfig`], [`connect`], [`health_check`] — pool plumbing.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod config;
pub mod models;
pub mod repositories;
pub mod store;

pub use config::DbConfig;
pub use store::PgVersionStore;

/// Open a connection pool using the given configuration.
pub async fn connect(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(max_connections = config.max_connections, "connecting to database");
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

/// Cheap readiness probe.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
