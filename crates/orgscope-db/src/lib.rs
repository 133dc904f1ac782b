//! Orgscope storage layer
//!
//! Store traits plus the Postgres and in-memory backends, and the pool
//! construction helpers.

pub mod db;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use orgscope_core::{DatabaseConfig, OrgError};

pub use db::{
    GrantStore, MembershipRepository, MembershipStore, MemoryOrgStore, PermissionRepository,
    UnitRepository, UnitStore, UserRepository, UserStore,
};

/// Build a connection pool from the database configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, OrgError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

/// Apply the engine's schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), OrgError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| OrgError::Internal {
            message: "Failed to run database migrations".to_string(),
            source: anyhow::Error::from(e),
        })
}
