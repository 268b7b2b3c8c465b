//! Connection pool setup: builds a `PgPool` from [`common::config::DatabaseConfig`]
//! and runs the startup compatibility check before handing it back.

use crate::error::{Result, TenantDbError};
use crate::schema::check_compatibility;
use common::config::DatabaseConfig;
use common::secret::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

/// Connect to the tenant database and verify its schema matches what this
/// adapter was built against.
///
/// # Errors
///
/// Returns [`TenantDbError::Query`] if the pool cannot be established, or
/// [`TenantDbError::SchemaMismatch`] if `checkCompatibility` fails — both
/// are fatal at startup (§4.2).
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    info!(target: "tenant_db.pool", host = %config.db_host, "connecting to tenant database");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(config.connection_string().expose_secret())
        .await
        .map_err(|e| TenantDbError::Query(e.to_string()))?;

    info!(target: "tenant_db.pool", "checking schema compatibility");
    check_compatibility(&pool).await?;

    Ok(pool)
}
