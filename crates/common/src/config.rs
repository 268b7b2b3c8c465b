//! Shared configuration primitives for scheduLight components.
//!
//! These are the pieces of configuration more than one binary needs
//! (the tenant database and the broker connection); binary-specific
//! configuration (CLI flags, per-stage minute offsets, mail modes)
//! lives in each binary's own `config` module.

use crate::secret::SecretString;
use serde::{Deserialize, Serialize};

/// Tenant (Greenlight) Postgres connection settings.
///
/// Mirrors the shared CLI flags in SPEC_FULL.md §6:
/// `--dbName/--dbUser/--dbPassword/--dbHost/--dbPort`.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database name (default `greenlight_production`).
    pub db_name: String,
    /// Database user (default `postgres`).
    pub db_user: String,
    /// Database password. Redacted in Debug via `SecretString`.
    pub db_password: SecretString,
    /// Database host (default `127.0.0.1`).
    pub db_host: String,
    /// Database port (default `5432`).
    pub db_port: u16,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Build a `postgres://` connection string from the individual fields.
    #[must_use]
    pub fn connection_string(&self) -> SecretString {
        use crate::secret::ExposeSecret;
        SecretString::from(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_user,
            self.db_password.expose_secret(),
            self.db_host,
            self.db_port,
            self.db_name
        ))
    }
}

/// Broker (Redis) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL, e.g. `redis://localhost:6380/1`.
    pub url: String,
    /// Seconds a status/record key is kept alive after a write
    /// (`keep_redis_cache` in SPEC_FULL.md §6, default 31,536,000).
    pub keep_redis_cache_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6380/1".to_string(),
            keep_redis_cache_seconds: 31_536_000,
        }
    }
}
