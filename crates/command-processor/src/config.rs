//! Command-line configuration (§6: shared DB flags + broker connection).

use clap::Parser;

/// Consumes `commandStream` and applies ad-hoc room/user operations against
/// the tenant database, queuing a confirmation mail for share/unshare.
#[derive(Debug, Parser)]
#[command(name = "command-processor")]
pub struct Args {
    /// Tenant database name.
    #[arg(long, env = "DB_NAME", default_value = "greenlight_production")]
    pub db_name: String,

    /// Tenant database user.
    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    /// Tenant database password.
    #[arg(long, env = "DB_PASSWORD", default_value = "")]
    pub db_password: String,

    /// Tenant database host.
    #[arg(long, env = "DB_HOST", default_value = "127.0.0.1")]
    pub db_host: String,

    /// Tenant database port.
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Maximum tenant database pool size.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub db_max_connections: u32,

    /// Broker (Redis) connection URL.
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6380/1")]
    pub redis_url: String,

    /// Seconds a status key is kept alive after a write.
    #[arg(long, env = "KEEP_REDIS_CACHE", default_value_t = 31_536_000)]
    pub keep_redis_cache: u64,

    /// Consumer name this process registers under in the `commandNotifications` group.
    #[arg(long, default_value = "consumer1")]
    pub consumer: String,
}
