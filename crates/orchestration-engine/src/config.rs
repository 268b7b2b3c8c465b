//! Command-line configuration (§5: shared DB/broker flags + tick timing
//! defaults).

use clap::Parser;

/// Walks `meetings` once a second, resolving owners and rooms, starting and
/// closing BBB meetings, and queuing the mail stages the meeting's lifecycle
/// calls for.
#[derive(Debug, Parser)]
#[command(name = "orchestration-engine")]
pub struct Args {
    #[arg(long, env = "DB_NAME", default_value = "greenlight_production")]
    pub db_name: String,

    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "")]
    pub db_password: String,

    #[arg(long, env = "DB_HOST", default_value = "127.0.0.1")]
    pub db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub db_max_connections: u32,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6380/1")]
    pub redis_url: String,

    #[arg(long, env = "KEEP_REDIS_CACHE", default_value_t = 31_536_000)]
    pub keep_redis_cache: u64,

    /// Minutes before `startDate` the meeting is pre-opened (closed and
    /// reset so it reopens cleanly); a meeting-level `preOpenMinutes`
    /// overrides this, added to the effective `preStartMinutes`.
    #[arg(short = 'p', long = "pre-open", default_value_t = 90)]
    pub pre_open: i64,

    /// Minutes before `startDate` the meeting is actually started; a
    /// meeting-level `preStartMinutes` overrides this.
    #[arg(short = 'P', long = "pre-start", default_value_t = 0)]
    pub pre_start: i64,

    /// Minutes after `startDate` a running meeting is force-closed; `0`
    /// disables this. A meeting-level `endAfterMinutes` overrides this.
    #[arg(short = 'a', long = "end-after", default_value_t = 0)]
    pub end_after: i64,

    /// Minutes before `startDate` an owner reminder mail is sent; a
    /// meeting-level `reminderMinutes` overrides this. `0` disables it.
    #[arg(short = 'r', long = "reminder-minutes", default_value_t = 0)]
    pub reminder_minutes: i64,
}
