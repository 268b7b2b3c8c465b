//! Command-line configuration (§4.7: config-file ingestion flags).

use clap::Parser;
use std::path::PathBuf;

/// Loads `servers`/`meetings`/`commands` from a YAML config file into the
/// broker, or imports a semicolon-delimited meetings CSV into that file.
#[derive(Debug, Parser)]
#[command(name = "config-loader")]
pub struct Args {
    #[arg(short = 'c', long = "config-file", default_value = "./config.yml")]
    pub config_file: PathBuf,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6380/1")]
    pub redis_url: String,

    /// Seconds to keep each loaded server/meeting record (and its status
    /// ledger key, once written) in the broker.
    #[arg(short = 'k', long = "keep-redis-cache", default_value_t = 31_536_000)]
    pub keep_redis_cache: u64,

    /// Path to a meetings CSV file to merge into `--config-file` instead of
    /// loading the config file into the broker.
    #[arg(short = 'i', long = "import-csv")]
    pub import_csv: Option<PathBuf>,

    /// Remove servers/meetings from the broker that were present on the
    /// previous run but are no longer in the config file.
    #[arg(short = 'd', long = "delete-meetings")]
    pub delete_meetings: bool,
}
