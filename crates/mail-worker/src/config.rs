//! Command-line configuration (§4.6: broker connection + send-mode flags).

use clap::Parser;

/// Consumes `mailStream` and delivers each queued mail over SMTP.
#[derive(Debug, Parser)]
#[command(name = "mail-worker")]
pub struct Args {
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6380/1")]
    pub redis_url: String,

    /// Print the rendered mail instead of attempting delivery. Has no effect
    /// unless `--no-emails` is also set.
    #[arg(short = 'd', long = "debug-emails")]
    pub debug_emails: bool,

    /// Never attempt SMTP delivery. A message is left un-acknowledged in
    /// this mode (preserving `slMailProcessor.py`'s `send_email` returning
    /// `0`, which never acks), so it is redelivered on every subsequent
    /// pass until the flag is removed.
    #[arg(short = 'n', long = "no-emails")]
    pub no_emails: bool,

    #[arg(default_value = "consumer1", long)]
    pub consumer: String,
}
