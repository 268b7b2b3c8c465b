//! Command-line configuration (§6: HTTP admin flags, plus the `query`
//! subcommand group folded in from `slCli.py`, §11).

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Serves `/api/v1/servers`, `/api/v1/meetings`, and `/api/v1/commands`
/// over the broker, or runs a one-shot operator query against the broker
/// and tenant database.
#[derive(Debug, Clone, Parser)]
#[command(name = "http-admin")]
pub struct Args {
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6380/1")]
    pub redis_url: String,

    #[arg(long, env = "KEEP_REDIS_CACHE", default_value_t = 31_536_000)]
    pub keep_redis_cache: u64,

    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub bind_host: String,

    #[arg(long, env = "BIND_PORT", default_value_t = 8080)]
    pub bind_port: u16,

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

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// `schedulight-admin query ...` (§11 supplemented `slCli.py` surface).
/// Absent, `http-admin` serves the REST surface instead.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Ad-hoc operator queries against the broker and tenant database.
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum QueryCommand {
    /// Find a currently-running meeting on `server` by a fragment of its title.
    FindMeeting(FindMeetingArgs),
    /// List every meeting currently reported as running on `server`.
    ListMeetings(ServerArgs),
    /// Print a user's join links for a room, looked up by room uid.
    RoomLinks(RoomLinksArgs),
    /// Send a one-off test email through a server's configured SMTP transport.
    TestEmail(TestEmailArgs),
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ServerArgs {
    /// Conference server id to query (must already be configured).
    #[arg(short, long, default_value = "bbb")]
    pub server: String,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct FindMeetingArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Title fragment to search for among currently-running meetings.
    pub title: String,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct RoomLinksArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Room uid to resolve join links for.
    pub room_uid: String,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct TestEmailArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Recipient address for the test message.
    pub to: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand() {
        let args = Args::parse_from(["http-admin"]);
        assert!(args.command.is_none());
        assert_eq!(args.bind_port, 8080);
    }

    #[test]
    fn parses_find_meeting_query() {
        let args = Args::parse_from(["http-admin", "query", "find-meeting", "-s", "prod", "Standup"]);
        match args.command {
            Some(Command::Query {
                query: QueryCommand::FindMeeting(found),
            }) => {
                assert_eq!(found.server.server, "prod");
                assert_eq!(found.title, "Standup");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
