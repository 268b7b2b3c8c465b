//! Command-processor daemon: consumes `commandStream` and applies ad-hoc
//! room/user operations against the tenant database (§4.2, §6).
//!
//! Mirrors `slCommandProcessor.py`'s main loop: a consumer-group read drains
//! this consumer's own pending entries before picking up new ones, every
//! message is acknowledged regardless of whether processing succeeded, and a
//! `BGSAVE` runs just before disconnecting on shutdown.

#![warn(clippy::pedantic)]

mod commands;
mod config;

use broker::client::BrokerClient;
use clap::Parser;
use commands::process_command;
use common::config::DatabaseConfig;
use common::domain::CommandEnvelope;
use common::secret::SecretString;
use config::Args;
use sqlx::PgPool;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STREAM: &str = "commandStream";
const GROUP: &str = "commandNotifications";
const READ_COUNT: usize = 32;

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    cancel_token.cancel();
}

async fn drain(pool: &PgPool, broker: &BrokerClient, args: &Args, cursor: &str) {
    let messages = match broker
        .stream_read_group(STREAM, GROUP, &args.consumer, cursor, READ_COUNT, None)
        .await
    {
        Ok(messages) => messages,
        Err(err) => {
            warn!(target: "command_processor.main", error = %err, cursor, "stream_read_group failed");
            return;
        }
    };

    for message in messages {
        debug!(target: "command_processor.main", id = %message.id, "processing message");

        let envelope: CommandEnvelope = match serde_json::from_str(&message.data) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(target: "command_processor.main", error = %err, id = %message.id, "malformed command envelope");
                if let Err(err) = broker.stream_ack(STREAM, GROUP, &message.id).await {
                    warn!(target: "command_processor.main", error = %err, id = %message.id, "ack failed");
                }
                continue;
            }
        };

        if process_command(pool, broker, &envelope).await {
            info!(target: "command_processor.main", id = %message.id, command = %envelope.command, "command processed successfully");
        } else {
            error!(target: "command_processor.main", id = %message.id, command = %envelope.command, "errors during processing of command, see logs above");
        }

        if let Err(err) = broker.stream_ack(STREAM, GROUP, &message.id).await {
            warn!(target: "command_processor.main", error = %err, id = %message.id, "ack failed");
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "command_processor=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let db_config = DatabaseConfig {
        db_name: args.db_name.clone(),
        db_user: args.db_user.clone(),
        db_password: SecretString::from(args.db_password.clone()),
        db_host: args.db_host.clone(),
        db_port: args.db_port,
        max_connections: args.db_max_connections,
    };

    let pool = match tenant_db::connect(&db_config).await {
        Ok(pool) => pool,
        Err(err) => {
            error!(target: "command_processor.main", error = %err, "failed to connect to tenant database");
            std::process::exit(1);
        }
    };

    let broker = match BrokerClient::connect(&args.redis_url).await {
        Ok(broker) => broker,
        Err(err) => {
            error!(target: "command_processor.main", error = %err, "failed to connect to broker");
            std::process::exit(1);
        }
    };

    if let Err(err) = broker.ensure_group(STREAM, GROUP).await {
        error!(target: "command_processor.main", error = %err, "failed to ensure consumer group");
        std::process::exit(1);
    }

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    info!(target: "command_processor.main", "command processor started");

    loop {
        debug!(target: "command_processor.main", "process old messages");
        drain(&pool, &broker, &args, "0").await;

        debug!(target: "command_processor.main", "process new commands");
        drain(&pool, &broker, &args, ">").await;

        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(1)) => {},
            () = cancel_token.cancelled() => {
                info!(target: "command_processor.main", "shutting down...");
                if let Err(err) = broker.bgsave().await {
                    warn!(target: "command_processor.main", error = %err, "bgsave failed");
                }
                break;
            }
        }
    }
}
