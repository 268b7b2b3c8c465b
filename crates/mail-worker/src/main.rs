//! Mail-worker daemon: consumes `mailStream` and delivers each queued mail
//! over SMTP (§4.6).
//!
//! Mirrors `slMailProcessor.py`'s main loop: drain this consumer's own
//! pending entries before picking up new ones, acknowledge only on
//! successful delivery — a failed send (or `--no-emails`) leaves the
//! message pending so it is retried on the next pass — and `BGSAVE` before
//! disconnecting on shutdown.

#![warn(clippy::pedantic)]

mod config;
mod smtp;

use broker::client::BrokerClient;
use clap::Parser;
use common::domain::MailProperties;
use config::Args;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STREAM: &str = "mailStream";
const GROUP: &str = "mailNotifications";
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

async fn drain(broker: &BrokerClient, args: &Args, cursor: &str) {
    let messages = match broker.stream_read_group(STREAM, GROUP, &args.consumer, cursor, READ_COUNT, None).await {
        Ok(messages) => messages,
        Err(err) => {
            warn!(target: "mail_worker.main", error = %err, cursor, "stream_read_group failed");
            return;
        }
    };

    for message in messages {
        debug!(target: "mail_worker.main", id = %message.id, "processing message");

        let mail: MailProperties = match serde_json::from_str(&message.data) {
            Ok(mail) => mail,
            Err(err) => {
                error!(target: "mail_worker.main", error = %err, id = %message.id, "malformed mail properties");
                if let Err(err) = broker.stream_ack(STREAM, GROUP, &message.id).await {
                    warn!(target: "mail_worker.main", error = %err, id = %message.id, "ack failed");
                }
                continue;
            }
        };

        if args.no_emails {
            debug!(target: "mail_worker.main", to = %mail.mail_to, "not sending emails due to configuration");
            if args.debug_emails {
                debug!(target: "mail_worker.main", mail_text = %mail.mail_text, "rendered mail");
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            continue;
        }

        if smtp::send(&mail).await {
            info!(target: "mail_worker.main", id = %message.id, to = %mail.mail_to, "send mail");
            if let Err(err) = broker.stream_ack(STREAM, GROUP, &message.id).await {
                warn!(target: "mail_worker.main", error = %err, id = %message.id, "ack failed");
            }
        } else {
            error!(target: "mail_worker.main", id = %message.id, to = %mail.mail_to, "failed to send mail");
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mail_worker=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let broker = match BrokerClient::connect(&args.redis_url).await {
        Ok(broker) => broker,
        Err(err) => {
            error!(target: "mail_worker.main", error = %err, "failed to connect to broker");
            std::process::exit(1);
        }
    };

    if let Err(err) = broker.ensure_group(STREAM, GROUP).await {
        error!(target: "mail_worker.main", error = %err, "failed to ensure consumer group");
        std::process::exit(1);
    }

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    info!(target: "mail_worker.main", "mail worker started");

    loop {
        debug!(target: "mail_worker.main", "process old messages");
        drain(&broker, &args, "0").await;

        debug!(target: "mail_worker.main", "process new messages");
        drain(&broker, &args, ">").await;

        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(1)) => {},
            () = cancel_token.cancelled() => {
                info!(target: "mail_worker.main", "shutting down...");
                if let Err(err) = broker.bgsave().await {
                    warn!(target: "mail_worker.main", error = %err, "bgsave failed");
                }
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn args_default_consumer_is_consumer1() {
        let args = Args::parse_from(["mail-worker"]);
        assert_eq!(args.consumer, "consumer1");
        assert!(!args.no_emails);
        assert!(!args.debug_emails);
    }
}
