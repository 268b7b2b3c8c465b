//! `http-admin`: REST CRUD surface over the broker's servers/meetings/
//! commands (§6), folding in a `query` subcommand group for ad-hoc operator
//! lookups against a conference server (§11).

mod config;
mod errors;
mod handlers;
mod query;
mod routes;

use broker::{BrokerClient, StatusLedger};
use clap::Parser;
use config::{Args, Command};
use routes::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "http_admin=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Some(Command::Query { query }) = args.command.clone() {
        let broker = BrokerClient::connect(&args.redis_url).await.map_err(|e| {
            error!(target: "http_admin.main", %e, "failed to connect to broker");
            e
        })?;
        if let Err(err) = query::run(&args, &broker, query).await {
            error!(target: "http_admin.main", %err, "query failed");
            std::process::exit(1);
        }
        return Ok(());
    }

    let broker = BrokerClient::connect(&args.redis_url).await.map_err(|e| {
        error!(target: "http_admin.main", %e, "failed to connect to broker");
        e
    })?;
    let ledger = StatusLedger::new(broker.clone(), args.keep_redis_cache);
    let state = Arc::new(AppState { broker, ledger });

    let app = routes::build_routes(state);
    let addr: SocketAddr = format!("{}:{}", args.bind_host, args.bind_port).parse()?;

    info!(target: "http_admin.main", %addr, "http admin listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!(target: "http_admin.main", "http admin shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
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
    info!(target: "http_admin.main", "shutting down...");
}
