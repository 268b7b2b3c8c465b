//! Config-loader: a one-shot tool that pushes a YAML config file's
//! `servers`/`meetings`/`commands` into the broker, or merges a meetings CSV
//! into that file (§4.7).
//!
//! Unlike the other three daemons, this one runs once and exits — it has no
//! tick loop, matching `slReadConfig.py`'s own script-and-exit shape.

#![warn(clippy::pedantic)]

mod config;
mod csv_import;
mod file;
mod sync;

use broker::{BrokerClient, StatusLedger};
use clap::Parser;
use config::Args;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "config_loader=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut loaded = match file::read(&args.config_file) {
        Ok(config) => config,
        Err(err) => {
            error!(target: "config_loader.main", %err, "failed to load config file");
            std::process::exit(1);
        }
    };

    if let Some(csv_path) = &args.import_csv {
        match csv_import::import(csv_path, &mut loaded) {
            Ok(count) => info!(target: "config_loader.main", count, "imported meetings from CSV"),
            Err(err) => {
                error!(target: "config_loader.main", %err, "failed to import CSV");
                std::process::exit(1);
            }
        }
        if let Err(err) = file::write(&args.config_file, &loaded) {
            error!(target: "config_loader.main", %err, "failed to write config file");
            std::process::exit(1);
        }
        return;
    }

    let broker = match BrokerClient::connect(&args.redis_url).await {
        Ok(broker) => broker,
        Err(err) => {
            error!(target: "config_loader.main", %err, "failed to connect to broker");
            std::process::exit(1);
        }
    };
    let ledger = StatusLedger::new(broker.clone(), args.keep_redis_cache);

    sync::sync(&broker, &ledger, &loaded, args.keep_redis_cache, args.delete_meetings).await;

    if let Err(err) = broker.bgsave().await {
        warn!(target: "config_loader.main", %err, "bgsave failed");
    }

    info!(target: "config_loader.main", "done");
}
