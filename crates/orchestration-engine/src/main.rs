//! Orchestration engine daemon: the per-meeting tick loop (§4.4, §5).
//!
//! Walks the `meetings` set membership once a second, running each meeting's
//! record through a fixed pipeline: validate, resolve server/owner/room,
//! start/pre-open/end-after logic, live-streaming, mail stages, persist.
//! Every stage is gated by the status ledger, so a restart resumes exactly
//! where it left off; a malformed meeting or server record skips that
//! meeting for the tick rather than aborting the pass.

#![warn(clippy::pedantic)]

mod config;
mod error;
mod lifecycle;
mod live_stream;
mod mail;
mod owner;
mod room;

use broker::ledger::EntityKind;
use broker::{BrokerClient, StatusLedger};
use clap::Parser;
use common::config::DatabaseConfig;
use common::domain::{MeetingRecord, ServerRecord};
use common::secret::SecretString;
use common::time::Clock;
use config::Args;
use conference_api::ConferenceApiClient;
use sqlx::PgPool;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

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

/// Run one meeting's full tick pipeline. Every error is logged and absorbed
/// here so one malformed or temporarily-unreachable meeting never aborts the
/// rest of the pass (§4.4's propagation policy).
#[allow(clippy::too_many_lines)]
async fn tick_meeting(pool: &PgPool, broker: &BrokerClient, ledger: &StatusLedger, cfg: &Args, clock: &Clock, meeting_key: &str) {
    let raw = match broker.get_record("meeting", meeting_key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            warn!(target: "orchestration_engine.main", meeting_key, "meeting vanished mid-pass");
            return;
        }
        Err(err) => {
            warn!(target: "orchestration_engine.main", %err, meeting_key, "could not load meeting record");
            return;
        }
    };

    let meeting: MeetingRecord = match serde_json::from_str(&raw) {
        Ok(meeting) => meeting,
        Err(err) => {
            error!(target: "orchestration_engine.main", %err, meeting_key, "please provide all required fields for the meeting");
            return;
        }
    };

    if let Err(err) = meeting.validate() {
        error!(target: "orchestration_engine.main", %err, meeting_key, "please provide all required fields for the meeting");
        return;
    }

    let server_raw = match broker.get_record("server", &meeting.server).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            error!(target: "orchestration_engine.main", meeting_key, server = %meeting.server, "could not load server");
            return;
        }
        Err(err) => {
            warn!(target: "orchestration_engine.main", %err, meeting_key, "could not load server");
            return;
        }
    };

    let server: ServerRecord = match serde_json::from_str(&server_raw) {
        Ok(server) => server,
        Err(err) => {
            error!(target: "orchestration_engine.main", %err, meeting_key, "please provide all required fields for the server");
            return;
        }
    };
    if let Err(err) = server.validate() {
        error!(target: "orchestration_engine.main", %err, meeting_key, "please provide all required fields for the server");
        return;
    }

    if ledger.effective_code(EntityKind::Meeting, meeting_key, &["status"]).await.ok().flatten().is_none() {
        if let Err(err) = ledger.set_status(EntityKind::Meeting, meeting_key, &["status"], "200", "new", clock).await {
            warn!(target: "orchestration_engine.main", %err, meeting_key, "failed to record initial status");
            return;
        }
    }

    match ledger.effective_code(EntityKind::Meeting, meeting_key, &["status"]).await {
        Ok(Some(code)) if code == "900" => {
            debug!(target: "orchestration_engine.main", meeting_key, "meeting disabled, skipping");
            return;
        }
        Ok(_) => {}
        Err(err) => {
            warn!(target: "orchestration_engine.main", %err, meeting_key, "failed to read status");
            return;
        }
    }

    let owner = match owner::resolve_owner(pool, ledger, clock, meeting_key, meeting.owner.as_ref()).await {
        Ok(Some(owner)) => owner,
        Ok(None) => return,
        Err(err) => {
            warn!(target: "orchestration_engine.main", %err, meeting_key, "owner resolution failed");
            return;
        }
    };

    let conference = ConferenceApiClient::new(server.bbb_url.clone(), server.bbb_secret.clone());

    let resolved_room = match room::resolve_room(pool, ledger, clock, &conference, &server.link_base, meeting_key, &meeting, &owner).await {
        Ok(Some(room)) => room,
        Ok(None) => return,
        Err(err) => {
            warn!(target: "orchestration_engine.main", %err, meeting_key, "room resolution failed");
            return;
        }
    };

    if let Err(err) = lifecycle::run_start_logic(ledger, clock, &conference, cfg, meeting_key, &meeting, &resolved_room).await {
        warn!(target: "orchestration_engine.main", %err, meeting_key, "start logic failed");
        return;
    }

    if let Err(err) = lifecycle::run_end_after_logic(ledger, clock, &conference, cfg, meeting_key, &meeting, &resolved_room).await {
        warn!(target: "orchestration_engine.main", %err, meeting_key, "end-after logic failed");
        return;
    }

    if let Some(spec) = &meeting.live_streaming {
        if let Err(err) = live_stream::bridge(ledger, clock, meeting_key, &resolved_room.meeting_id, &server, spec).await {
            warn!(target: "orchestration_engine.main", %err, meeting_key, "live-streaming bridge failed");
        }
    }

    if let Err(err) = mail::run_owner_mail_stages(
        ledger,
        broker,
        clock,
        cfg,
        meeting_key,
        &meeting,
        &resolved_room,
        &server,
        &owner.email,
        &owner.full_name,
    )
    .await
    {
        warn!(target: "orchestration_engine.main", %err, meeting_key, "owner mail stages failed");
    }

    if let Err(err) =
        mail::run_share_with_stage(pool, ledger, broker, clock, meeting_key, &meeting, &resolved_room, &server, &owner.email, &owner.full_name).await
    {
        warn!(target: "orchestration_engine.main", %err, meeting_key, "shareWith stage failed");
    }

    if let Err(err) =
        mail::run_send_invitation_link_stage(ledger, broker, clock, meeting_key, &meeting, &resolved_room, &server, &owner.email, &owner.full_name).await
    {
        warn!(target: "orchestration_engine.main", %err, meeting_key, "sendInvitationLink stage failed");
    }

    if let Err(err) = mail::run_send_moderator_link_stage(
        ledger,
        broker,
        &conference,
        clock,
        meeting_key,
        &meeting,
        &resolved_room,
        &server,
        &owner.email,
        &owner.full_name,
    )
    .await
    {
        warn!(target: "orchestration_engine.main", %err, meeting_key, "sendModeratorLink stage failed");
    }

    match serde_json::to_string(&meeting) {
        Ok(payload) => {
            if let Err(err) = broker.put_record("meeting", meeting_key, &payload, None).await {
                warn!(target: "orchestration_engine.main", %err, meeting_key, "failed to persist meeting record");
            }
        }
        Err(err) => warn!(target: "orchestration_engine.main", %err, meeting_key, "failed to serialize meeting record"),
    }
}

async fn tick(pool: &PgPool, broker: &BrokerClient, ledger: &StatusLedger, cfg: &Args) {
    let meetings = match broker.set_members("meetings").await {
        Ok(meetings) => meetings,
        Err(err) => {
            warn!(target: "orchestration_engine.main", %err, "failed to list meetings");
            return;
        }
    };

    let clock = Clock::system();
    for meeting_key in meetings {
        debug!(target: "orchestration_engine.main", meeting_key = %meeting_key, "processing meeting");
        tick_meeting(pool, broker, ledger, cfg, &clock, &meeting_key).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "orchestration_engine=info".into()))
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
            error!(target: "orchestration_engine.main", %err, "failed to connect to tenant database");
            std::process::exit(1);
        }
    };

    let broker = match BrokerClient::connect(&args.redis_url).await {
        Ok(broker) => broker,
        Err(err) => {
            error!(target: "orchestration_engine.main", %err, "failed to connect to broker");
            std::process::exit(1);
        }
    };

    let ledger = StatusLedger::new(broker.clone(), args.keep_redis_cache);

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    info!(target: "orchestration_engine.main", "orchestration engine started");

    loop {
        tick(&pool, &broker, &ledger, &args).await;

        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(1)) => {},
            () = cancel_token.cancelled() => {
                info!(target: "orchestration_engine.main", "shutting down...");
                if let Err(err) = broker.bgsave().await {
                    warn!(target: "orchestration_engine.main", %err, "bgsave failed");
                }
                break;
            }
        }
    }
}
