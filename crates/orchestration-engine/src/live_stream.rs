//! Live-streaming bridge (§5.3): shells out to `ssh` to bounce a
//! `docker-compose`-managed streamer container once a meeting has started.
//!
//! There is no SSH client crate anywhere in the dependency stack this
//! system was built from — the original drove this the same way, via
//! `subprocess.run("ssh root@host ...")`, so this shells out to the local
//! `ssh` binary rather than pulling in an SSH library for a single
//! fire-and-forget command pair.

use crate::error::Result;
use broker::ledger::EntityKind;
use broker::StatusLedger;
use common::domain::{LiveStreamingSpec, ServerRecord};
use common::secret::ExposeSecret;
use common::time::Clock;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

async fn run_ssh(host: &str, remote_command: &str) -> bool {
    match Command::new("ssh")
        .arg(format!("root@{host}"))
        .arg(remote_command)
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(err) => {
            warn!(target: "orchestration_engine.live_stream", %err, host, "failed to spawn ssh");
            false
        }
    }
}

/// Bounce the streamer container for a meeting whose `liveStreaming` block
/// is present, once its `['status']` has reached `220`.
#[instrument(skip_all, fields(meeting_id = meeting_key, host = %spec.streamer_host))]
pub async fn bridge(
    ledger: &StatusLedger,
    clock: &Clock,
    meeting_key: &str,
    meeting_id: &str,
    server: &ServerRecord,
    spec: &LiveStreamingSpec,
) -> Result<()> {
    let already_live = ledger
        .effective_code(EntityKind::Meeting, meeting_key, &["liveStreaming"])
        .await?
        == Some("220".to_string());
    if already_live {
        debug!(target: "orchestration_engine.live_stream", meeting_key, "already started");
        return Ok(());
    }

    let meeting_started = ledger
        .effective_code(EntityKind::Meeting, meeting_key, &["status"])
        .await?
        == Some("220".to_string());
    if !meeting_started {
        debug!(target: "orchestration_engine.live_stream", meeting_key, "waiting for meeting to start");
        return Ok(());
    }

    if run_ssh(&spec.streamer_host, "cd; cd BigBlueButton-liveStreaming; docker-compose down").await {
        ledger
            .set_status(
                EntityKind::Meeting,
                meeting_key,
                &["liveStreaming"],
                "210",
                "old liveStreaming stopped!",
                clock,
            )
            .await?;
    }

    let intro_flag = spec
        .play_intro
        .as_ref()
        .map(|intro| format!(" BBB_INTRO=\"{intro}\""))
        .unwrap_or_default();
    let remote_command = format!(
        "cd; cd BigBlueButton-liveStreaming; BBB_URL=\"{}\" BBB_SECRET=\"{}\" BBB_MEETING_ID=\"{}\" BBB_STREAM_URL=\"{}\"{} docker-compose up -d",
        server.bbb_url,
        server.bbb_secret.expose_secret(),
        meeting_id,
        spec.target_url,
        intro_flag
    );

    if run_ssh(&spec.streamer_host, &remote_command).await {
        info!(target: "orchestration_engine.live_stream", meeting_key, "liveStreaming started!");
        ledger
            .set_status(EntityKind::Meeting, meeting_key, &["liveStreaming"], "220", "liveStreaming started!", clock)
            .await?;
    } else {
        warn!(target: "orchestration_engine.live_stream", meeting_key, "liveStreaming failed!");
        ledger
            .set_status(EntityKind::Meeting, meeting_key, &["liveStreaming"], "400", "liveStreaming failed!", clock)
            .await?;
    }

    Ok(())
}
