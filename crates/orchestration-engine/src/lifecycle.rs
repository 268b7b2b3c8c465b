//! Start/pre-open/end-after state machine (§5.2: "start logic" and
//! "end-after logic").
//!
//! Every stage here is gated by the status ledger rather than in-memory
//! state, so a restarted engine picks up exactly where it left off.

use crate::config::Args;
use crate::error::Result;
use crate::room::ResolvedRoom;
use broker::ledger::EntityKind;
use broker::StatusLedger;
use common::domain::MeetingRecord;
use common::time::{parse_ledger_timestamp, Clock};
use conference_api::{ConferenceApiClient, CreateMeetingParams, StartOutcome};
use std::time::Duration;
use tracing::{debug, instrument, warn};

fn substitute_start_date(template: Option<&str>, start_date: Option<&str>) -> Option<String> {
    let template = template?;
    match start_date {
        Some(start_date) => Some(template.replace("__startDate__", start_date)),
        None => Some(template.to_string()),
    }
}

fn create_params<'a>(
    meeting: &'a MeetingRecord,
    room: &'a ResolvedRoom,
    welcome: &'a Option<String>,
    banner_text: &'a Option<String>,
) -> CreateMeetingParams<'a> {
    CreateMeetingParams {
        name: Some(room.row.name.as_str()),
        moderator_pw: Some(room.row.moderator_pw.as_str()),
        attendee_pw: Some(room.row.attendee_pw.as_str()),
        mute_on_start: meeting.mute_on_start,
        welcome: welcome.as_deref(),
        banner_text: banner_text.as_deref(),
        max_participants: meeting.max_participants,
        logout_url: meeting.logout_url.as_deref(),
        record: meeting.record,
        duration: meeting.duration,
        auto_start_recording: meeting.auto_start_recording,
        allow_start_stop_recording: meeting.allow_start_stop_recording,
    }
}

async fn start_meeting(
    conference: &ConferenceApiClient,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
) -> StartOutcome {
    let welcome = substitute_start_date(meeting.welcome.as_deref(), meeting.start_date.as_deref());
    let banner_text = substitute_start_date(meeting.banner_text.as_deref(), meeting.start_date.as_deref());
    let params = create_params(meeting, room, &welcome, &banner_text);
    conference.create_meeting(&room.meeting_id, params).await
}

/// Run the main start branch (no `startDate`, or past the `preStartMinutes`
/// threshold) and set `['status']` per the 1/2/0 outcome.
async fn start_and_report(
    ledger: &StatusLedger,
    clock: &Clock,
    conference: &ConferenceApiClient,
    meeting_key: &str,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
) -> Result<()> {
    let (code, message) = match start_meeting(conference, meeting, room).await {
        StartOutcome::UsersJoined => ("220", "meeting started, users joined"),
        StartOutcome::KeepOpen => ("210", "meeting started, no users joined yet"),
        StartOutcome::Failed => ("400", "meeting could not be started"),
    };
    ledger
        .set_status(EntityKind::Meeting, meeting_key, &["status"], code, message, clock)
        .await?;
    Ok(())
}

/// Run the pre-open branch: close and verify the meeting is gone (unless
/// already marked so), then restart it and stamp `['preOpen']` — never
/// `['status']` — with the outcome.
async fn pre_open(
    ledger: &StatusLedger,
    clock: &Clock,
    conference: &ConferenceApiClient,
    meeting_key: &str,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
) -> Result<()> {
    let already_reset = ledger
        .effective_code(EntityKind::Meeting, meeting_key, &["preOpen"])
        .await?
        == Some("220".to_string());

    if !already_reset {
        if conference.end_meeting(&room.meeting_id).await {
            tokio::time::sleep(Duration::from_secs(4)).await;
            if conference.meeting_info(&room.meeting_id).await.is_none() {
                ledger
                    .set_status(
                        EntityKind::Meeting,
                        meeting_key,
                        &["preOpen"],
                        "220",
                        "closed meeting to reset parameters for reopening",
                        clock,
                    )
                    .await?;
            } else {
                ledger
                    .set_status(
                        EntityKind::Meeting,
                        meeting_key,
                        &["preOpen"],
                        "420",
                        "could not close meeting for preOpening",
                        clock,
                    )
                    .await?;
            }
        } else {
            ledger
                .set_status(
                    EntityKind::Meeting,
                    meeting_key,
                    &["preOpen"],
                    "220",
                    "meeting was not running",
                    clock,
                )
                .await?;
        }
    }

    let (code, message) = match start_meeting(conference, meeting, room).await {
        StartOutcome::UsersJoined | StartOutcome::KeepOpen => ("220", "meeting reopened"),
        StartOutcome::Failed => ("400", "meeting could not be reopened"),
    };
    ledger
        .set_status(EntityKind::Meeting, meeting_key, &["preOpen"], code, message, clock)
        .await?;
    Ok(())
}

/// Run the full start/pre-open decision tree for one tick, skipped entirely
/// if the meeting has already reached `['status']` `220`.
#[instrument(skip_all, fields(meeting_id = meeting_key))]
pub async fn run_start_logic(
    ledger: &StatusLedger,
    clock: &Clock,
    conference: &ConferenceApiClient,
    cfg: &Args,
    meeting_key: &str,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
) -> Result<()> {
    let already_started = ledger
        .effective_code(EntityKind::Meeting, meeting_key, &["status"])
        .await?
        == Some("220".to_string());
    if already_started {
        return Ok(());
    }

    let Some(start_date_str) = &meeting.start_date else {
        return start_and_report(ledger, clock, conference, meeting_key, meeting, room).await;
    };

    let Some(start_date) = parse_ledger_timestamp(start_date_str) else {
        warn!(target: "orchestration_engine.lifecycle", meeting_key, start_date_str, "startDate malformed, skipping start logic");
        return Ok(());
    };

    let pre_start_minutes = meeting.pre_start_minutes.unwrap_or(cfg.pre_start);
    let minutes_left = (start_date - clock.now().naive_local()).num_minutes();

    if minutes_left - pre_start_minutes <= 0 {
        return start_and_report(ledger, clock, conference, meeting_key, meeting, room).await;
    }

    let pre_open_minutes = meeting.pre_open_minutes.unwrap_or(cfg.pre_open) + pre_start_minutes;
    if minutes_left - pre_open_minutes <= 0 {
        pre_open(ledger, clock, conference, meeting_key, meeting, room).await?;
    }

    debug!(target: "orchestration_engine.lifecycle", meeting_key, start_date_str, "waiting for startDate");
    ledger
        .set_status(
            EntityKind::Meeting,
            meeting_key,
            &["status"],
            "201",
            &format!("waiting for startDate {start_date_str}"),
            clock,
        )
        .await?;
    Ok(())
}

/// Run the end-after branch: force-close a meeting that has run past
/// `endAfterMinutes`, then stamp `['status']` `220` regardless of whether
/// the close itself succeeded (closing is best-effort; the meeting is
/// considered finished either way once the threshold passes).
#[instrument(skip_all, fields(meeting_id = meeting_key))]
pub async fn run_end_after_logic(
    ledger: &StatusLedger,
    clock: &Clock,
    conference: &ConferenceApiClient,
    cfg: &Args,
    meeting_key: &str,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
) -> Result<()> {
    let end_after_minutes = meeting.end_after_minutes.unwrap_or(cfg.end_after);
    if end_after_minutes <= 0 {
        return Ok(());
    }

    let Some(start_date_str) = &meeting.start_date else {
        return Ok(());
    };
    let Some(start_date) = parse_ledger_timestamp(start_date_str) else {
        return Ok(());
    };

    let minutes_passed = (clock.now().naive_local() - start_date).num_minutes();
    if minutes_passed <= 0 {
        return Ok(());
    }

    if minutes_passed < end_after_minutes {
        debug!(
            target: "orchestration_engine.lifecycle",
            meeting_key,
            minutes_passed,
            end_after_minutes,
            "counting down to end-after"
        );
        return Ok(());
    }

    let already_closed = ledger
        .effective_code(EntityKind::Meeting, meeting_key, &["endMeeting"])
        .await?
        == Some("220".to_string());

    if !already_closed {
        if conference.end_meeting(&room.meeting_id).await {
            tokio::time::sleep(Duration::from_secs(4)).await;
            if conference.meeting_info(&room.meeting_id).await.is_none() {
                ledger
                    .set_status(EntityKind::Meeting, meeting_key, &["endMeeting"], "220", "closed meeting", clock)
                    .await?;
            } else {
                ledger
                    .set_status(
                        EntityKind::Meeting,
                        meeting_key,
                        &["endMeeting"],
                        "420",
                        "could not close meeting",
                        clock,
                    )
                    .await?;
            }
        } else {
            ledger
                .set_status(
                    EntityKind::Meeting,
                    meeting_key,
                    &["endMeeting"],
                    "220",
                    "meeting was not running",
                    clock,
                )
                .await?;
        }
    }

    ledger
        .set_status(
            EntityKind::Meeting,
            meeting_key,
            &["status"],
            "220",
            "meeting has finished and was closed",
            clock,
        )
        .await?;
    Ok(())
}
