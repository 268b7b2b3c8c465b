//! The five independently-gated mail stages a meeting tick can queue
//! (§5.4): owner info/started/reminder, then per-recipient share/invitation/
//! moderator-link mails.
//!
//! Every stage resolves `mailFrom`/`mailFromName`/`mailTo`/`mailToName`
//! through the same three-tier cascade: a stage-specific hardcoded default,
//! overridden by the server record's same-named field if present, overridden
//! again by the meeting record's same-named top-level field if present. For
//! `mailFrom`/`mailFromName` the default is always the meeting owner's
//! email/display name — the server record's `mailFrom`/`mailFromName` are
//! required fields, so in practice they always win unless the meeting record
//! overrides them too. `mailTo`/`mailToName` default to the current stage's
//! own recipient (the owner, or a `shareWith`/`sendInvitationLink`/
//! `sendModeratorLink` entry's email/fullName) but can still be globally
//! flattened by the server/meeting record's top-level `mailTo`/`mailToName` —
//! preserved exactly as observed even though it reads as an odd generalization
//! of a per-recipient default.
//!
//! There is no templating engine in this dependency stack (nothing in the
//! teacher or the wider example pack renders Jinja2-style templates), so
//! mail bodies here are built from fixed Rust format strings rather than
//! loaded from the meeting record's `*Template` override fields. Those
//! fields are still parsed and stored on [`MeetingRecord`] for forward
//! compatibility, they are simply not consulted for rendering.

use crate::config::Args;
use crate::error::Result;
use crate::room::ResolvedRoom;
use broker::ledger::EntityKind;
use broker::{BrokerClient, StatusLedger};
use common::domain::{MailContentType, MailProperties, MeetingRecord, ServerRecord};
use common::secret::ExposeSecret;
use common::time::{parse_ledger_timestamp, Clock};
use conference_api::{ConferenceApiClient, JoinRole};
use tracing::{debug, instrument, warn};

fn resolve_from(server: &ServerRecord, meeting: &MeetingRecord, owner_email: &str, owner_full_name: &str) -> (String, String) {
    let _ = (owner_email, owner_full_name);
    let mut from = server.mail_from.clone();
    let mut from_name = server.mail_from_name.clone();
    if let Some(v) = &meeting.mail_from {
        from = v.clone();
    }
    if let Some(v) = &meeting.mail_from_name {
        from_name = v.clone();
    }
    (from, from_name)
}

fn resolve_to(server: &ServerRecord, meeting: &MeetingRecord, default_to: &str, default_to_name: &str) -> (String, String) {
    let mut to = default_to.to_string();
    let mut to_name = default_to_name.to_string();
    if let Some(v) = &server.mail_to {
        to = v.clone();
    }
    if let Some(v) = &server.mail_to_name {
        to_name = v.clone();
    }
    if let Some(v) = &meeting.mail_to {
        to = v.clone();
    }
    if let Some(v) = &meeting.mail_to_name {
        to_name = v.clone();
    }
    (to, to_name)
}

fn build_mail(
    server: &ServerRecord,
    meeting: &MeetingRecord,
    meeting_or_command_id: &str,
    owner_email: &str,
    owner_full_name: &str,
    default_to: &str,
    default_to_name: &str,
    text: String,
) -> MailProperties {
    let (from, from_name) = resolve_from(server, meeting, owner_email, owner_full_name);
    let (to, to_name) = resolve_to(server, meeting, default_to, default_to_name);
    MailProperties {
        meeting_or_command_id: meeting_or_command_id.to_string(),
        mail_server: server.mail_server.clone(),
        mail_user: server.mail_user.clone(),
        mail_password: server.mail_password.expose_secret().to_string(),
        mail_from: from,
        mail_from_name: from_name,
        mail_to: to,
        mail_to_name: to_name,
        mail_text: text,
        content_type: MailContentType::Html,
    }
}

async fn queue_mail(broker: &BrokerClient, mail: &MailProperties) -> bool {
    let payload = match serde_json::to_string(mail) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(target: "orchestration_engine.mail", %err, "failed to serialize mail properties");
            return false;
        }
    };
    match broker.stream_append("mailStream", &payload).await {
        Ok(_) => true,
        Err(err) => {
            warn!(target: "orchestration_engine.mail", %err, "failed to queue mail");
            false
        }
    }
}

fn minutes_left(meeting: &MeetingRecord, clock: &Clock) -> Option<i64> {
    let start_date = parse_ledger_timestamp(meeting.start_date.as_deref()?)?;
    Some((start_date - clock.now().naive_local()).num_minutes())
}

/// Run the three owner-facing mail stages (info, started, reminder), each
/// independently gated on its own ledger field.
#[instrument(skip_all, fields(meeting_id = meeting_key))]
pub async fn run_owner_mail_stages(
    ledger: &StatusLedger,
    broker: &BrokerClient,
    clock: &Clock,
    cfg: &Args,
    meeting_key: &str,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
    server: &ServerRecord,
    owner_email: &str,
    owner_full_name: &str,
) -> Result<()> {
    if ledger
        .effective_code(EntityKind::Meeting, meeting_key, &["owner", "infoMailSent"])
        .await?
        != Some("250".to_string())
    {
        let text = format!(
            "{owner_full_name}, your meeting \"{}\" is scheduled. Join here: {}",
            meeting.meeting_name, room.meeting_link
        );
        let mail = build_mail(
            server,
            meeting,
            meeting_key,
            owner_email,
            owner_full_name,
            owner_email,
            owner_full_name,
            text,
        );
        let (code, message) = if queue_mail(broker, &mail).await {
            ("250", "sent owner info mail")
        } else {
            ("550", "sending mail failed")
        };
        ledger
            .set_status(EntityKind::Meeting, meeting_key, &["owner", "infoMailSent"], code, message, clock)
            .await?;
    }

    let status = ledger.effective_code(EntityKind::Meeting, meeting_key, &["status"]).await?;
    if matches!(status.as_deref(), Some("210") | Some("220"))
        && ledger
            .effective_code(EntityKind::Meeting, meeting_key, &["owner", "startMailSent"])
            .await?
            != Some("250".to_string())
    {
        let text = format!(
            "{owner_full_name}, your meeting \"{}\" has started. Join here: {}",
            meeting.meeting_name, room.meeting_link
        );
        let mail = build_mail(
            server,
            meeting,
            meeting_key,
            owner_email,
            owner_full_name,
            owner_email,
            owner_full_name,
            text,
        );
        let (code, message) = if queue_mail(broker, &mail).await {
            ("250", "sent owner started mail")
        } else {
            ("550", "sending mail failed")
        };
        ledger
            .set_status(EntityKind::Meeting, meeting_key, &["owner", "startMailSent"], code, message, clock)
            .await?;
    }

    if status.as_deref() != Some("220") {
        let reminder_minutes = meeting.reminder_minutes.unwrap_or(cfg.reminder_minutes);
        if reminder_minutes > 0 {
            if let Some(left) = minutes_left(meeting, clock) {
                let pre_start_minutes = meeting.pre_start_minutes.unwrap_or(cfg.pre_start);
                if left - pre_start_minutes - reminder_minutes > 0 {
                    debug!(target: "orchestration_engine.mail", meeting_key, "counting down to owner reminder mail");
                } else if left - pre_start_minutes > 0
                    && ledger
                        .effective_code(EntityKind::Meeting, meeting_key, &["owner", "reminderMailSent"])
                        .await?
                        != Some("250".to_string())
                {
                    let text = format!(
                        "{owner_full_name}, reminder: your meeting \"{}\" starts soon. Join here: {}",
                        meeting.meeting_name, room.meeting_link
                    );
                    let mail = build_mail(
                        server,
                        meeting,
                        meeting_key,
                        owner_email,
                        owner_full_name,
                        owner_email,
                        owner_full_name,
                        text,
                    );
                    let (code, message) = if queue_mail(broker, &mail).await {
                        ("250", "sent owner reminder mail")
                    } else {
                        ("550", "sending mail failed")
                    };
                    ledger
                        .set_status(EntityKind::Meeting, meeting_key, &["owner", "reminderMailSent"], code, message, clock)
                        .await?;
                }
            }
        }
    }

    Ok(())
}

/// Run the `shareWith` stage: grant each recipient room access (if not
/// already granted) and independently send a confirmation mail.
#[instrument(skip_all, fields(meeting_id = meeting_key))]
pub async fn run_share_with_stage(
    pool: &sqlx::PgPool,
    ledger: &StatusLedger,
    broker: &BrokerClient,
    clock: &Clock,
    meeting_key: &str,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
    server: &ServerRecord,
    owner_email: &str,
    owner_full_name: &str,
) -> Result<()> {
    for (email, recipient) in &meeting.share_with {
        let full_name = recipient.full_name_or_default(email);

        let already_shared = ledger
            .effective_code(EntityKind::Meeting, meeting_key, &["shareWith", email])
            .await?
            == Some("220".to_string());
        if already_shared {
            debug!(target: "orchestration_engine.mail", meeting_key, email, "room already shared");
        } else {
            let shared = tenant_db::SharedAccessRepository::share_room(pool, &room.row.uid, tenant_db::RoomKey::Uid, email).await?;
            if shared > 0 {
                ledger
                    .set_status(EntityKind::Meeting, meeting_key, &["shareWith", email], "220", "room shared", clock)
                    .await?;
            }
        }

        if ledger
            .effective_code(EntityKind::Meeting, meeting_key, &["shareWith", email, "sendShareMail"])
            .await?
            != Some("250".to_string())
        {
            let text = format!(
                "{full_name}, the room \"{}\" has been shared with you. Join here: {}",
                meeting.meeting_name, room.meeting_link
            );
            let mail = build_mail(server, meeting, meeting_key, owner_email, owner_full_name, email, &full_name, text);
            let (code, message) = if queue_mail(broker, &mail).await {
                ("250", "sent share mail")
            } else {
                ("440", "could not send share mail")
            };
            ledger
                .set_status(EntityKind::Meeting, meeting_key, &["shareWith", email, "sendShareMail"], code, message, clock)
                .await?;
        }
    }
    Ok(())
}

/// Run the `sendInvitationLink` stage: each recipient is mailed the plain
/// meeting link at most once, ever.
#[instrument(skip_all, fields(meeting_id = meeting_key))]
pub async fn run_send_invitation_link_stage(
    ledger: &StatusLedger,
    broker: &BrokerClient,
    clock: &Clock,
    meeting_key: &str,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
    server: &ServerRecord,
    owner_email: &str,
    owner_full_name: &str,
) -> Result<()> {
    for (email, recipient) in &meeting.send_invitation_link {
        if ledger
            .effective_code(EntityKind::Meeting, meeting_key, &["sendInvitationLink", email])
            .await?
            == Some("250".to_string())
        {
            debug!(target: "orchestration_engine.mail", meeting_key, email, "invitation already sent");
            continue;
        }

        let full_name = recipient.full_name_or_default(email);
        let text = format!(
            "{full_name}, you are invited to \"{}\". Join here: {}",
            meeting.meeting_name, room.meeting_link
        );
        let mail = build_mail(server, meeting, meeting_key, owner_email, owner_full_name, email, &full_name, text);
        let (code, message) = if queue_mail(broker, &mail).await {
            ("250", "invitation mail sent")
        } else {
            ("550", "invitation mail could not be sent")
        };
        ledger
            .set_status(EntityKind::Meeting, meeting_key, &["sendInvitationLink", email], code, message, clock)
            .await?;
    }
    Ok(())
}

/// Run the `sendModeratorLink` stage: each recipient is mailed a
/// moderator-role join link at most once, ever.
#[instrument(skip_all, fields(meeting_id = meeting_key))]
pub async fn run_send_moderator_link_stage(
    ledger: &StatusLedger,
    broker: &BrokerClient,
    conference: &ConferenceApiClient,
    clock: &Clock,
    meeting_key: &str,
    meeting: &MeetingRecord,
    room: &ResolvedRoom,
    server: &ServerRecord,
    owner_email: &str,
    owner_full_name: &str,
) -> Result<()> {
    for (email, recipient) in &meeting.send_moderator_link {
        if ledger
            .effective_code(EntityKind::Meeting, meeting_key, &["sendModeratorLink", email])
            .await?
            == Some("250".to_string())
        {
            debug!(target: "orchestration_engine.mail", meeting_key, email, "moderator link already sent");
            continue;
        }

        let full_name = recipient.full_name_or_default(email);
        let moderator_link = conference
            .join_url(&room.meeting_id, &full_name, JoinRole::Moderator, Some(&room.row.moderator_pw))
            .await;

        let Some(moderator_link) = moderator_link else {
            ledger
                .set_status(
                    EntityKind::Meeting,
                    meeting_key,
                    &["sendModeratorLink", email],
                    "440",
                    "could not create moderator link",
                    clock,
                )
                .await?;
            continue;
        };

        let text = format!("{full_name}, join \"{}\" as moderator here: {moderator_link}", meeting.meeting_name);
        let mail = build_mail(server, meeting, meeting_key, owner_email, owner_full_name, email, &full_name, text);
        let (code, message) = if queue_mail(broker, &mail).await {
            ("250", "sent moderator info mail")
        } else {
            ("440", "could not send moderator info mail")
        };
        ledger
            .set_status(EntityKind::Meeting, meeting_key, &["sendModeratorLink", email], code, message, clock)
            .await?;
    }
    Ok(())
}
