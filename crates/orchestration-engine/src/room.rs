//! Room resolution and field propagation (§5.1: "resolve a room for the
//! meeting", §4.4 step 4: "propagate overrides onto the row").

use crate::error::Result;
use crate::owner::ResolvedOwner;
use broker::ledger::EntityKind;
use broker::StatusLedger;
use common::domain::MeetingRecord;
use common::time::Clock;
use conference_api::{ConferenceApiClient, JoinRole};
use sqlx::PgPool;
use tenant_db::{NewRoom, RoomKey, RoomRow, RoomsRepository, UsersRepository};
use tracing::{instrument, warn};

/// A room resolved and ready to be scheduled, with every meeting-record
/// override already propagated and the live `bbb_id`/links recomputed.
pub struct ResolvedRoom {
    pub room_id: i64,
    pub row: RoomRow,
    /// Recomputed from the room's (possibly just-overridden) `bbb_id`
    /// column, not the meeting record's own `meetingID` field.
    pub meeting_id: String,
    pub meeting_link: String,
    pub moderator_link: Option<String>,
}

async fn create_home_room(pool: &PgPool, owner: &ResolvedOwner, meeting: &MeetingRecord) -> Result<Option<i64>> {
    let new_room = NewRoom {
        owner_email: owner.email.clone(),
        meeting_name: Some(meeting.meeting_name.clone()),
        ..Default::default()
    };
    let Some(room_id) = RoomsRepository::create_room(pool, new_room).await? else {
        return Ok(None);
    };
    UsersRepository::set_home_room(pool, owner.user_id, room_id).await?;
    Ok(Some(room_id))
}

async fn create_uid_room(
    pool: &PgPool,
    owner: &ResolvedOwner,
    meeting: &MeetingRecord,
    meeting_uid: &str,
) -> Result<Option<i64>> {
    let new_room = NewRoom {
        owner_email: owner.email.clone(),
        meeting_name: Some(meeting.meeting_name.clone()),
        meeting_uid: Some(meeting_uid.to_string()),
        access_code: meeting.access_code.clone(),
        ..Default::default()
    };
    RoomsRepository::create_room(pool, new_room).await
}

/// Resolve (creating if necessary) the room a meeting runs in, via three
/// mutually exclusive branches: the owner's home room, a room keyed by
/// `meetingUID`, or — failing both — no room at all.
///
/// Note the deliberately-preserved status-code discrepancy: a `meetingUID`
/// room that cannot be created reports `401`, while every other
/// room-resolution failure reports `404` (§9 Open Question 6).
#[instrument(skip_all, fields(meeting_id = meeting_key))]
async fn resolve_room_id(
    pool: &PgPool,
    ledger: &StatusLedger,
    clock: &Clock,
    meeting_key: &str,
    meeting: &MeetingRecord,
    owner: &ResolvedOwner,
) -> Result<Option<i64>> {
    if meeting.use_home_room {
        let room_id = match UsersRepository::find_room_id_by_email(pool, &owner.email).await? {
            Some(room_id) => Some(room_id),
            None => create_home_room(pool, owner, meeting).await?,
        };
        return match room_id {
            Some(room_id) => Ok(Some(room_id)),
            None => {
                warn!(target: "orchestration_engine.room", meeting_key, "home room could not be used");
                ledger
                    .set_status(
                        EntityKind::Meeting,
                        meeting_key,
                        &["status"],
                        "404",
                        "home room could not be used",
                        clock,
                    )
                    .await?;
                Ok(None)
            }
        };
    }

    if let Some(meeting_uid) = &meeting.meeting_uid {
        let room_id = match RoomsRepository::find_id(pool, RoomKey::Uid, meeting_uid).await? {
            Some(room_id) => Some(room_id),
            None => create_uid_room(pool, owner, meeting, meeting_uid).await?,
        };
        return match room_id {
            Some(room_id) => Ok(Some(room_id)),
            None => {
                warn!(target: "orchestration_engine.room", meeting_key, "room could not be created");
                ledger
                    .set_status(
                        EntityKind::Meeting,
                        meeting_key,
                        &["status"],
                        "401",
                        "room could not be created",
                        clock,
                    )
                    .await?;
                Ok(None)
            }
        };
    }

    warn!(target: "orchestration_engine.room", meeting_key, "no room available");
    ledger
        .set_status(
            EntityKind::Meeting,
            meeting_key,
            &["status"],
            "404",
            "no room available",
            clock,
        )
        .await?;
    Ok(None)
}

/// Propagate the meeting record's `meetingName`/`meetingUID`/`accessCode`/
/// `meetingID` overrides onto the room row, then re-fetch it so the
/// effective `bbb_id`/`uid` reflect whatever just happened.
async fn propagate_overrides(pool: &PgPool, room_id: i64, meeting: &MeetingRecord) -> Result<RoomRow> {
    RoomsRepository::update_room_field(pool, room_id, "name", &meeting.meeting_name).await?;
    if let Some(uid) = &meeting.meeting_uid {
        RoomsRepository::update_room_field(pool, room_id, "uid", uid).await?;
    }
    if let Some(access_code) = &meeting.access_code {
        RoomsRepository::update_room_field(pool, room_id, "access_code", access_code).await?;
    }
    if let Some(bbb_id) = &meeting.meeting_id {
        RoomsRepository::update_room_field(pool, room_id, "bbb_id", bbb_id).await?;
    }

    RoomsRepository::fetch_row(pool, room_id)
        .await?
        .ok_or_else(|| crate::error::EngineError::Malformed(format!("room {room_id} vanished mid-tick")))
}

/// Resolve a meeting's room end to end: id resolution, override
/// propagation, and the derived `meetingID`/links every later tick stage
/// reads.
pub async fn resolve_room(
    pool: &PgPool,
    ledger: &StatusLedger,
    clock: &Clock,
    conference: &ConferenceApiClient,
    link_base: &str,
    meeting_key: &str,
    meeting: &MeetingRecord,
    owner: &ResolvedOwner,
) -> Result<Option<ResolvedRoom>> {
    let Some(room_id) = resolve_room_id(pool, ledger, clock, meeting_key, meeting, owner).await? else {
        return Ok(None);
    };

    let row = propagate_overrides(pool, room_id, meeting).await?;

    let meeting_link = format!("{link_base}/{}", row.uid);
    let moderator_link = conference
        .join_url(&row.bbb_id, "Moderator", JoinRole::Moderator, Some(&row.moderator_pw))
        .await;

    Ok(Some(ResolvedRoom {
        room_id,
        meeting_id: row.bbb_id.clone(),
        meeting_link,
        moderator_link,
        row,
    }))
}
