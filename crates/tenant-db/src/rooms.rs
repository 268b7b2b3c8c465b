//! Rooms repository (§4.2: `createRoom`, `renameRoom`, `deleteRoom`, field
//! propagation).

use crate::error::{Result, TenantDbError};
use crate::support::{get_table_field, random_hex_id, random_secret, update_field, Table};
use crate::users::UsersRepository;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

/// Parameters accepted by [`RoomsRepository::create_room`].
#[derive(Debug, Clone, Default)]
pub struct NewRoom {
    /// Owner email; the owner must already exist.
    pub owner_email: String,
    /// Room display name; defaults to the owner's email when absent.
    pub meeting_name: Option<String>,
    /// Tenant room alias; defaults to 11 random alphanumerics. Uniqueness
    /// is enforced — a collision makes `create_room` return `None`.
    pub meeting_uid: Option<String>,
    /// Serialized `room_settings` blob; defaults to the original's
    /// stringly-typed default (`muteOnStart:true, ...`).
    pub room_settings: Option<String>,
    /// Conference-server meeting id; defaults to a 32-char hex id.
    pub bbb_id: Option<String>,
    /// Attendee password; defaults to 11 random alphanumerics.
    pub attendee_pw: Option<String>,
    /// Moderator password; defaults to 11 random alphanumerics.
    pub moderator_pw: Option<String>,
    /// Optional access code gate.
    pub access_code: Option<String>,
}

/// Which field a room is looked up or renamed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomKey {
    /// Tenant room alias (`rooms.uid`).
    Uid,
    /// Room display name (`rooms.name`).
    Name,
    /// Numeric primary key (`rooms.id`).
    Id,
}

impl RoomKey {
    pub(crate) fn column(self) -> &'static str {
        match self {
            RoomKey::Uid => "uid",
            RoomKey::Name => "name",
            RoomKey::Id => "id",
        }
    }
}

fn default_room_settings() -> String {
    json!({
        "muteOnStart": true,
        "requireModeratorApproval": false,
        "anyoneCanStart": false,
        "joinModerator": false,
    })
    .to_string()
}

/// A room row as read back after creation or before propagating overrides
/// onto it (§4.4 step 4).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRow {
    pub id: i64,
    pub name: String,
    pub uid: String,
    pub bbb_id: String,
    pub moderator_pw: String,
    pub attendee_pw: String,
    pub access_code: Option<String>,
}

/// Rooms repository: stateless, associated functions over a shared pool.
pub struct RoomsRepository;

impl RoomsRepository {
    /// Resolve a room's numeric id by `key`, or `None` if no row matches.
    #[instrument(skip_all, fields(key = ?key, value = value))]
    pub async fn find_id(pool: &PgPool, key: RoomKey, value: &str) -> Result<Option<i64>> {
        let id = get_table_field(pool, Table::Rooms, key.column(), value, "id").await?;
        Ok(id.and_then(|s| s.parse().ok()))
    }

    /// Create a room for an existing owner. Returns `None` if the owner
    /// does not exist, or if `meeting_uid` collides with an existing room.
    #[instrument(skip_all, fields(owner_email = %new_room.owner_email))]
    pub async fn create_room(pool: &PgPool, new_room: NewRoom) -> Result<Option<i64>> {
        let Some(user_id) = UsersRepository::find_id_by_email(pool, &new_room.owner_email).await?
        else {
            warn!(
                target: "tenant_db.rooms",
                owner_email = %new_room.owner_email,
                "owner does not exist, refusing to create room"
            );
            return Ok(None);
        };

        let meeting_name = new_room
            .meeting_name
            .unwrap_or_else(|| new_room.owner_email.clone());
        let bbb_id = new_room.bbb_id.unwrap_or_else(random_hex_id);
        let meeting_uid = new_room.meeting_uid.unwrap_or_else(|| random_secret(11));

        if Self::find_id(pool, RoomKey::Uid, &meeting_uid).await?.is_some() {
            warn!(
                target: "tenant_db.rooms",
                meeting_uid = %meeting_uid,
                "room alias already exists, refusing to create room"
            );
            return Ok(None);
        }

        let attendee_pw = new_room.attendee_pw.unwrap_or_else(|| random_secret(11));
        let moderator_pw = new_room.moderator_pw.unwrap_or_else(|| random_secret(11));
        let room_settings = new_room.room_settings.unwrap_or_else(default_room_settings);
        let now = Utc::now();

        let row: (i64,) = sqlx::query_as(
            "INSERT INTO rooms (
                user_id, name, uid, bbb_id, sessions, last_session,
                created_at, updated_at, room_settings, moderator_pw,
                attendee_pw, access_code, deleted
             ) VALUES (
                $1, $2, $3, $4, 0, NULL,
                $5, $5, $6, $7,
                $8, $9, false
             ) RETURNING id",
        )
        .bind(user_id)
        .bind(&meeting_name)
        .bind(&meeting_uid)
        .bind(&bbb_id)
        .bind(now)
        .bind(&room_settings)
        .bind(&moderator_pw)
        .bind(&attendee_pw)
        .bind(&new_room.access_code)
        .fetch_one(pool)
        .await
        .map_err(|e| TenantDbError::Query(e.to_string()))?;

        debug!(target: "tenant_db.rooms", id = row.0, meeting_uid = %meeting_uid, "created room");
        Ok(Some(row.0))
    }

    /// Rename a room by `uid` or `name`, writing the same column it was
    /// looked up by.
    #[instrument(skip_all, fields(rename_by = ?rename_by))]
    pub async fn rename_room(
        pool: &PgPool,
        rename_by: RoomKey,
        old_value: &str,
        new_value: &str,
    ) -> Result<u64> {
        if rename_by != RoomKey::Uid && rename_by != RoomKey::Name {
            warn!(
                target: "tenant_db.rooms",
                rename_by = ?rename_by,
                "renaming rooms is only allowed by uid or name"
            );
            return Ok(0);
        }
        update_field(
            pool,
            Table::Rooms,
            rename_by.column(),
            old_value,
            rename_by.column(),
            Some(new_value),
        )
        .await
    }

    /// Fetch the columns the orchestration engine needs back after creating
    /// or propagating overrides onto a room (`tableRowAsDict('rooms', ...)`).
    #[instrument(skip_all, fields(room_id = room_id))]
    pub async fn fetch_row(pool: &PgPool, room_id: i64) -> Result<Option<RoomRow>> {
        let row = sqlx::query_as(
            "SELECT id, name, uid, bbb_id, moderator_pw, attendee_pw, access_code \
             FROM rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| TenantDbError::Query(e.to_string()))?;
        Ok(row)
    }

    /// Propagate meeting-record overrides onto an existing room row
    /// (§4.4 step 4: "propagate overrides ... to the row").
    #[instrument(skip_all, fields(room_id = room_id))]
    pub async fn update_room_field(pool: &PgPool, room_id: i64, field: &str, value: &str) -> Result<u64> {
        update_field(pool, Table::Rooms, "id", &room_id.to_string(), field, Some(value)).await
    }

    /// Delete a room by `key`, cascading to the owner's home-room pointer
    /// and to `shared_accesses` rows referencing it.
    #[instrument(skip_all, fields(key = ?key, value = value))]
    pub async fn delete_room(pool: &PgPool, key: &str, value: &str) -> Result<u64> {
        let room_key = match key {
            "uid" => RoomKey::Uid,
            "name" => RoomKey::Name,
            _ => RoomKey::Id,
        };

        let Some(room_id) = Self::find_id(pool, room_key, value).await? else {
            warn!(target: "tenant_db.rooms", key, value, "no such room");
            return Ok(0);
        };

        let deleted = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(pool)
            .await
            .map_err(|e| TenantDbError::Query(e.to_string()))?
            .rows_affected();

        if deleted == 0 {
            debug!(target: "tenant_db.rooms", room_id, "could not delete room");
            return Ok(0);
        }
        debug!(target: "tenant_db.rooms", room_id, "deleted room");

        let unlinked = update_field(
            pool,
            Table::Users,
            "room_id",
            &room_id.to_string(),
            "room_id",
            None,
        )
        .await?;
        if unlinked > 0 {
            debug!(target: "tenant_db.rooms", room_id, "unlinked home room reference");
        }

        let shares_removed = sqlx::query("DELETE FROM shared_accesses WHERE room_id = $1")
            .bind(room_id)
            .execute(pool)
            .await
            .map_err(|e| TenantDbError::Query(e.to_string()))?
            .rows_affected();
        if shares_removed > 0 {
            debug!(target: "tenant_db.rooms", room_id, shares_removed, "removed shared access rows");
        }

        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_room_settings_matches_original_defaults() {
        let settings = default_room_settings();
        let parsed: serde_json::Value = serde_json::from_str(&settings).expect("valid json");
        assert_eq!(parsed["muteOnStart"], true);
        assert_eq!(parsed["requireModeratorApproval"], false);
        assert_eq!(parsed["anyoneCanStart"], false);
        assert_eq!(parsed["joinModerator"], false);
    }
}
