//! Shared-access repository (§4.2: `shareRoom`/`unshareRoom`).

use crate::error::{Result, TenantDbError};
use crate::rooms::RoomKey;
use crate::support::get_table_field;
use crate::users::UsersRepository;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{instrument, warn};

async fn resolve_room_id(pool: &PgPool, room_ref: &str, by: RoomKey) -> Result<Option<i64>> {
    match by {
        RoomKey::Id => Ok(room_ref.parse().ok()),
        RoomKey::Uid | RoomKey::Name => {
            let id = get_table_field(
                pool,
                crate::support::Table::Rooms,
                by.column(),
                room_ref,
                "id",
            )
            .await?;
            Ok(id.and_then(|s| s.parse().ok()))
        }
    }
}

/// Shared-access repository: stateless, associated functions over a shared pool.
pub struct SharedAccessRepository;

impl SharedAccessRepository {
    /// Grant `email` access to a room. Returns `0` if the user does not
    /// exist or the room cannot be resolved.
    #[instrument(skip_all, fields(email = email, room_ref = room_ref))]
    pub async fn share_room(pool: &PgPool, room_ref: &str, by: RoomKey, email: &str) -> Result<u64> {
        let Some(user_id) = UsersRepository::find_id_by_email(pool, email).await? else {
            warn!(target: "tenant_db.shared_access", email, "user does not exist, cannot share room");
            return Ok(0);
        };
        let Some(room_id) = resolve_room_id(pool, room_ref, by).await? else {
            warn!(target: "tenant_db.shared_access", room_ref, "room does not exist, cannot share");
            return Ok(0);
        };

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO shared_accesses (room_id, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $3)",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| TenantDbError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Revoke `email`'s access to a room. Validated against the same
    /// resolution logic as [`Self::share_room`] — the original validates
    /// `unshare_room`'s payload against the `share_room` schema, and this
    /// mirrors that by reusing the identical resolution path rather than a
    /// separate one.
    #[instrument(skip_all, fields(email = email, room_ref = room_ref))]
    pub async fn unshare_room(pool: &PgPool, room_ref: &str, by: RoomKey, email: &str) -> Result<u64> {
        let Some(user_id) = UsersRepository::find_id_by_email(pool, email).await? else {
            warn!(target: "tenant_db.shared_access", email, "user does not exist, cannot unshare room");
            return Ok(0);
        };
        let Some(room_id) = resolve_room_id(pool, room_ref, by).await? else {
            warn!(target: "tenant_db.shared_access", room_ref, "room does not exist, cannot unshare");
            return Ok(0);
        };

        let result = sqlx::query("DELETE FROM shared_accesses WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(|e| TenantDbError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
