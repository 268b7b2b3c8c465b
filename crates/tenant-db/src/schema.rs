//! Startup schema-compatibility check (§4.2, `checkCompatibility`).
//!
//! The adapter was written against a fixed, exact column order for three
//! Greenlight tables. If a migration has since changed any of them, every
//! hand-written `SELECT`/`INSERT` below risks silently reading or writing
//! the wrong column — so a mismatch here is fatal, not logged-and-ignored
//! like every other adapter failure.

use crate::error::{Result, TenantDbError};
use sqlx::PgPool;

/// Expected `users` columns, in order, resolved from `original_source/greenLight.py`.
pub const USERS_COLUMNS: &[&str] = &[
    "id",
    "room_id",
    "provider",
    "uid",
    "name",
    "username",
    "email",
    "social_uid",
    "image",
    "password_digest",
    "accepted_terms",
    "created_at",
    "updated_at",
    "email_verified",
    "language",
    "reset_digest",
    "reset_sent_at",
    "activation_digest",
    "activated_at",
    "deleted",
    "role_id",
];

/// Expected `rooms` columns, in order.
pub const ROOMS_COLUMNS: &[&str] = &[
    "id",
    "user_id",
    "name",
    "uid",
    "bbb_id",
    "sessions",
    "last_session",
    "created_at",
    "updated_at",
    "room_settings",
    "moderator_pw",
    "attendee_pw",
    "access_code",
    "deleted",
];

/// Expected `shared_accesses` columns, in order.
pub const SHARED_ACCESSES_COLUMNS: &[&str] =
    &["id", "room_id", "user_id", "created_at", "updated_at"];

async fn live_columns(pool: &PgPool, table: &str) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_name = $1 ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| TenantDbError::Query(e.to_string()))?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Verify `users`, `rooms`, and `shared_accesses` still have the exact
/// column order this adapter was built against.
///
/// # Errors
///
/// Returns [`TenantDbError::SchemaMismatch`] for the first table whose live
/// columns differ from the expected list.
pub async fn check_compatibility(pool: &PgPool) -> Result<()> {
    for (table, expected) in [
        ("users", USERS_COLUMNS),
        ("rooms", ROOMS_COLUMNS),
        ("shared_accesses", SHARED_ACCESSES_COLUMNS),
    ] {
        let actual = live_columns(pool, table).await?;
        if actual != expected {
            return Err(TenantDbError::SchemaMismatch {
                table,
                expected: expected.to_vec(),
                actual,
            });
        }
    }
    Ok(())
}
