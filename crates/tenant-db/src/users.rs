//! Users repository (§4.2: `createUser`, `deleteUser`, owner lookup).

use crate::error::{Result, TenantDbError};
use crate::rooms::RoomsRepository;
use crate::support::{get_table_field, random_secret, update_field, Table};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

/// Parameters accepted by [`UsersRepository::create_user`]. Grouped into a
/// struct (rather than seven positional arguments) since every field but
/// `email` is optional and independently defaulted.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// Required owner email; rejected if a user with this email exists.
    pub email: String,
    /// Display name; defaults to the local-part of `email` when absent.
    pub full_name: Option<String>,
    /// Tenant uid; defaults to `"sl-" + 11 random alphanumerics`.
    pub uid: Option<String>,
    /// Social login id, stored as-is.
    pub social_uid: Option<String>,
    /// Stored directly in `password_digest`; defaults to 11 random
    /// alphanumerics when absent (preserved as observed — the original
    /// stores the generated secret directly rather than hashing it).
    pub password: Option<String>,
    /// Greenlight role id; defaults to `1`.
    pub role_id: i32,
    /// Auth provider; defaults to `"ldap"`.
    pub provider: String,
}

/// Users repository: stateless, associated functions over a shared pool.
pub struct UsersRepository;

impl UsersRepository {
    /// Resolve a user's numeric id by email. Returns `None` if no such user
    /// exists (mirrors `get_id_by_email`'s `0`-on-miss contract, made idiomatic).
    #[instrument(skip_all, fields(email = email))]
    pub async fn find_id_by_email(pool: &PgPool, email: &str) -> Result<Option<i64>> {
        let id = get_table_field(pool, Table::Users, "email", email, "id").await?;
        Ok(id.and_then(|s| s.parse().ok()))
    }

    /// Resolve the home-room id assigned to the owner at `email`, if any.
    #[instrument(skip_all, fields(email = email))]
    pub async fn find_room_id_by_email(pool: &PgPool, email: &str) -> Result<Option<i64>> {
        let room_id = get_table_field(pool, Table::Users, "email", email, "room_id").await?;
        Ok(room_id.and_then(|s| s.parse().ok()))
    }

    /// Create a user, generating `uid`/`password`/`full_name` defaults as
    /// needed. Returns `None` if the email already exists (§4.2: "must
    /// reject existing email"), matching the original's `0`-return.
    #[instrument(skip_all, fields(email = %new_user.email))]
    pub async fn create_user(pool: &PgPool, new_user: NewUser) -> Result<Option<i64>> {
        if get_table_field(pool, Table::Users, "email", &new_user.email, "id")
            .await?
            .is_some()
        {
            warn!(
                target: "tenant_db.users",
                email = %new_user.email,
                "email already exists, refusing to create user"
            );
            return Ok(None);
        }

        let password = new_user
            .password
            .unwrap_or_else(|| random_secret(11));
        let full_name = new_user.full_name.unwrap_or_else(|| {
            new_user
                .email
                .split_once('@')
                .map_or_else(|| new_user.email.clone(), |(local, _)| local.to_string())
        });
        let uid = new_user
            .uid
            .unwrap_or_else(|| format!("sl-{}", random_secret(11)));
        let now = Utc::now();

        let row: (i64,) = sqlx::query_as(
            "INSERT INTO users (
                room_id, provider, uid, name, username, email, social_uid, image,
                password_digest, accepted_terms, created_at, updated_at,
                email_verified, language, reset_digest, reset_sent_at,
                activation_digest, activated_at, deleted, role_id
             ) VALUES (
                NULL, $1, $2, $3, $4, $5, $6, NULL,
                $7, true, $8, $8,
                true, NULL, NULL, NULL,
                NULL, $8, false, $9
             ) RETURNING id",
        )
        .bind(&new_user.provider)
        .bind(&uid)
        .bind(&full_name)
        .bind(&uid)
        .bind(&new_user.email)
        .bind(&new_user.social_uid)
        .bind(&password)
        .bind(now)
        .bind(new_user.role_id)
        .fetch_one(pool)
        .await
        .map_err(|e| TenantDbError::Query(e.to_string()))?;

        debug!(target: "tenant_db.users", email = %new_user.email, id = row.0, "created user");
        Ok(Some(row.0))
    }

    /// Delete a user by `field` (usually `"email"`), cascading to
    /// `users_roles` and to every room the user owns.
    ///
    /// Preserves the original's exact ordering: the user row is removed
    /// first, and the cascade to `users_roles`/owned rooms only runs if that
    /// delete actually removed a row.
    #[instrument(skip_all, fields(field = field, value = value))]
    pub async fn delete_user(pool: &PgPool, field: &str, value: &str) -> Result<u64> {
        let Some(user_id) = get_table_field(pool, Table::Users, field, value, "id").await? else {
            warn!(target: "tenant_db.users", field, value, "no such user");
            return Ok(0);
        };

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(&user_id)
            .execute(pool)
            .await
            .map_err(|e| TenantDbError::Query(e.to_string()))?
            .rows_affected();

        if deleted == 0 {
            return Ok(0);
        }
        debug!(target: "tenant_db.users", user_id = %user_id, "deleted user");

        let roles_deleted = sqlx::query("DELETE FROM users_roles WHERE user_id = $1")
            .bind(&user_id)
            .execute(pool)
            .await
            .map_err(|e| TenantDbError::Query(e.to_string()))?
            .rows_affected();
        debug!(
            target: "tenant_db.users",
            user_id = %user_id,
            roles_deleted,
            "removed user role entries"
        );

        let owned_rooms: Vec<(i64,)> = sqlx::query_as("SELECT id FROM rooms WHERE user_id = $1")
            .bind(&user_id)
            .fetch_all(pool)
            .await
            .map_err(|e| TenantDbError::Query(e.to_string()))?;

        for (room_id,) in owned_rooms {
            RoomsRepository::delete_room(pool, "id", &room_id.to_string()).await?;
        }

        Ok(deleted)
    }

    /// Assign a Greenlight role to a user by email (`user_role` helper).
    #[instrument(skip_all, fields(email = email, role_id = role_id))]
    pub async fn set_role(pool: &PgPool, email: &str, role_id: i32) -> Result<u64> {
        update_field(pool, Table::Users, "email", email, "role_id", Some(&role_id.to_string())).await
    }

    /// Assign `room_id` as a user's home room (`useHomeRoom`'s `update_field`
    /// call, run once a home room has been created for an owner who didn't
    /// have one yet).
    #[instrument(skip_all, fields(user_id = user_id, room_id = room_id))]
    pub async fn set_home_room(pool: &PgPool, user_id: i64, room_id: i64) -> Result<u64> {
        update_field(
            pool,
            Table::Users,
            "id",
            &user_id.to_string(),
            "room_id",
            Some(&room_id.to_string()),
        )
        .await
    }
}
