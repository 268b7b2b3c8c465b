//! Owner resolution (§5.1: "resolve or create the meeting's owner user").

use crate::error::Result;
use broker::ledger::EntityKind;
use broker::StatusLedger;
use common::domain::OwnerSpec;
use common::time::Clock;
use sqlx::PgPool;
use tenant_db::{NewUser, UsersRepository};
use tracing::{info, instrument, warn};

/// The owner account a meeting resolved to, ready to own a room.
pub struct ResolvedOwner {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
}

/// Resolve the user backing a meeting's declared owner, creating the
/// account if it doesn't exist yet.
///
/// A meeting without an `owner` block, or whose owner's email doesn't
/// validate, has its id-level status set to `404` and returns `None` —
/// the caller must skip the rest of this meeting's tick. The single
/// `dataSchema.py`-required `email` field means the two distinct original
/// failure messages ("no owner with email provided" / "no owner email
/// provided") collapse to the first case here: there is no way to supply an
/// owner block without an email and still deserialize one.
#[instrument(skip_all, fields(meeting_id = meeting_id))]
pub async fn resolve_owner(
    pool: &PgPool,
    ledger: &StatusLedger,
    clock: &Clock,
    meeting_id: &str,
    owner: Option<&OwnerSpec>,
) -> Result<Option<ResolvedOwner>> {
    let Some(owner) = owner else {
        ledger
            .set_status(
                EntityKind::Meeting,
                meeting_id,
                &["status"],
                "404",
                "no owner with email provided",
                clock,
            )
            .await?;
        return Ok(None);
    };

    let mut owner = owner.clone();
    if owner.validate().is_err() {
        warn!(target: "orchestration_engine.owner", meeting_id, "owner email failed validation");
        ledger
            .set_status(
                EntityKind::Meeting,
                meeting_id,
                &["status"],
                "404",
                "no owner email provided",
                clock,
            )
            .await?;
        return Ok(None);
    }

    let full_name = owner.full_name_or_default();

    if let Some(user_id) = UsersRepository::find_id_by_email(pool, &owner.email).await? {
        return Ok(Some(ResolvedOwner {
            user_id,
            email: owner.email,
            full_name,
        }));
    }

    let new_user = NewUser {
        email: owner.email.clone(),
        full_name: Some(full_name.clone()),
        uid: owner.uid.clone(),
        social_uid: owner.social_uid.clone(),
        password: owner.password.clone(),
        role_id: 1,
        provider: "ldap".to_string(),
    };

    match UsersRepository::create_user(pool, new_user).await? {
        Some(user_id) => {
            info!(target: "orchestration_engine.owner", meeting_id, email = %owner.email, "created owner account");
            Ok(Some(ResolvedOwner {
                user_id,
                email: owner.email,
                full_name,
            }))
        }
        None => {
            warn!(target: "orchestration_engine.owner", meeting_id, email = %owner.email, "owner not found and creation failed");
            ledger
                .set_status(
                    EntityKind::Meeting,
                    meeting_id,
                    &["status"],
                    "404",
                    "owner not found and creation failed",
                    clock,
                )
                .await?;
            Ok(None)
        }
    }
}
