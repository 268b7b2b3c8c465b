//! `/api/v1/meetings/<id>/status` and `/api/v1/meetings/<id>/status/<field>`
//! (§6, `slApi.py`'s `meetingStatus`/`meetingProcessStatus` resources).
//!
//! `<field>` is treated as an already underscore-joined path segment and
//! passed through as a single-element slice: [`StatusLedger::field_name`]
//! on a one-element slice is the identity of that element, so this
//! reproduces the original's already-joined field names without needing to
//! split on underscores here.

use crate::errors::AdminError;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use broker::ledger::{EntityKind, StatusRecord};
use common::time::Clock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

#[derive(Deserialize)]
pub struct SetStatusBody {
    status_code: String,
    #[serde(default)]
    status_message: String,
}

#[instrument(skip_all, name = "http_admin.status.get_all", fields(id = %id))]
pub async fn get_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HashMap<String, Vec<StatusRecord>>>, AdminError> {
    let all = state.ledger.history_all(EntityKind::Meeting, &id).await?;
    if all.is_empty() {
        return Err(AdminError::NotFound(format!("meeting {id} status")));
    }
    Ok(Json(all))
}

#[instrument(skip_all, name = "http_admin.status.delete_all", fields(id = %id))]
pub async fn delete_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdminError> {
    state.ledger.delete(EntityKind::Meeting, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, name = "http_admin.status.get_field", fields(id = %id, field = %field))]
pub async fn get_field(
    State(state): State<Arc<AppState>>,
    Path((id, field)): Path<(String, String)>,
) -> Result<Json<Vec<StatusRecord>>, AdminError> {
    let history = state.ledger.history(EntityKind::Meeting, &id, &[field.as_str()]).await?;
    if history.is_empty() {
        return Err(AdminError::NotFound(format!("meeting {id} status field {field}")));
    }
    Ok(Json(history))
}

#[instrument(skip_all, name = "http_admin.status.put_field", fields(id = %id, field = %field))]
pub async fn put_field(
    State(state): State<Arc<AppState>>,
    Path((id, field)): Path<(String, String)>,
    Json(body): Json<SetStatusBody>,
) -> Result<StatusCode, AdminError> {
    state
        .ledger
        .set_status(
            EntityKind::Meeting,
            &id,
            &[field.as_str()],
            &body.status_code,
            &body.status_message,
            &Clock::system(),
        )
        .await?;
    Ok(StatusCode::OK)
}

#[instrument(skip_all, name = "http_admin.status.delete_field", fields(id = %id, field = %field))]
pub async fn delete_field(
    State(state): State<Arc<AppState>>,
    Path((id, field)): Path<(String, String)>,
) -> Result<StatusCode, AdminError> {
    state.ledger.delete_field(EntityKind::Meeting, &id, &[field.as_str()]).await?;
    Ok(StatusCode::NO_CONTENT)
}
