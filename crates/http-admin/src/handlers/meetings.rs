//! `/api/v1/meetings` and `/api/v1/meetings/<id>` (§6, `slApi.py`'s `meetings`/`meeting` resources).
//!
//! Unlike [`crate::handlers::servers`], [`MeetingRecord`] is `Serialize`, so
//! a posted meeting is reconstructed from its typed form before storage.
//! That buys the normalisation `GET` round-trip property (§8): the owner's
//! email is lower-cased/trimmed exactly as every other component that reads
//! an owner record does.

use crate::errors::AdminError;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use broker::ledger::EntityKind;
use common::domain::MeetingRecord;
use common::time::Clock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Serialize)]
pub struct ListResponse {
    message: String,
    data: Vec<String>,
}

#[derive(Serialize)]
pub struct IdResponse {
    message: String,
    data: String,
}

/// Parse, normalize, and validate a posted meeting record.
///
/// Uses [`MeetingRecord::validate_for_creation`] rather than
/// [`MeetingRecord::validate`] — a record accepted wholesale through this
/// surface must have a `startDate` that is still in the future (§8
/// acceptance test #5), unlike the orchestration engine's every-tick gate,
/// which must keep progressing a meeting after its `startDate` has passed.
fn parse_and_validate(body: Value, id: &str) -> Result<MeetingRecord, AdminError> {
    let mut meeting: MeetingRecord =
        serde_json::from_value(body).map_err(|err| AdminError::MalformedBody(err.to_string()))?;
    meeting.id = id.to_string();
    meeting.validate_for_creation(&Clock::system())?;
    if let Some(owner) = meeting.owner.as_mut() {
        owner.validate()?;
    }
    Ok(meeting)
}

#[instrument(skip_all, name = "http_admin.meetings.list")]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<ListResponse>, AdminError> {
    let ids = state.broker.set_members("meetings").await?;
    Ok(Json(ListResponse {
        message: "ok".to_string(),
        data: ids,
    }))
}

#[instrument(skip_all, name = "http_admin.meetings.create")]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<IdResponse>), AdminError> {
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AdminError::MalformedBody("missing required field `id`".to_string()))?
        .to_string();

    let meeting = parse_and_validate(body, &id)?;
    let payload = serde_json::to_string(&meeting).map_err(|err| AdminError::MalformedBody(err.to_string()))?;

    state.broker.set_add("meetings", &meeting.id).await?;
    state
        .broker
        .put_record("meeting", &meeting.id, &payload, Some(31_536_000))
        .await?;

    info!(target: "http_admin.meetings", id = %meeting.id, "added meeting");
    Ok((
        StatusCode::CREATED,
        Json(IdResponse {
            message: "added meeting".to_string(),
            data: meeting.id,
        }),
    ))
}

#[instrument(skip_all, name = "http_admin.meetings.get", fields(id = %id))]
pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>, AdminError> {
    let raw = state
        .broker
        .get_record("meeting", &id)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("meeting {id}")))?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| AdminError::MalformedBody(err.to_string()))?;
    Ok(Json(value))
}

#[instrument(skip_all, name = "http_admin.meetings.update", fields(id = %id))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<IdResponse>), AdminError> {
    let meeting = parse_and_validate(body, &id)?;
    let payload = serde_json::to_string(&meeting).map_err(|err| AdminError::MalformedBody(err.to_string()))?;

    state.broker.set_add("meetings", &meeting.id).await?;
    state
        .broker
        .put_record("meeting", &meeting.id, &payload, Some(31_536_000))
        .await?;

    info!(target: "http_admin.meetings", id = %meeting.id, "updated meeting");
    Ok((
        StatusCode::OK,
        Json(IdResponse {
            message: "updated meeting".to_string(),
            data: meeting.id,
        }),
    ))
}

#[instrument(skip_all, name = "http_admin.meetings.delete", fields(id = %id))]
pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, AdminError> {
    state.broker.delete_record("meeting", &id).await?;
    state.ledger.delete(EntityKind::Meeting, &id).await?;
    state.broker.set_remove("meetings", &id).await?;
    info!(target: "http_admin.meetings", id = %id, "removed meeting");
    Ok(StatusCode::NO_CONTENT)
}
