//! `/api/v1/servers` and `/api/v1/servers/<id>` (§6, `slApi.py`'s `servers`/`server` resources).
//!
//! Server records are kept as the operator-submitted JSON verbatim rather
//! than reconstructed from [`ServerRecord`] before storage: that type isn't
//! `Serialize` (`secrecy::SecretString` has no `Serialize` impl, by design),
//! matching the broker's own storage contract (see `common::domain`'s module
//! doc comment).

use crate::errors::AdminError;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use broker::ledger::EntityKind;
use common::domain::ServerRecord;
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

fn parse_and_validate(mut body: Value, id: &str) -> Result<(ServerRecord, Value), AdminError> {
    let Some(object) = body.as_object_mut() else {
        return Err(AdminError::MalformedBody("request body must be a JSON object".to_string()));
    };
    object.insert("id".to_string(), Value::String(id.to_string()));

    let record: ServerRecord = serde_json::from_value(body.clone())
        .map_err(|err| AdminError::MalformedBody(err.to_string()))?;
    record.validate()?;

    Ok((record, body))
}

#[instrument(skip_all, name = "http_admin.servers.list")]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<ListResponse>, AdminError> {
    let ids = state.broker.set_members("servers").await?;
    Ok(Json(ListResponse {
        message: "ok".to_string(),
        data: ids,
    }))
}

#[instrument(skip_all, name = "http_admin.servers.create")]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<IdResponse>), AdminError> {
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AdminError::MalformedBody("missing required field `id`".to_string()))?
        .to_string();

    let (record, raw) = parse_and_validate(body, &id)?;
    let payload = serde_json::to_string(&raw).map_err(|err| AdminError::MalformedBody(err.to_string()))?;

    state.broker.set_add("servers", &record.id).await?;
    state
        .broker
        .put_record("server", &record.id, &payload, Some(31_536_000))
        .await?;

    info!(target: "http_admin.servers", id = %record.id, "added server");
    Ok((
        StatusCode::CREATED,
        Json(IdResponse {
            message: "added server".to_string(),
            data: record.id,
        }),
    ))
}

#[instrument(skip_all, name = "http_admin.servers.get", fields(id = %id))]
pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>, AdminError> {
    let raw = state
        .broker
        .get_record("server", &id)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("server {id}")))?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| AdminError::MalformedBody(err.to_string()))?;
    Ok(Json(value))
}

#[instrument(skip_all, name = "http_admin.servers.update", fields(id = %id))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<IdResponse>), AdminError> {
    let (record, raw) = parse_and_validate(body, &id)?;
    let payload = serde_json::to_string(&raw).map_err(|err| AdminError::MalformedBody(err.to_string()))?;

    state.broker.set_add("servers", &record.id).await?;
    state
        .broker
        .put_record("server", &record.id, &payload, Some(31_536_000))
        .await?;

    info!(target: "http_admin.servers", id = %record.id, "updated server");
    Ok((
        StatusCode::OK,
        Json(IdResponse {
            message: "updated server".to_string(),
            data: record.id,
        }),
    ))
}

/// Delete a server by `id` (§9 "`delete server` ... uses `id` instead" —
/// the original read `server['serverName']`, a field absent from the schema,
/// and addressed `servers:{id}:status`/`servers:{id}` rather than the
/// singular `server:{id}:status`/`server:{id}` every other handler uses;
/// both are fixed here).
#[instrument(skip_all, name = "http_admin.servers.delete", fields(id = %id))]
pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, AdminError> {
    state.broker.delete_record("server", &id).await?;
    state.ledger.delete(EntityKind::Server, &id).await?;
    state.broker.set_remove("servers", &id).await?;
    info!(target: "http_admin.servers", id = %id, "removed server");
    Ok(StatusCode::NO_CONTENT)
}
