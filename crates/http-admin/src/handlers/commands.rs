//! `/api/v1/commands` (§6, `slApi.py`'s `commands` resource).
//!
//! Mirrors `config-loader::sync::sync_commands`'s append onto
//! `commandStream`: the command processor's drain loop picks it up from
//! there, so this handler's only job is validation plus the append.

use crate::errors::AdminError;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use common::domain::CommandEnvelope;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Serialize)]
pub struct CreateResponse {
    message: String,
    data: String,
}

#[instrument(skip_all, name = "http_admin.commands.create", fields(command = %body.command, server = %body.server))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommandEnvelope>,
) -> Result<(StatusCode, Json<CreateResponse>), AdminError> {
    body.validate()?;

    let payload = serde_json::to_string(&body).map_err(|err| AdminError::MalformedBody(err.to_string()))?;
    let entry_id = state.broker.stream_append("commandStream", &payload).await?;

    info!(target: "http_admin.commands", command = %body.command, server = %body.server, "queued command");
    Ok((
        StatusCode::CREATED,
        Json(CreateResponse {
            message: "queued command".to_string(),
            data: entry_id,
        }),
    ))
}
