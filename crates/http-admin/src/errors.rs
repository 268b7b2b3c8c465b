//! HTTP admin's error type.
//!
//! Mirrors `global-controller::errors::GcError`'s shape (one enum, one
//! `IntoResponse` impl, a uniform `{error:{code,message}}` body) with one
//! deliberate difference: schema-validation failures are echoed back to the
//! caller rather than generalized, matching the original's
//! `abort(400, str(errors))` (§6, §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::validation::ValidationError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    /// The request body failed schema validation; `reason` is echoed back.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The request body was not valid JSON, or not an object where one was
    /// required.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// The referenced server/meeting/field does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A broker operation failed.
    #[error("broker error: {0}")]
    Broker(#[from] broker::BrokerError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AdminError::Validation(err) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string()),
            AdminError::MalformedBody(reason) => (StatusCode::BAD_REQUEST, "MALFORMED_BODY", reason.clone()),
            AdminError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            AdminError::Broker(err) => {
                tracing::error!(target: "http_admin.errors", %err, "broker operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "BROKER_ERROR",
                    "an internal broker error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_bad_request() {
        let err = AdminError::Validation(ValidationError::missing("meetingName"));
        assert_eq!(format!("{err}"), "validation failed: missing required field `meetingName`");
    }

    #[test]
    fn not_found_carries_its_message() {
        let err = AdminError::NotFound("meeting m1".to_string());
        assert_eq!(format!("{err}"), "not found: meeting m1");
    }
}
