use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::transform::TransformError;

pub type ApiObject<T> = (StatusCode, Json<T>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiObject<Value> {
    (status, Json(json!({ "error": message.into() })))
}

/// Maps a transform failure onto the wire: configuration and transport
/// problems are server-side (500), collaborator failures pass their status
/// through, local pipeline failures are unprocessable input.
pub fn transform_error_response(error: &TransformError) -> ApiObject<Value> {
    let status = match error {
        TransformError::Configuration(_) | TransformError::Transport(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        TransformError::RemoteService { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        TransformError::FetchProxy { status, .. } => status
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        TransformError::Decode(_) | TransformError::Encode(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, error.to_string())
}

pub fn internal_error(message: impl Into<String>) -> ApiObject<Value> {
    let detail = message.into();
    error!(detail = %detail, "internal api error");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub fn into_json(payload: impl Serialize) -> Json<Value> {
    Json(serde_json::to_value(payload).expect("api payload should serialize"))
}
