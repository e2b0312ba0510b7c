use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::state::room_id::RoomIdError;

/// Errors that can occur in service layer operations.
///
/// Room transitions themselves never fail; these cover lookups, input checks and
/// connection establishment.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed room code, off-deck vote or invalid display name.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No room is registered under the requested id.
    #[error("not found: {0}")]
    NotFound(String),
    /// No free room id could be allocated.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Action requires a completed join.
    #[error("not joined: {0}")]
    NotJoined(String),
    /// The room was torn down while the request was in flight.
    #[error("room closed")]
    RoomClosed,
    /// The client did not complete a step in time.
    #[error("operation timed out")]
    Timeout,
}

impl ServiceError {
    /// Stable machine-readable code sent to WebSocket clients.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::NotFound(_) => "room_not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::NotJoined(_) => "not_joined",
            ServiceError::RoomClosed => "room_closed",
            ServiceError::Timeout => "timeout",
        }
    }
}

impl From<RoomIdError> for ServiceError {
    fn from(err: RoomIdError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

/// HTTP-facing errors rendered as `{ "message": ... }` with a matching status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected input (400).
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unknown room (404).
    #[error("not found: {0}")]
    NotFound(String),
    /// Allocation conflict (409).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Temporarily unable to serve (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::NotJoined(message) => AppError::BadRequest(message),
            ServiceError::RoomClosed => AppError::NotFound("room closed".into()),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
