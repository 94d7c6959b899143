//! Maps domain errors onto HTTP responses.
//!
//! Handlers return `Result<_, AppError>`; the `?` operator lifts every
//! [`CoreError`] through [`From`], and `IntoResponse` renders a JSON body
//! with a stable machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stagepass_core::{ConflictKind, CoreError};
use std::fmt;

/// Error returned by every handler in this crate.
///
/// Carries the HTTP status, a stable code for clients to branch on, and a
/// user-facing message. Server-side detail rides along separately; it is
/// logged, never serialized.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    source: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// A 400 for requests that are wrong in shape rather than content.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Attach the underlying error for the server-side log.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// What the client sees, regardless of which error produced it.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                source = ?self.source,
                "{}",
                self.message
            );
        }

        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "an internal error occurred",
        )
        .with_source(err)
    }
}

/// The full status and code table for the domain.
///
/// Conflicts carry a code per [`ConflictKind`] so clients can tell a lost
/// seat race from a double cancel without parsing messages.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
            }
            CoreError::NotFound { resource, id } => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} with id {id} not found"),
            ),
            CoreError::Conflict(kind) => {
                let code = match kind {
                    ConflictKind::DuplicateReservation => "DUPLICATE_RESERVATION",
                    ConflictKind::InventoryExceeded { .. } => "INVENTORY_EXCEEDED",
                    ConflictKind::AlreadyCancelled => "ALREADY_CANCELLED",
                    ConflictKind::TicketAlreadyUsed => "TICKET_ALREADY_USED",
                };
                Self::new(StatusCode::CONFLICT, code, kind.to_string())
            }
            CoreError::Unauthorized(message) => {
                Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
            }
            CoreError::EventMismatch { expected, actual } => Self::new(
                StatusCode::CONFLICT,
                "EVENT_MISMATCH",
                format!("ticket belongs to event {actual}, expected {expected}"),
            ),
            CoreError::MalformedProof(message) => Self::new(
                StatusCode::BAD_REQUEST,
                "MALFORMED_PROOF",
                format!("malformed proof of purchase: {message}"),
            ),
            CoreError::EventClosed(message) => Self::new(
                StatusCode::CONFLICT,
                "EVENT_CLOSED",
                format!("event closed: {message}"),
            ),
            CoreError::ExternalService { service, message } => Self::new(
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                format!("{service} failed"),
            )
            .with_source(anyhow::anyhow!("{service} failed: {message}")),
            CoreError::Storage(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "an internal error occurred",
            )
            .with_source(anyhow::anyhow!("storage error: {message}")),
        }
    }
}
