//! Error types for the noteflow server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use docstore_client::DocStoreError;
use noteflow_core::NoteFlowError;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Missing or invalid sessionId header")]
    MissingSession,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Flow(#[from] NoteFlowError),

    #[error(transparent)]
    Store(#[from] DocStoreError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServerError::MissingSession => (
                StatusCode::UNAUTHORIZED,
                "MISSING_SESSION",
                self.to_string(),
            ),
            ServerError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            ServerError::Flow(NoteFlowError::ContentNotFound(_)) => {
                (StatusCode::NOT_FOUND, "CONTENT_NOT_FOUND", self.to_string())
            }
            ServerError::Flow(NoteFlowError::LockConflict) => {
                (StatusCode::CONFLICT, "LOCK_CONFLICT", self.to_string())
            }
            ServerError::Flow(NoteFlowError::CheckoutRejected { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CHECKOUT_REJECTED",
                self.to_string(),
            ),
            ServerError::Flow(NoteFlowError::CheckinRejected { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CHECKIN_REJECTED",
                self.to_string(),
            ),
            ServerError::Flow(NoteFlowError::AttributeMissing(_))
            | ServerError::Flow(NoteFlowError::InvalidAttribute { .. }) => (
                StatusCode::NOT_FOUND,
                "WORK_ITEM_INCOMPLETE",
                self.to_string(),
            ),
            ServerError::Store(DocStoreError::AuthFailed(_)) => {
                (StatusCode::UNAUTHORIZED, "AUTH_FAILED", self.to_string())
            }
            ServerError::Flow(_) | ServerError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                self.to_string(),
            ),
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
