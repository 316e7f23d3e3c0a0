//! API error type
//!
//! Every error body is `{"error": "<message>"}`. Store and transport detail
//! stays in the server log; clients only see the generic message.

use crate::collaborator::CollaboratorError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const SUBMISSION_NOT_FOUND: &str = "Submission not found";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Record store unavailable (500)
    #[error("{message}: {source}")]
    Store {
        message: &'static str,
        #[source]
        source: fuze_common::Error,
    },

    /// Collaborator call failed; upstream statuses are relayed
    #[error("{message}: {source}")]
    Collaborator {
        message: &'static str,
        #[source]
        source: CollaboratorError,
    },
}

impl ApiError {
    pub fn submission_not_found() -> Self {
        ApiError::NotFound(SUBMISSION_NOT_FOUND.to_string())
    }

    /// `map_err` adapter for store failures
    pub fn store(message: &'static str) -> impl FnOnce(fuze_common::Error) -> Self {
        move |source| ApiError::Store { message, source }
    }

    /// `map_err` adapter for collaborator failures
    pub fn collaborator(message: &'static str) -> impl FnOnce(CollaboratorError) -> Self {
        move |source| ApiError::Collaborator { message, source }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, &msg),
            ApiError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, &msg),
            ApiError::Store { message, source } => {
                error!("{}: {}", message, source);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            ApiError::Collaborator { message, source } => match source {
                CollaboratorError::Upstream { status, body } => {
                    let status =
                        StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
                }
                CollaboratorError::NotConfigured => error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &CollaboratorError::NotConfigured.to_string(),
                ),
                other => {
                    error!("{}: {}", message, other);
                    error_body(StatusCode::INTERNAL_SERVER_ERROR, message)
                }
            },
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
