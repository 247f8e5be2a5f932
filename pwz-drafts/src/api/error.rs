//! HTTP error mapping
//!
//! Every engine error becomes a JSON body
//! `{ "error": kind, "message": text, "section": name|null, "retryable": bool }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::DraftError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Engine error, mapped by kind
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// Malformed request outside the engine's taxonomy (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Draft(err) => match err {
                DraftError::NotFound(_) => StatusCode::NOT_FOUND,
                DraftError::InvalidSection { .. } => StatusCode::BAD_REQUEST,
                DraftError::VersionConflict { .. }
                | DraftError::ConflictExceeded { .. }
                | DraftError::AlreadyPublished(_) => StatusCode::CONFLICT,
                DraftError::NotReady { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DraftError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DraftError::Corrupt { .. } | DraftError::Database(_) | DraftError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::BadRequest(msg) => json!({
                "error": "BadRequest",
                "message": msg,
                "section": null,
                "retryable": false,
            }),
            ApiError::Draft(err) => {
                if status.is_server_error() {
                    tracing::error!(kind = err.kind(), error = %err, "Request failed");
                }
                let mut body = json!({
                    "error": err.kind(),
                    "message": err.to_string(),
                    "section": err.section(),
                    "retryable": err.is_retryable(),
                });
                if let DraftError::NotReady { missing } = err {
                    body["missing"] = json!(missing);
                }
                body
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DraftError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (DraftError::invalid_section("rooms", "bad"), StatusCode::BAD_REQUEST),
            (
                DraftError::VersionConflict { expected: 0, actual: Some(1) },
                StatusCode::CONFLICT,
            ),
            (DraftError::ConflictExceeded { attempts: 3 }, StatusCode::CONFLICT),
            (DraftError::AlreadyPublished(Uuid::nil()), StatusCode::CONFLICT),
            (DraftError::NotReady { missing: vec![] }, StatusCode::UNPROCESSABLE_ENTITY),
            (
                DraftError::StorageUnavailable("locked".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (DraftError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    }
}
