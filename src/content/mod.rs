//! Owner-scoped content operations
//!
//! Posts and profiles. Every mutation is scoped by the [`Subject`] the
//! guard resolved, bound as a query parameter.
//!
//! [`Subject`]: crate::models::Subject

pub mod posts;
pub mod users;

pub use posts::PostStore;
pub use users::{ProfileUpdate, UserDirectory};

use crate::database::StorageError;
use crate::error::AuthError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ServiceError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "permission_denied",
                "You don't have permission to perform this action".to_string(),
            ),
            ServiceError::Storage(err) => {
                tracing::error!("Storage error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "A storage error occurred".to_string(),
                )
            }
            ServiceError::Auth(err) => return err.into_response(),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error,
                "message": message
            })),
        )
            .into_response()
    }
}
