//! Authentication Error Types
//!
//! Centralized error handling for all authentication operations. Every
//! variant is recoverable at the request boundary and maps to one
//! client-visible status.

use crate::database::StorageError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("User with this email already exists")]
    IdentityTaken,

    #[error("Invalid email")]
    UnknownIdentity,

    #[error("Incorrect password")]
    BadCredential,

    #[error("Invalid or expired token")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored state contradicts a fixed algorithm invariant (e.g. digest length).
    /// Indicates corruption, never a failed login.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// HTTP status and stable error code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::PasswordMismatch => (StatusCode::BAD_REQUEST, "password_mismatch"),
            AuthError::IdentityTaken => (StatusCode::CONFLICT, "identity_taken"),
            AuthError::UnknownIdentity => (StatusCode::UNAUTHORIZED, "invalid_email"),
            AuthError::BadCredential => (StatusCode::UNAUTHORIZED, "incorrect_password"),
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            AuthError::Integrity(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AuthError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();

        let message = if status.is_server_error() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        tracing::error!("Storage error: {:?}", err);
        AuthError::Storage(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err);
        AuthError::Unauthorized
    }
}
