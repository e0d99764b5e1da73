//! Authentication Models
//!
//! Data structures for authentication requests, responses, storage rows and
//! token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};
use validator::Validate;

// ============================================
// Identity
// ============================================

/// An authenticated identity.
///
/// Only produced by token validation, so holding one proves the id came
/// from a verified token rather than from client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Subject(i64);

impl Subject {
    pub(crate) fn new(user_id: i64) -> Self {
        Self(user_id)
    }

    /// Identity record id bound into the token
    pub fn user_id(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================
// Storage Rows
// ============================================

/// Stored credential for one identity
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    pub email: String,
    pub password_hash: Vec<u8>,
    pub password_salt: Vec<u8>,
}

/// Identity record (profile) owned by the storage collaborator
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub active: bool,
}

impl<'r> FromRow<'r, AnyRow> for UserProfile {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            gender: row.try_get("gender")?,
            // stored as 0/1 so the same column decodes on every backend
            active: row.try_get::<i64, _>("active")? != 0,
        })
    }
}

/// A post owned by one identity record
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub post_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl<'r> FromRow<'r, AnyRow> for Post {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            post_id: row.try_get("post_id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("post_title")?,
            content: row.try_get("post_content")?,
            created: timestamp(row, "post_created")?,
            updated: timestamp(row, "post_updated")?,
        })
    }
}

fn timestamp(row: &AnyRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let secs: i64 = row.try_get(column)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("timestamp out of range: {}", secs).into(),
    })
}

// ============================================
// Request DTOs
// ============================================

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(flatten)]
    pub profile: ProfileAttributes,
}

/// Display attributes stored on the identity record
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileAttributes {
    #[validate(length(max = 50, message = "First name must be at most 50 characters"))]
    pub first_name: String,

    #[validate(length(max = 50, message = "Last name must be at most 50 characters"))]
    pub last_name: String,

    #[validate(length(max = 50, message = "Gender must be at most 50 characters"))]
    pub gender: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Change password request (for authenticated users)
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// New or replacement post content
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostDraft {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,
}

// ============================================
// Response DTOs
// ============================================

/// Token returned by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

impl TokenResponse {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

// ============================================
// JWT Claims
// ============================================

/// JWT claims carried by every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identity record id, string-encoded
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Not before timestamp
    pub nbf: i64,
    /// Expiration timestamp
    pub exp: i64,
}
