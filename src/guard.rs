//! Authorization Guard
//!
//! Turns a presented bearer token into a [`Subject`]. Every identity-scoped
//! operation takes the resulting subject as an explicit parameter instead
//! of trusting a client-supplied owner id.

use crate::error::AuthError;
use crate::models::Subject;
use crate::token::TokenIssuer;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

/// Validates request tokens
#[derive(Clone)]
pub struct AuthGuard {
    tokens: Arc<TokenIssuer>,
}

impl AuthGuard {
    pub fn new(tokens: TokenIssuer) -> Self {
        Self {
            tokens: Arc::new(tokens),
        }
    }

    /// Validate a raw token. Missing, malformed or expired tokens are all
    /// [`AuthError::Unauthorized`].
    pub fn authenticate(&self, token: Option<&str>) -> Result<Subject, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthorized)?;

        self.tokens.validate(token)
    }

    /// Validate the value of an `Authorization: Bearer <token>` header
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<Subject, AuthError> {
        let header = header.ok_or(AuthError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            tracing::debug!("Invalid authorization header format");
            AuthError::Unauthorized
        })?;

        self.authenticate(Some(token))
    }
}

/// Authenticated caller extracted from the `Authorization` header
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Subject);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthGuard: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Reuse a subject already resolved earlier in the request
        if let Some(subject) = parts.extensions.get::<Subject>() {
            return Ok(AuthUser(*subject));
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let subject = AuthGuard::from_ref(state).authenticate_header(header)?;
        parts.extensions.insert(subject);

        Ok(AuthUser(subject))
    }
}
