//! Authentication Service
//!
//! Registration, login, token refresh and password change, orchestrating
//! the credential hasher, token issuer and storage collaborator.

use crate::config::AuthConfig;
use crate::database::{Database, StorageError};
use crate::error::AuthError;
use crate::hasher::CredentialHasher;
use crate::models::*;
use crate::token::TokenIssuer;

/// Authentication service
pub struct AuthService {
    db: Database,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(db: Database, config: &AuthConfig) -> Self {
        Self {
            db,
            hasher: CredentialHasher::new(config),
            tokens: TokenIssuer::new(config),
        }
    }

    /// Get reference to the token issuer
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    // ============================================
    // User Registration
    // ============================================

    /// Register a new identity.
    ///
    /// The credential and the profile record are written in one unit of
    /// work; either both exist afterwards or neither does.
    pub async fn register(&self, req: RegisterRequest) -> Result<(), AuthError> {
        if req.password != req.password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        if self.find_credential(&req.email).await?.is_some() {
            return Err(AuthError::IdentityTaken);
        }

        let salt = self.hasher.generate_salt();
        let digest = self
            .hasher
            .hash_blocking(req.password, salt.to_vec())
            .await?;

        let mut uow = self.db.begin().await?;

        uow.execute(
            r#"
            INSERT INTO auth_credentials (email, password_hash, password_salt)
            VALUES ($1, $2, $3)
            "#,
            &[
                req.email.as_str().into(),
                digest.to_vec().into(),
                salt.to_vec().into(),
            ],
        )
        .await
        .map_err(taken_or_storage)?;

        let user: Option<(i64,)> = uow
            .query_single(
                r#"
                INSERT INTO users (first_name, last_name, email, gender, active)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING user_id
                "#,
                &[
                    req.profile.first_name.into(),
                    req.profile.last_name.into(),
                    req.email.as_str().into(),
                    req.profile.gender.into(),
                    1i64.into(),
                ],
            )
            .await
            .map_err(taken_or_storage)?;

        let (user_id,) = user.ok_or_else(|| {
            AuthError::Storage("profile insert returned no id".to_string())
        })?;

        uow.commit().await?;

        tracing::info!(user_id, email = %req.email, "User registered");

        Ok(())
    }

    // ============================================
    // Login
    // ============================================

    /// Verify a password and issue a token
    pub async fn login(&self, req: LoginRequest) -> Result<String, AuthError> {
        let credential = self
            .find_credential(&req.email)
            .await?
            .ok_or(AuthError::UnknownIdentity)?;

        let matches = self
            .hasher
            .verify_blocking(req.password, credential.password_salt, credential.password_hash)
            .await?;

        if !matches {
            tracing::debug!("Login rejected: incorrect password");
            return Err(AuthError::BadCredential);
        }

        let user: Option<(i64,)> = self
            .db
            .query_single(
                "SELECT user_id FROM users WHERE email = $1",
                &[req.email.as_str().into()],
            )
            .await?;

        let (user_id,) = user.ok_or_else(|| {
            tracing::warn!("Credential exists without a profile record");
            AuthError::UnknownIdentity
        })?;

        self.tokens.issue(user_id)
    }

    // ============================================
    // Token Refresh
    // ============================================

    /// Issue a new token for an already validated subject.
    ///
    /// Fails when the identity record was deleted or deactivated after the
    /// presented token was issued.
    pub async fn refresh(&self, subject: Subject) -> Result<String, AuthError> {
        let user: Option<(i64,)> = self
            .db
            .query_single(
                "SELECT user_id FROM users WHERE user_id = $1 AND active = $2",
                &[subject.user_id().into(), 1i64.into()],
            )
            .await?;

        let (user_id,) = user.ok_or_else(|| {
            tracing::debug!(user_id = subject.user_id(), "Refresh for missing or inactive user");
            AuthError::UnknownIdentity
        })?;

        self.tokens.issue(user_id)
    }

    // ============================================
    // Password Management
    // ============================================

    /// Change password for an authenticated subject.
    ///
    /// Replaces both digest and salt.
    pub async fn change_password(
        &self,
        subject: Subject,
        req: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let credential: Credential = self
            .db
            .query_single(
                r#"
                SELECT c.email, c.password_hash, c.password_salt
                FROM auth_credentials c
                JOIN users u ON u.email = c.email
                WHERE u.user_id = $1
                "#,
                &[subject.user_id().into()],
            )
            .await?
            .ok_or(AuthError::UnknownIdentity)?;

        let matches = self
            .hasher
            .verify_blocking(
                req.current_password,
                credential.password_salt,
                credential.password_hash,
            )
            .await?;

        if !matches {
            return Err(AuthError::BadCredential);
        }

        if req.new_password != req.new_password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let salt = self.hasher.generate_salt();
        let digest = self
            .hasher
            .hash_blocking(req.new_password, salt.to_vec())
            .await?;

        let updated = self
            .db
            .execute(
                r#"
                UPDATE auth_credentials
                SET password_hash = $1, password_salt = $2
                WHERE email = $3
                "#,
                &[
                    digest.to_vec().into(),
                    salt.to_vec().into(),
                    credential.email.into(),
                ],
            )
            .await?;

        if updated == 0 {
            return Err(AuthError::UnknownIdentity);
        }

        tracing::info!(user_id = subject.user_id(), "Password changed");

        Ok(())
    }

    // ============================================
    // Helpers
    // ============================================

    async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AuthError> {
        let credential = self
            .db
            .query_single(
                "SELECT email, password_hash, password_salt FROM auth_credentials WHERE email = $1",
                &[email.into()],
            )
            .await?;
        Ok(credential)
    }
}

/// A concurrent registration that won the race surfaces as a unique
/// violation on insert.
fn taken_or_storage(err: StorageError) -> AuthError {
    if err.is_unique_violation() {
        AuthError::IdentityTaken
    } else {
        err.into()
    }
}
