//! Postgate Authentication
//!
//! Credential, token and ownership layer for the Postgate posting service:
//! - Registration with salted, keyed PBKDF2-HMAC-SHA256 password digests
//! - Login and refresh issuing HS512 bearer tokens valid for 24 hours
//! - Request guard resolving a bearer token to the calling user id
//! - Owner-scoped post and profile operations
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `PASSWORD_KEY` - Secret mixed into every password digest (required)
//! - `TOKEN_KEY` - HMAC-SHA-512 signing key (required, min 64 bytes)
//! - `DATABASE_URL` - PostgreSQL or SQLite connection string (required)
//! - `PASSWORD_HASH_ITERATIONS` - PBKDF2 iterations (default: 1000000)
//! - `STORAGE_TIMEOUT` - Per-call storage timeout in seconds (default: 30)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 5)
//!
//! # Usage
//!
//! ```rust,ignore
//! use postgate_auth::{AuthSubsystem, AuthUser};
//!
//! let auth = AuthSubsystem::from_env().await?;
//! let token = auth.service().login(login_request).await?;
//!
//! // In an axum handler with `AuthSubsystem` as state:
//! async fn my_posts(State(auth): State<AuthSubsystem>, AuthUser(me): AuthUser) { /* ... */ }
//! ```

pub mod config;
pub mod content;
pub mod database;
pub mod error;
pub mod guard;
pub mod hasher;
pub mod models;
pub mod service;
pub mod token;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::AuthConfig;
pub use content::{PostStore, ServiceError, UserDirectory};
pub use database::{Database, StorageError};
pub use error::AuthError;
pub use guard::{AuthGuard, AuthUser};
pub use hasher::CredentialHasher;
pub use models::*;
pub use service::AuthService;
pub use token::TokenIssuer;

use axum::extract::FromRef;
use std::fmt;
use std::sync::Arc;

/// Wired authentication components sharing one storage pool
#[derive(Clone)]
pub struct AuthSubsystem {
    config: AuthConfig,
    service: Arc<AuthService>,
    guard: AuthGuard,
    posts: PostStore,
    users: UserDirectory,
}

impl AuthSubsystem {
    /// Load configuration from the environment and connect
    pub async fn from_env() -> Result<Self, AuthError> {
        Self::connect(AuthConfig::from_env()?).await
    }

    /// Validate `config`, open the storage pool and build every component
    pub async fn connect(config: AuthConfig) -> Result<Self, AuthError> {
        tracing::info!("Activating Postgate authentication");

        config.validate()?;
        let db = Database::connect(&config).await?;
        let subsystem = Self::new(db, config);

        tracing::info!("Postgate authentication activated");
        Ok(subsystem)
    }

    /// Build components over an existing database handle
    pub fn new(db: Database, config: AuthConfig) -> Self {
        let service = AuthService::new(db.clone(), &config);
        let guard = AuthGuard::new(service.tokens().clone());

        Self {
            service: Arc::new(service),
            guard,
            posts: PostStore::new(db.clone()),
            users: UserDirectory::new(db),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn service(&self) -> Arc<AuthService> {
        self.service.clone()
    }

    pub fn guard(&self) -> &AuthGuard {
        &self.guard
    }

    pub fn posts(&self) -> &PostStore {
        &self.posts
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }
}

impl fmt::Debug for AuthSubsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSubsystem")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FromRef<AuthSubsystem> for AuthGuard {
    fn from_ref(state: &AuthSubsystem) -> Self {
        state.guard.clone()
    }
}

// ============================================
// Module Tests
// ============================================
