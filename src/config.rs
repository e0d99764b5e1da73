//! Authentication Configuration
//!
//! All configuration values are loaded once from environment variables and
//! then handed to each component by value. Nothing re-reads the environment
//! after startup.

use crate::error::AuthError;
use std::env;
use std::fmt;
use std::time::Duration;

/// Default PBKDF2 iteration count
pub const DEFAULT_HASH_ITERATIONS: u32 = 1_000_000;

/// Lowest iteration count `validate` accepts
pub const MIN_HASH_ITERATIONS: u32 = 1_000;

/// Minimum token key length in bytes (one HMAC-SHA-512 output)
pub const MIN_TOKEN_KEY_LEN: usize = 64;

/// Authentication configuration loaded from environment
#[derive(Clone)]
pub struct AuthConfig {
    /// Server-side secret mixed into every password digest (from PASSWORD_KEY env var)
    pub password_key: String,

    /// Symmetric key for signing tokens with HMAC-SHA-512 (from TOKEN_KEY env var)
    pub token_key: String,

    /// Storage connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// PBKDF2 iteration count (from PASSWORD_HASH_ITERATIONS env var)
    pub hash_iterations: u32,

    /// Upper bound on any single storage call in seconds (from STORAGE_TIMEOUT env var)
    pub storage_timeout_secs: u64,

    /// Storage connection limit (from DATABASE_MAX_CONNECTIONS env var)
    pub max_connections: u32,
}

impl AuthConfig {
    /// Load configuration from environment variables
    ///
    /// Fails with [`AuthError::Config`] when a required variable is missing.
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            password_key: required("PASSWORD_KEY")?,

            token_key: required("TOKEN_KEY")?,

            database_url: required("DATABASE_URL")?,

            hash_iterations: env::var("PASSWORD_HASH_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HASH_ITERATIONS),

            storage_timeout_secs: env::var("STORAGE_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.password_key.is_empty() {
            return Err(AuthError::Config("PASSWORD_KEY must not be empty".to_string()));
        }

        if self.token_key.len() < MIN_TOKEN_KEY_LEN {
            return Err(AuthError::Config(format!(
                "TOKEN_KEY must be at least {} bytes",
                MIN_TOKEN_KEY_LEN
            )));
        }

        if self.hash_iterations < MIN_HASH_ITERATIONS {
            return Err(AuthError::Config(format!(
                "PASSWORD_HASH_ITERATIONS must be at least {}",
                MIN_HASH_ITERATIONS
            )));
        }

        if self.storage_timeout_secs == 0 {
            return Err(AuthError::Config(
                "STORAGE_TIMEOUT must be positive".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(AuthError::Config(
                "DATABASE_MAX_CONNECTIONS must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Storage call timeout as a [`Duration`]
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("password_key", &"<redacted>")
            .field("token_key", &"<redacted>")
            .field("database_url", &redact_url(&self.database_url))
            .field("hash_iterations", &self.hash_iterations)
            .field("storage_timeout_secs", &self.storage_timeout_secs)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Keep only the scheme of a connection string; the rest may hold credentials
fn redact_url(url: &str) -> String {
    match url.split_once(':') {
        Some((scheme, _)) => format!("{}:<redacted>", scheme),
        None => "<redacted>".to_string(),
    }
}

fn required(name: &str) -> Result<String, AuthError> {
    env::var(name).map_err(|_| AuthError::Config(format!("{} environment variable must be set", name)))
}
