//! Token Issuer / Validator
//!
//! Stateless HMAC-SHA-512 signed JWTs binding a single `userId` claim.
//! Validation needs only the shared token key.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{Subject, TokenClaims};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Fixed token validity window in hours
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Mints and verifies identity tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.token_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.token_key.as_bytes());

        // No issuer or audience claims are minted or checked
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "iat"]);

        Self {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Issue a token for `user_id` expiring in [`TOKEN_LIFETIME_HOURS`]
    pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    pub(crate) fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<String, AuthError> {
        let exp = now + Duration::hours(TOKEN_LIFETIME_HOURS);

        let claims = TokenClaims {
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("Token signing failed: {:?}", e);
                AuthError::Config("token signing failed".to_string())
            })?;

        Ok(token)
    }

    /// Verify signature and expiry and return the bound subject
    pub fn validate(&self, token: &str) -> Result<Subject, AuthError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;

        let user_id: i64 = token_data.claims.user_id.parse().map_err(|_| {
            tracing::debug!("Token carries a non-numeric userId claim");
            AuthError::Unauthorized
        })?;

        Ok(Subject::new(user_id))
    }
}
