//! Credential Hasher
//!
//! PBKDF2-HMAC-SHA256 password digests salted with a per-credential random
//! salt and the server-side password key. Verification re-derives the
//! digest and compares it in constant time.

use crate::config::AuthConfig;
use crate::error::AuthError;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::distributions::Uniform;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::Sha256;
use std::sync::Arc;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Digest length in bytes
pub const DIGEST_LEN: usize = 32;

/// Password digest derivation
#[derive(Clone)]
pub struct CredentialHasher {
    password_key: Arc<str>,
    iterations: u32,
}

impl CredentialHasher {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            password_key: Arc::from(config.password_key.as_str()),
            iterations: config.hash_iterations,
        }
    }

    /// Draw a fresh salt from the OS CSPRNG. No byte is ever zero.
    pub fn generate_salt(&self) -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        let nonzero = Uniform::new_inclusive(1u8, u8::MAX);
        for (byte, value) in salt.iter_mut().zip(OsRng.sample_iter(nonzero)) {
            *byte = value;
        }
        salt
    }

    /// Derive the digest for `password` under `salt`.
    ///
    /// The derivation salt is the password key followed by the base64 text
    /// of `salt`, encoded as ASCII with every non-ASCII character replaced
    /// by `?`. Pure in `(password, salt, password_key)`.
    pub fn hash(&self, password: &str, salt: &[u8]) -> [u8; DIGEST_LEN] {
        let mut derivation_salt = ascii_lossy(&self.password_key);
        derivation_salt.extend_from_slice(STANDARD.encode(salt).as_bytes());

        let mut digest = [0u8; DIGEST_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            &derivation_salt,
            self.iterations,
            &mut digest,
        );
        digest
    }

    /// Re-derive and compare against a stored digest.
    ///
    /// A stored digest of the wrong length is an integrity violation, not a
    /// failed match.
    pub fn verify(&self, password: &str, salt: &[u8], stored: &[u8]) -> Result<bool, AuthError> {
        if stored.len() != DIGEST_LEN {
            tracing::error!(
                stored_len = stored.len(),
                expected_len = DIGEST_LEN,
                "Stored password digest has unexpected length"
            );
            return Err(AuthError::Integrity(format!(
                "stored digest is {} bytes, expected {}",
                stored.len(),
                DIGEST_LEN
            )));
        }

        let computed = self.hash(password, salt);
        Ok(constant_time_eq(&computed, stored))
    }

    /// [`hash`](Self::hash) on the blocking pool
    pub async fn hash_blocking(
        &self,
        password: String,
        salt: Vec<u8>,
    ) -> Result<[u8; DIGEST_LEN], AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password, &salt))
            .await
            .map_err(|e| AuthError::Integrity(format!("hashing task failed: {}", e)))
    }

    /// [`verify`](Self::verify) on the blocking pool
    pub async fn verify_blocking(
        &self,
        password: String,
        salt: Vec<u8>,
        stored: Vec<u8>,
    ) -> Result<bool, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &salt, &stored))
            .await
            .map_err(|e| AuthError::Integrity(format!("hashing task failed: {}", e)))?
    }
}

fn ascii_lossy(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// Compare two byte slices without early exit.
///
/// Every byte pair is visited regardless of where the first difference is.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
