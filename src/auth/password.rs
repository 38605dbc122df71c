// Password hashing and verification service

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::auth::error::AuthError;
use crate::config::PasswordConfig;

/// Malformed input to the hasher. A wrong password is not an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("password must not be empty")]
    EmptyPlaintext,

    #[error("stored password digest is corrupted: {0}")]
    CorruptDigest(String),

    #[error("invalid hasher parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Argon2id hasher with a fixed cost, shared by every request
#[derive(Debug, Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    pub fn new(config: PasswordConfig) -> Result<Self, CredentialError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a PHC string with a fresh random salt
    pub fn hash_blocking(&self, plaintext: &str) -> Result<String, CredentialError> {
        if plaintext.is_empty() {
            return Err(CredentialError::EmptyPlaintext);
        }

        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// Verify a password against a stored PHC string
    ///
    /// The digest comparison inside `password-hash` is constant-time. The
    /// cost parameters embedded in the digest are used, not the current ones.
    pub fn verify_blocking(&self, plaintext: &str, digest: &str) -> Result<bool, CredentialError> {
        if plaintext.is_empty() {
            return Err(CredentialError::EmptyPlaintext);
        }

        let parsed =
            PasswordHash::new(digest).map_err(|e| CredentialError::CorruptDigest(e.to_string()))?;

        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CredentialError::CorruptDigest(e.to_string())),
        }
    }

    /// Hash on the blocking pool so the executor keeps serving other requests
    pub async fn hash(&self, plaintext: String) -> Result<String, AuthError> {
        let service = self.clone();
        let digest = tokio::task::spawn_blocking(move || service.hash_blocking(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {}", e)))??;
        Ok(digest)
    }

    /// Verify on the blocking pool
    pub async fn verify(&self, plaintext: String, digest: String) -> Result<bool, AuthError> {
        let service = self.clone();
        let matches = tokio::task::spawn_blocking(move || service.verify_blocking(&plaintext, &digest))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {}", e)))??;
        Ok(matches)
    }
}

#[cfg(test)]
pub(crate) fn cheap_password_config() -> PasswordConfig {
    PasswordConfig {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    }
}
