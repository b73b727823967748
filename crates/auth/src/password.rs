//! Password hashing (argon2id, PHC string format).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed.
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default().verify_password(plain.as_bytes(), &parsed).is_ok())
}
