//! Password hashing
//!
//! Argon2id with the crate's default parameters and a random salt, stored as
//! a PHC string. Hashing is CPU-heavy so it runs on the blocking pool.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ApiError, ApiResult};

pub async fn hash_password(password: SecretString) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
}

/// `Ok(false)` for a wrong password; `Err` only if the stored hash is corrupt
pub async fn verify_password(password: SecretString, stored_hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| ApiError::Internal(format!("Stored password hash is invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
}
