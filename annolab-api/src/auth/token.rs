//! Access tokens
//!
//! HS256-signed JWTs naming the user id in `sub`. Tokens carry no other
//! authority; roles are looked up per request.

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Login response body
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    /// Milliseconds since the epoch
    pub expires_at: i64,
    /// Seconds from now
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &SecretString, lifetime: Duration) -> ApiResult<Self> {
        let key = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|e| ApiError::Internal(format!("Invalid signing key: {}", e)))?;
        Ok(Self { key, lifetime })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn mint(&self, user_id: &str) -> ApiResult<IssuedToken> {
        let now = Utc::now();
        let expires = now + self.lifetime;
        let claims = AccessClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let access_token = claims
            .sign_with_key(&self.key)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            access_token,
            expires_at: expires.timestamp_millis(),
            expires_in: self.lifetime.num_seconds(),
        })
    }

    /// Check the signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> ApiResult<AccessClaims> {
        let claims: AccessClaims = token
            .verify_with_key(&self.key)
            .map_err(|_| ApiError::Unauthorized("Invalid access token".to_string()))?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(ApiError::Unauthorized("Access token expired".to_string()));
        }

        Ok(claims)
    }
}
