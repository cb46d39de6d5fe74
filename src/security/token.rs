//! Signed session tokens (HS256 JWT).
//!
//! The same [`TokenKeys`] signs tokens at login and verifies them in the
//! authentication gate.

use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::security::auth::AuthError;

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    pub uid: i64,
    /// Username.
    pub user: String,
    /// Role name.
    pub role: String,
    /// Issued at (Unix seconds).
    pub iat: u64,
    /// Expires at (Unix seconds).
    pub exp: u64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Pre-built signing and verification keys.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, Duration::from_secs(config.token_ttl_secs))
    }

    /// Issue a token for `(subject_id, username, role)` valid for the configured TTL.
    pub fn sign(&self, subject_id: i64, username: &str, role: &str) -> Result<String, TokenError> {
        let iat = get_current_timestamp();
        self.sign_claims(&Claims {
            uid: subject_id,
            user: username.to_string(),
            role: role.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl.as_secs()),
        })
    }

    pub fn sign_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Check signature first, then expiry. A correctly signed but expired
    /// token is reported as [`AuthError::Expired`]; anything else that fails
    /// is [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    tracing::debug!(error = %e, "Token verification failed");
                    AuthError::InvalidToken
                }
            })
    }
}
