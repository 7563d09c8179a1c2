//! Access token issuer.
//!
//! Stateless HS256 JWTs. There is no revocation list: an issued token stays
//! valid until `exp`, which is why the TTL is short and refresh sessions carry
//! the revocable state.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;
use super::models::{Role, User};

pub const BEARER_PREFIX: &str = "Bearer ";
const MIN_SECRET_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
    pub iat: i64,
    pub exp: i64,
}

pub struct AccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl AccessTokens {
    /// # Errors
    /// Returns an error if the secret is shorter than 32 bytes or the TTL is not positive.
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Result<Self> {
        let secret = secret.expose_secret().as_bytes();
        if secret.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            ));
        }
        if ttl_seconds <= 0 {
            return Err(anyhow!("access token ttl must be positive"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds,
        })
    }

    /// Sign a token for `user`, returned without the bearer prefix.
    pub fn issue(&self, user: &User) -> Result<String> {
        let iat = Utc::now().timestamp();
        let exp = iat
            .checked_add(self.ttl_seconds)
            .ok_or_else(|| anyhow!("access token expiry out of range"))?;
        let claims = AccessClaims {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            iat,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("failed to sign access token")
    }

    /// Accepts the token with or without the bearer prefix.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let raw = strip_bearer(token).ok_or(AuthError::Unauthorized)?;
        decode::<AccessClaims>(raw, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!("access token rejected: {err}");
                AuthError::Unauthorized
            })
    }
}

#[must_use]
pub fn bearer(token: &str) -> String {
    format!("{BEARER_PREFIX}{token}")
}

/// Strip an optional `Bearer ` prefix; `None` for blank input.
#[must_use]
pub fn strip_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix(BEARER_PREFIX)
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
