// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signing and verification of access/refresh token pairs.
//!
//! Both tokens carry the same `{sub, email, roles}` payload and differ only
//! in lifetime. Nothing is stored server-side except the digest of the
//! current refresh token, kept on the user record.

use crate::config::Config;
use crate::models::auth::{AuthTokens, BEARER};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Unique token id; keeps same-second tokens distinct
    pub jti: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid signature or expired token")]
    InvalidSignatureOrExpired,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Issues and verifies HS256 tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    /// Sign a fresh access/refresh pair for a user.
    pub fn issue(
        &self,
        user_id: &str,
        email: &str,
        roles: &[String],
    ) -> Result<AuthTokens, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TokenError::Signing(e.to_string()))?
            .as_secs() as usize;

        let access_token = self.sign(user_id, email, roles, now, self.access_ttl)?;
        let refresh_token = self.sign(user_id, email, roles, now, self.refresh_ttl)?;

        Ok(AuthTokens {
            access_token,
            refresh_token: Some(refresh_token),
            expires_in: self.access_ttl.as_secs(),
            token_type: BEARER.to_string(),
        })
    }

    fn sign(
        &self,
        user_id: &str,
        email: &str,
        roles: &[String],
        now: usize,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let exp = usize::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or_else(|| TokenError::Signing("token lifetime out of range".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            roles: roles.to_vec(),
            iat: now,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                TokenError::InvalidSignatureOrExpired
            })
    }
}

/// Hex SHA-256 of a refresh token, as kept in the user's refresh slot.
pub fn refresh_token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time comparison of a presented refresh token against a stored digest.
pub fn digest_matches(stored_digest: &str, presented: &str) -> bool {
    let presented_digest = refresh_token_digest(presented);
    stored_digest
        .as_bytes()
        .ct_eq(presented_digest.as_bytes())
        .into()
}
