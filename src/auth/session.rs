// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Session tokens minted by this service.
//!
//! Sessions are stateless HS256 JWTs carrying the identity key and an
//! expiry. Nothing is stored server-side, so a token stays valid until it
//! expires.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::claims::SessionClaims;
use super::error::AuthError;

/// Default session lifetime (50 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(50 * 60);

/// Shortest accepted signing secret.
pub const MIN_SECRET_LEN: usize = 16;

/// Secret and lifetime shared by the issuer and the verifier.
#[derive(Clone)]
pub struct SessionConfig {
    secret: Arc<[u8]>,
    /// Lifetime of newly issued tokens
    pub ttl: Duration,
}

impl SessionConfig {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            ttl,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Mints session tokens.
#[derive(Clone)]
pub struct SessionTokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl SessionTokenIssuer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(&config.secret),
            ttl: config.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `identity_key` with the configured lifetime.
    pub fn issue(&self, identity_key: &str) -> Result<String, AuthError> {
        self.issue_with_ttl(identity_key, self.ttl)
    }

    /// Issue a token for `identity_key` expiring `ttl` from now.
    pub fn issue_with_ttl(&self, identity_key: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| AuthError::Internal("session ttl out of range".to_string()))?;

        let claims = SessionClaims {
            sub: identity_key.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::Internal(format!("failed to sign session token: {e}")))
    }
}

/// Validates session tokens minted by [`SessionTokenIssuer`].
#[derive(Clone)]
pub struct SessionTokenVerifier {
    key: DecodingKey,
}

impl SessionTokenVerifier {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            key: DecodingKey::from_secret(&config.secret),
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify `token` as of `now` (Unix seconds, UTC).
    ///
    /// A bad MAC is `InvalidSignature`; a good MAC with `exp <= now` is
    /// `TokenExpired`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        let token_data = decode::<SessionClaims>(token, &self.key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Session token failed verification");
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            }
        })?;

        let claims = token_data.claims;
        if claims.exp <= now {
            tracing::debug!(sub = %claims.sub, exp = claims.exp, now, "Session token expired");
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}
