// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Google ID token verification.
//!
//! ## Checks
//!
//! 1. Header parses, algorithm is in the RSA family, `kid` is present
//! 2. Signing key for `kid` is found in the provider key ring
//! 3. Signature verifies over header and payload
//! 4. Issuer is one of the accepted issuers
//! 5. Audience is the configured client ID
//! 6. Expiry lies strictly in the future (UTC)
//!
//! The first failing check decides the error; later checks are skipped.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, Validation};

use super::claims::ExternalClaims;
use super::error::AuthError;
use super::keyring::{decoding_key_from_pem, KeyRing};

/// Issuer strings Google puts in its ID tokens.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Header algorithms that select the RSA verification path.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Expected issuer and audience for provider tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTokenConfig {
    /// OAuth client ID tokens must be minted for
    pub client_id: String,
    /// Accepted `iss` values, compared exactly
    pub issuers: Vec<String>,
}

impl ExternalTokenConfig {
    /// Configuration for Google with the two canonical issuer forms.
    pub fn google(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Verifies tokens issued by the external identity provider.
#[derive(Clone)]
pub struct ExternalTokenVerifier {
    config: Arc<ExternalTokenConfig>,
    key_ring: Arc<dyn KeyRing>,
}

impl ExternalTokenVerifier {
    pub fn new(config: ExternalTokenConfig, key_ring: Arc<dyn KeyRing>) -> Self {
        Self {
            config: Arc::new(config),
            key_ring,
        }
    }

    pub fn config(&self) -> &ExternalTokenConfig {
        &self.config
    }

    /// Verify `token` against the current time.
    pub async fn verify(&self, token: &str) -> Result<ExternalClaims, AuthError> {
        self.verify_at(token, Utc::now().timestamp()).await
    }

    /// Verify `token` as of `now` (Unix seconds, UTC).
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<ExternalClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            tracing::debug!(alg = ?header.alg, "Rejected provider token with non-RSA algorithm");
            return Err(AuthError::MalformedToken);
        }

        let kid = header.kid.as_deref().ok_or(AuthError::MalformedToken)?;

        let pem = self.key_ring.fetch(kid).await.map_err(|e| {
            tracing::debug!(kid, error = %e, "Provider key lookup failed");
            AuthError::from(e)
        })?;
        let decoding_key = decoding_key_from_pem(&pem)?;

        // Claims are checked below, in order, so the library only verifies
        // the signature and decodes the payload.
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        let token_data = decode::<ExternalClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(kid, error = %e, "Provider token failed verification");
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            }
        })?;

        let claims = token_data.claims;
        self.check_claims(&claims, now)?;

        tracing::debug!(sub = %claims.sub, "Provider token verified");
        Ok(claims)
    }

    fn check_claims(&self, claims: &ExternalClaims, now: i64) -> Result<(), AuthError> {
        if !self.config.issuers.iter().any(|iss| *iss == claims.iss) {
            tracing::debug!(iss = %claims.iss, "Provider token issuer rejected");
            return Err(AuthError::InvalidIssuer);
        }

        if claims.aud != self.config.client_id {
            tracing::debug!(aud = %claims.aud, "Provider token audience rejected");
            return Err(AuthError::InvalidAudience);
        }

        if claims.exp <= now {
            tracing::debug!(exp = claims.exp, now, "Provider token expired");
            return Err(AuthError::TokenExpired);
        }

        Ok(())
    }
}
