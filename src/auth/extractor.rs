// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Axum extractors for identities attached by the credential gate.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     identity.subject_key()
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::claims::VerifiedIdentity;
use super::error::AuthError;

/// Identity attached by [`credential_gate`](super::gate::credential_gate).
///
/// Rejects with `Unauthenticated` when the route is not behind the gate.
pub struct Auth(pub VerifiedIdentity);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::SessionClaims;
    use axum::http::Request;

    fn empty_parts() -> Parts {
        Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn auth_requires_gate() {
        let mut parts = empty_parts();
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn auth_reads_identity_from_extensions() {
        let mut parts = empty_parts();
        parts.extensions.insert(VerifiedIdentity::from(SessionClaims {
            sub: "0xAbC".to_string(),
            iat: 0,
            exp: 1,
        }));

        let Auth(identity) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(matches!(identity, VerifiedIdentity::Session(ref c) if c.sub == "0xAbC"));
    }
}
