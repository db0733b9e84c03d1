// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Verified claims and the request-scoped identity built from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Accessors shared by every kind of verified claims.
pub trait IdentityClaims {
    /// Key identifying the user in the user store (email or wallet address).
    fn subject_key(&self) -> &str;

    /// Expiration as a Unix timestamp (seconds, UTC).
    fn expires_at(&self) -> i64;
}

/// Claims carried by a Google ID token.
///
/// See: https://developers.google.com/identity/openid-connect/openid-connect#an-id-tokens-payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExternalClaims {
    /// Google account ID
    pub sub: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Issuer (`accounts.google.com` or `https://accounts.google.com`)
    pub iss: String,

    /// Audience (the OAuth client ID the token was minted for)
    pub aud: String,

    /// Expiration timestamp
    pub exp: i64,
}

impl ExternalClaims {
    /// Display name assembled from the given and family name parts.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

impl IdentityClaims for ExternalClaims {
    fn subject_key(&self) -> &str {
        if self.email.is_empty() {
            &self.sub
        } else {
            &self.email
        }
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Claims of a session token minted by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionClaims {
    /// Identity key (checksummed wallet address, wallet key hex, or email)
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

impl IdentityClaims for SessionClaims {
    fn subject_key(&self) -> &str {
        &self.sub
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Identity attached to a request once the credential gate accepts it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "claims", rename_all = "snake_case")]
pub enum VerifiedIdentity {
    /// Verified through a Google ID token
    External(ExternalClaims),
    /// Verified through a session token issued after wallet login
    Session(SessionClaims),
}

impl IdentityClaims for VerifiedIdentity {
    fn subject_key(&self) -> &str {
        match self {
            VerifiedIdentity::External(claims) => claims.subject_key(),
            VerifiedIdentity::Session(claims) => claims.subject_key(),
        }
    }

    fn expires_at(&self) -> i64 {
        match self {
            VerifiedIdentity::External(claims) => claims.expires_at(),
            VerifiedIdentity::Session(claims) => claims.expires_at(),
        }
    }
}

impl From<ExternalClaims> for VerifiedIdentity {
    fn from(claims: ExternalClaims) -> Self {
        VerifiedIdentity::External(claims)
    }
}

impl From<SessionClaims> for VerifiedIdentity {
    fn from(claims: SessionClaims) -> Self {
        VerifiedIdentity::Session(claims)
    }
}
