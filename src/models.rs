// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! # API Data Models
//!
//! Request and response bodies used by the REST API. All types derive
//! `ToSchema` for the OpenAPI document; JSON field names are camelCase to
//! match the web client.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{IdentityClaims, VerifiedIdentity};

// =============================================================================
// User Models
// =============================================================================

/// A creator profile.
///
/// A user signs in either with Google (identified by `email`) or with a
/// wallet (identified by `walletPublicAddress`). `pageName` is the public
/// slug of their page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Store-assigned identifier; ignored on input.
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub page_name: String,

    /// Address of the wallet used for wallet login.
    #[serde(
        default,
        alias = "metaMaskWalletPublicKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub wallet_public_address: Option<String>,

    /// Address of a wallet generated for the user by the web client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_matic_wallet_public_key: Option<String>,
}

impl User {
    /// Overwrite the identity fields with what `identity` proves.
    ///
    /// Fields the credential does not prove are cleared.
    pub fn bind_identity(&mut self, identity: &VerifiedIdentity) {
        match identity {
            VerifiedIdentity::External(claims) => {
                self.email = Some(claims.email.clone()).filter(|e| !e.trim().is_empty());
                self.name = claims.display_name();
                self.wallet_public_address = None;
            }
            VerifiedIdentity::Session(claims) => {
                self.email = None;
                self.name = None;
                self.wallet_public_address = Some(claims.sub.clone());
            }
        }
    }
}

// =============================================================================
// Auth Models
// =============================================================================

/// Session token issued after a successful wallet login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdTokenResponse {
    #[serde(rename = "idToken")]
    pub id_token: String,
}

/// Response for GET /api/v1/users/me
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentIdentityResponse {
    /// Key identifying the user (email or wallet address)
    pub subject: String,
    /// `external` or `session`
    pub kind: String,
    /// Token expiry (Unix seconds)
    pub expires_at: i64,
}

impl From<&VerifiedIdentity> for CurrentIdentityResponse {
    fn from(identity: &VerifiedIdentity) -> Self {
        let kind = match identity {
            VerifiedIdentity::External(_) => "external",
            VerifiedIdentity::Session(_) => "session",
        };
        Self {
            subject: identity.subject_key().to_string(),
            kind: kind.to_string(),
            expires_at: identity.expires_at(),
        }
    }
}
