// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! # Authentication Module
//!
//! Credential verification for the Koen API.
//!
//! ## Auth Flows
//!
//! **Google sign-in**
//!
//! 1. Frontend signs the user in with Google
//! 2. Frontend sends `{"idToken": "<Google ID token>"}` or
//!    `Authorization: Bearer <Google ID token>`
//! 3. Server:
//!    - Fetches Google's signing certificates via HTTPS
//!    - Verifies signature, issuer, audience and expiry
//!    - Identifies the user by email
//!
//! **Wallet login**
//!
//! 1. Wallet signs a server-agnostic nonce
//! 2. Frontend posts `{nonce, signature, walletPublicAddress}` to `/auth/wallet`
//! 3. Server recovers the signer and, on a match, issues an HS256 session token
//! 4. Session token is presented like a Google ID token on later requests
//!
//! ## Security
//!
//! - Signing certificates are fetched per verification, never cached
//! - Expiry is strict: a token is valid only while `exp > now` (no leeway)
//! - Session tokens are stateless and valid until they expire

pub mod claims;
pub mod error;
pub mod external;
pub mod extractor;
pub mod gate;
pub mod keyring;
pub mod session;
pub mod signature;

#[cfg(test)]
pub mod testutil;

pub use claims::{ExternalClaims, IdentityClaims, SessionClaims, VerifiedIdentity};
pub use error::{AuthError, ErrorCategory};
pub use external::{ExternalTokenConfig, ExternalTokenVerifier};
pub use extractor::Auth;
pub use gate::{credential_gate, CredentialGate, ReplayableBody, VerifierKind};
pub use keyring::{HttpKeyRing, KeyRing, KeyRingError, StaticKeyRing};
pub use session::{SessionConfig, SessionTokenIssuer, SessionTokenVerifier};
pub use signature::{SignatureError, SignatureMode, SignaturePayload, SignatureVerifier};
