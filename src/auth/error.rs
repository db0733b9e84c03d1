// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use super::keyring::KeyRingError;
use super::signature::SignatureError;

/// Coarse classification of an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Body absent, unparseable, or carrying unexpected fields.
    MalformedInput,
    /// Bad signature, key mismatch, MAC mismatch.
    CryptoVerificationFailure,
    /// Wrong issuer or audience, or expired.
    ClaimViolation,
    /// The identity provider's key endpoint could not be used.
    UpstreamUnavailable,
    /// Something broke on our side.
    Internal,
}

/// Authentication error type.
///
/// Every variant maps to exactly one of 400, 401 or 500 so that no
/// authorization decision is ever left ambiguous.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Request body is empty
    #[error("Request body is empty")]
    EmptyBody,
    /// Request body could not be decoded
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    /// Signature payload could not be decoded
    #[error("Malformed signature payload: {0}")]
    MalformedSignature(String),
    /// Authorization header present but not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Token is malformed
    #[error("Token is malformed")]
    MalformedToken,
    /// Token signature is invalid
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,
    /// Token issuer is invalid
    #[error("Token issuer is invalid")]
    InvalidIssuer,
    /// Token audience is invalid
    #[error("Token audience is invalid")]
    InvalidAudience,
    /// No key in the provider's key ring matches the token's key id
    #[error("No matching key found in key ring")]
    NoMatchingKey,
    /// Provider key ring could not be fetched or parsed
    #[error("Identity provider keys unavailable: {0}")]
    KeyRingUnavailable(String),
    /// Recovered signer does not match the claimed wallet
    #[error("Invalid auth")]
    SignerMismatch,
    /// Every configured verifier rejected the credential
    #[error("Credential was rejected by every verifier")]
    Unauthenticated,
    /// Internal error
    #[error("Internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::EmptyBody => "empty_body",
            AuthError::MalformedBody(_) => "malformed_body",
            AuthError::MalformedSignature(_) => "malformed_signature",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::KeyRingUnavailable(_) => "key_ring_unavailable",
            AuthError::SignerMismatch => "signer_mismatch",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Internal(_) => "internal_error",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::EmptyBody | AuthError::MalformedBody(_) | AuthError::MalformedSignature(_) => {
                ErrorCategory::MalformedInput
            }
            AuthError::InvalidIssuer | AuthError::InvalidAudience | AuthError::TokenExpired => {
                ErrorCategory::ClaimViolation
            }
            AuthError::KeyRingUnavailable(_) => ErrorCategory::UpstreamUnavailable,
            AuthError::Internal(_) => ErrorCategory::Internal,
            AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::NoMatchingKey
            | AuthError::SignerMismatch
            | AuthError::Unauthenticated => ErrorCategory::CryptoVerificationFailure,
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// Key ring outages are reported as 401 like any other verification
    /// failure; the error code keeps them apart.
    pub fn status_code(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::MalformedInput => StatusCode::BAD_REQUEST,
            ErrorCategory::CryptoVerificationFailure
            | ErrorCategory::ClaimViolation
            | ErrorCategory::UpstreamUnavailable => StatusCode::UNAUTHORIZED,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<KeyRingError> for AuthError {
    fn from(err: KeyRingError) -> Self {
        match err {
            KeyRingError::NotFound(_) => AuthError::NoMatchingKey,
            KeyRingError::Network(msg) | KeyRingError::Malformed(msg) => {
                AuthError::KeyRingUnavailable(msg)
            }
        }
    }
}

impl From<SignatureError> for AuthError {
    fn from(err: SignatureError) -> Self {
        AuthError::MalformedSignature(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
