// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Login endpoints.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};

use crate::auth::{Auth, AuthError, IdentityClaims, SignaturePayload};
use crate::models::IdTokenResponse;
use crate::state::AppState;

/// Exchange a signed nonce for a session token.
///
/// The signer recovered from `signature` must match the claimed wallet.
/// The returned token is presented as `idToken` (or a bearer token) on
/// later requests.
#[utoipa::path(
    post,
    path = "/auth/wallet",
    tag = "Auth",
    request_body = SignaturePayload,
    responses(
        (status = 200, description = "Session token issued", body = IdTokenResponse),
        (status = 400, description = "Body or signature could not be decoded"),
        (status = 401, description = "Signature does not match the claimed wallet"),
    )
)]
pub async fn wallet_login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IdTokenResponse>, AuthError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AuthError::EmptyBody);
    }

    let payload: SignaturePayload =
        serde_json::from_slice(&body).map_err(|e| AuthError::MalformedBody(e.to_string()))?;

    if !state.signatures.verify(&payload)? {
        tracing::warn!(
            wallet = %payload.claimed,
            mode = %state.signatures.mode(),
            "Wallet signature does not match claimed signer"
        );
        return Err(AuthError::SignerMismatch);
    }

    let identity = state.signatures.canonical_identity(&payload.claimed)?;
    let id_token = state.sessions.issue(&identity)?;

    tracing::info!(wallet = %identity, "Wallet login succeeded");
    Ok(Json(IdTokenResponse { id_token }))
}

/// Confirm that an ID token is acceptable.
///
/// The credential gate does all the work; reaching the handler means the
/// token verified.
#[utoipa::path(
    post,
    path = "/auth/google/jwt",
    tag = "Auth",
    request_body(content = String, description = "`{\"idToken\": \"<token>\"}`", content_type = "application/json"),
    responses(
        (status = 200, description = "Token accepted"),
        (status = 400, description = "Body empty, malformed or carrying extra fields"),
        (status = 401, description = "Token rejected"),
    )
)]
pub async fn acknowledge(Auth(identity): Auth) -> StatusCode {
    tracing::debug!(subject = identity.subject_key(), "ID token acknowledged");
    StatusCode::OK
}
