// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Credential gate middleware.
//!
//! The gate finds a token on the request, runs it through the configured
//! verifiers in order and attaches the first [`VerifiedIdentity`] that comes
//! back to the request extensions. It either forwards the request or answers
//! with an error, never both.
//!
//! ## Token sources
//!
//! - `Authorization: Bearer <token>`; the body is left untouched
//! - otherwise the JSON body `{"idToken": "<token>"}`; the body is buffered
//!   once and handed back to downstream handlers unchanged
//!
//! ## Usage
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/protected", post(handler))
//!     .route_layer(axum::middleware::from_fn_with_state(gate, credential_gate));
//! ```

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::claims::{IdentityClaims, VerifiedIdentity};
use super::error::AuthError;
use super::external::ExternalTokenVerifier;
use super::session::SessionTokenVerifier;

/// Largest body the gate buffers (64 KiB).
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// A token verifier the gate can consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierKind {
    /// Session tokens minted by this service
    Session,
    /// ID tokens from the external identity provider
    External,
}

impl FromStr for VerifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "session" => Ok(VerifierKind::Session),
            "external" | "google" => Ok(VerifierKind::External),
            other => Err(format!("unknown verifier {other:?}")),
        }
    }
}

/// Where the gate is in handling a request; used for rejection logs.
#[derive(Debug, Clone, Copy)]
enum Stage {
    AwaitingBody,
    BodyRead,
    TokenExtracted,
}

/// Buffered request body that can be turned back into a [`Body`] any
/// number of times.
#[derive(Debug, Clone)]
pub struct ReplayableBody(Bytes);

impl ReplayableBody {
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn body(&self) -> Body {
        Body::from(self.0.clone())
    }
}

#[derive(Deserialize)]
struct IdTokenBody {
    #[serde(rename = "idToken")]
    id_token: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictIdTokenBody {
    #[serde(rename = "idToken")]
    id_token: String,
}

/// Composition of token verifiers applied to incoming requests.
#[derive(Clone)]
pub struct CredentialGate {
    session: Option<SessionTokenVerifier>,
    external: Option<ExternalTokenVerifier>,
    order: Arc<[VerifierKind]>,
    deny_unknown_fields: bool,
    body_limit: usize,
}

impl CredentialGate {
    /// Create a gate that consults verifiers in `order`.
    ///
    /// Kinds without a verifier attached are skipped.
    pub fn new(order: impl Into<Vec<VerifierKind>>) -> Self {
        Self {
            session: None,
            external: None,
            order: Arc::from(order.into()),
            deny_unknown_fields: false,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_session(mut self, verifier: SessionTokenVerifier) -> Self {
        self.session = Some(verifier);
        self
    }

    pub fn with_external(mut self, verifier: ExternalTokenVerifier) -> Self {
        self.external = Some(verifier);
        self
    }

    /// Reject bodies carrying fields other than `idToken`.
    pub fn strict(mut self) -> Self {
        self.deny_unknown_fields = true;
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn order(&self) -> &[VerifierKind] {
        &self.order
    }

    /// Run `token` through the verifiers; the first success wins.
    ///
    /// With a single active verifier its own error is returned. With
    /// several, a credential every verifier rejects is `Unauthenticated`.
    pub async fn authenticate(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let mut failures = Vec::new();

        for kind in self.order.iter().copied() {
            let result = match kind {
                VerifierKind::Session => match &self.session {
                    Some(verifier) => verifier.verify(token).map(VerifiedIdentity::from),
                    None => continue,
                },
                VerifierKind::External => match &self.external {
                    Some(verifier) => verifier.verify(token).await.map(VerifiedIdentity::from),
                    None => continue,
                },
            };

            match result {
                Ok(identity) => {
                    tracing::debug!(
                        verifier = ?kind,
                        subject = identity.subject_key(),
                        "Credential accepted"
                    );
                    return Ok(identity);
                }
                Err(e) => {
                    tracing::debug!(
                        verifier = ?kind,
                        error_code = e.error_code(),
                        error = %e,
                        "Verifier rejected credential"
                    );
                    failures.push(e);
                }
            }
        }

        match failures.len() {
            0 => Err(AuthError::Internal("no token verifier configured".to_string())),
            1 => Err(failures.remove(0)),
            _ => Err(AuthError::Unauthenticated),
        }
    }

    /// Authenticate `request`, returning it with the identity attached.
    pub async fn admit(&self, request: Request) -> Result<Request, AuthError> {
        let (mut parts, body) = request.into_parts();

        if let Some(header) = parts.headers.get(AUTHORIZATION) {
            let token = bearer_token(header)
                .map_err(|e| reject(Stage::TokenExtracted, e))?
                .to_string();
            let identity = self
                .authenticate(&token)
                .await
                .map_err(|e| reject(Stage::TokenExtracted, e))?;

            parts.extensions.insert(identity);
            return Ok(Request::from_parts(parts, body));
        }

        let bytes = to_bytes(body, self.body_limit)
            .await
            .map_err(|e| reject(Stage::AwaitingBody, AuthError::MalformedBody(e.to_string())))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(reject(Stage::BodyRead, AuthError::EmptyBody));
        }

        let token = self
            .token_from_body(&bytes)
            .map_err(|e| reject(Stage::BodyRead, e))?;

        let identity = self
            .authenticate(&token)
            .await
            .map_err(|e| reject(Stage::TokenExtracted, e))?;

        let replay = ReplayableBody(bytes);
        let body = replay.body();
        parts.extensions.insert(identity);
        parts.extensions.insert(replay);
        Ok(Request::from_parts(parts, body))
    }

    fn token_from_body(&self, bytes: &[u8]) -> Result<String, AuthError> {
        let token = if self.deny_unknown_fields {
            serde_json::from_slice::<StrictIdTokenBody>(bytes).map(|b| b.id_token)
        } else {
            serde_json::from_slice::<IdTokenBody>(bytes).map(|b| b.id_token)
        }
        .map_err(|e| AuthError::MalformedBody(e.to_string()))?;

        if token.trim().is_empty() {
            return Err(AuthError::MalformedBody("idToken is empty".to_string()));
        }
        Ok(token)
    }
}

fn bearer_token(header: &HeaderValue) -> Result<&str, AuthError> {
    header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

fn reject(stage: Stage, err: AuthError) -> AuthError {
    tracing::debug!(
        stage = ?stage,
        error_code = err.error_code(),
        error = %err,
        "Credential gate rejected request"
    );
    err
}

/// Middleware entry point for [`CredentialGate`].
pub async fn credential_gate(
    State(gate): State<CredentialGate>,
    request: Request,
    next: Next,
) -> Response {
    match gate.admit(request).await {
        Ok(request) => next.run(request).await,
        Err(e) => {
            tracing::info!(
                status = e.status_code().as_u16(),
                error_code = e.error_code(),
                "Request rejected by credential gate"
            );
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::external::ExternalTokenConfig;
    use crate::auth::session::{SessionConfig, SessionTokenIssuer, DEFAULT_SESSION_TTL};
    use crate::auth::testutil::{google_claims, provider_key_ring, sign_provider_token, CLIENT_ID, PROVIDER_KID};
    use crate::auth::Auth;
    use axum::{
        http::{Method, StatusCode},
        routing::post,
        Json, Router,
    };
    use chrono::Utc;
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "gate-test-session-secret";

    fn session_config() -> SessionConfig {
        SessionConfig::new(SECRET, DEFAULT_SESSION_TTL)
    }

    fn composite_gate() -> CredentialGate {
        CredentialGate::new([VerifierKind::Session, VerifierKind::External])
            .with_session(SessionTokenVerifier::new(&session_config()))
            .with_external(ExternalTokenVerifier::new(
                ExternalTokenConfig::google(CLIENT_ID),
                Arc::new(provider_key_ring()),
            ))
    }

    async fn echo(Auth(identity): Auth, body: String) -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "subject": identity.subject_key(),
            "identity": identity,
            "body": body,
        }))
    }

    fn app(gate: CredentialGate) -> Router {
        Router::new()
            .route("/protected", post(echo))
            .route_layer(axum::middleware::from_fn_with_state(gate, credential_gate))
    }

    fn post_body(body: impl Into<Body>) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/protected")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(gate: CredentialGate, request: Request) -> (StatusCode, serde_json::Value) {
        let response = app(gate).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn google_token() -> String {
        sign_provider_token(
            Some(PROVIDER_KID),
            &google_claims("accounts.google.com", CLIENT_ID, Utc::now().timestamp() + 600),
        )
    }

    #[tokio::test]
    async fn empty_body_is_bad_request() {
        let (status, body) = send(composite_gate(), post_body(Body::empty())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "empty_body");
    }

    #[tokio::test]
    async fn random_body_is_bad_request() {
        let (status, body) = send(composite_gate(), post_body("bleh")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "malformed_body");
    }

    #[tokio::test]
    async fn missing_token_field_is_bad_request() {
        let (status, _) = send(composite_gate(), post_body(r#"{"token":"x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(composite_gate(), post_body(r#"{"idToken":""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let (status, body) = send(composite_gate(), post_body(r#"{"idToken":"garbage"}"#)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthenticated");
    }

    #[tokio::test]
    async fn session_token_in_body_is_accepted_and_body_restored() {
        let token = SessionTokenIssuer::new(&session_config()).issue("0xAbC").unwrap();
        let raw = format!(r#"{{"idToken":"{token}","pageName":"koen","random":"random"}}"#);

        let (status, body) = send(composite_gate(), post_body(raw.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "0xAbC");
        assert_eq!(body["identity"]["kind"], "session");
        assert_eq!(body["body"], raw);
    }

    #[tokio::test]
    async fn strict_gate_rejects_extra_fields() {
        let token = SessionTokenIssuer::new(&session_config()).issue("0xAbC").unwrap();
        let raw = format!(r#"{{"idToken":"{token}","random":"random"}}"#);

        let (status, body) = send(composite_gate().strict(), post_body(raw)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "malformed_body");

        let raw = format!(r#"{{"idToken":"{token}"}}"#);
        let (status, _) = send(composite_gate().strict(), post_body(raw)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn google_token_falls_through_to_external_verifier() {
        let raw = format!(r#"{{"idToken":"{}"}}"#, google_token());
        let (status, body) = send(composite_gate(), post_body(raw)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "koen@example.com");
        assert_eq!(body["identity"]["kind"], "external");
        assert_eq!(body["identity"]["claims"]["given_name"], "Koen");
    }

    #[tokio::test]
    async fn bearer_header_is_used_without_body() {
        let token = SessionTokenIssuer::new(&session_config()).issue("0xAbC").unwrap();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/protected")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(composite_gate(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "0xAbC");
        assert_eq!(body["body"], "");
    }

    #[tokio::test]
    async fn non_bearer_header_is_unauthorized() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/protected")
            .header(AUTHORIZATION, "Basic a29lbjpzYW4=")
            .body(Body::from(r#"{"idToken":"x"}"#))
            .unwrap();

        let (status, body) = send(composite_gate(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_auth_header");
    }

    #[tokio::test]
    async fn single_verifier_reports_its_own_error() {
        let gate = CredentialGate::new([VerifierKind::Session])
            .with_session(SessionTokenVerifier::new(&session_config()));
        let token = SessionTokenIssuer::new(&session_config())
            .issue_with_ttl("0xAbC", Duration::ZERO)
            .unwrap();

        let (status, body) = send(gate, post_body(format!(r#"{{"idToken":"{token}"}}"#))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "token_expired");
    }

    #[tokio::test]
    async fn session_only_gate_rejects_google_tokens() {
        let gate = CredentialGate::new([VerifierKind::Session, VerifierKind::External])
            .with_session(SessionTokenVerifier::new(&session_config()));
        let raw = format!(r#"{{"idToken":"{}"}}"#, google_token());

        let (status, _) = send(gate, post_body(raw)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn oversized_body_is_bad_request() {
        let gate = composite_gate().with_body_limit(16);
        let (status, _) = send(gate, post_body(r#"{"idToken":"0123456789abcdef"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admit_attaches_identity_and_replayable_body() {
        let token = SessionTokenIssuer::new(&session_config()).issue("0xAbC").unwrap();
        let raw = format!(r#"{{"idToken":"{token}"}}"#);

        let request = composite_gate().admit(post_body(raw.clone())).await.unwrap();
        let identity = request.extensions().get::<VerifiedIdentity>().unwrap();
        assert_eq!(identity.subject_key(), "0xAbC");

        let replay = request.extensions().get::<ReplayableBody>().unwrap().clone();
        assert_eq!(replay.bytes().as_ref(), raw.as_bytes());

        let first = to_bytes(replay.body(), usize::MAX).await.unwrap();
        let second = to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn verifier_kind_parses() {
        assert_eq!("session".parse::<VerifierKind>().unwrap(), VerifierKind::Session);
        assert_eq!(" Google ".parse::<VerifierKind>().unwrap(), VerifierKind::External);
        assert!("wallet".parse::<VerifierKind>().is_err());
    }
}
