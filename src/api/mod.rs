// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

use std::path::Path;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{credential_gate, ExternalClaims, SessionClaims, SignaturePayload},
    models::{CurrentIdentityResponse, IdTokenResponse, User},
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod users;

/// Build the application router.
///
/// `/auth/google/jwt` runs the credential gate in strict mode; the user
/// routes run it leniently so the body can carry the profile alongside
/// `idToken`. When `static_dir` is set, unmatched paths are served from it
/// with `index.html` as the fallback.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let strict_gate = state.gate.clone().strict();
    let lenient_gate = state.gate.clone();

    let acknowledge_routes = Router::new()
        .route("/auth/google/jwt", post(auth::acknowledge))
        .route_layer(from_fn_with_state(strict_gate, credential_gate));

    let v1_routes = Router::new()
        .route("/users/create", post(users::create_user))
        .route("/users/get", post(users::get_user))
        .route("/users/me", get(users::get_current_user))
        .route_layer(from_fn_with_state(lenient_gate, credential_gate))
        .route("/pages/{page_name}", get(users::get_page));

    let mut app = Router::new()
        .route("/auth/wallet", post(auth::wallet_login))
        .merge(acknowledge_routes)
        .nest("/api/v1", v1_routes)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()));

    if let Some(dir) = static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).not_found_service(index));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::wallet_login,
        auth::acknowledge,
        users::create_user,
        users::get_user,
        users::get_current_user,
        users::get_page,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            User,
            SignaturePayload,
            IdTokenResponse,
            CurrentIdentityResponse,
            ExternalClaims,
            SessionClaims,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Auth", description = "Google sign-in and wallet login"),
        (name = "Users", description = "Creator profiles"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
