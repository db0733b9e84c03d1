// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! User endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::{Auth, IdentityClaims};
use crate::error::ApiError;
use crate::models::{CurrentIdentityResponse, User};
use crate::state::AppState;
use crate::store::{StoreError, UserKey};

/// Create the profile of the authenticated user.
///
/// Identity fields (`email`, `name`, `walletPublicAddress`) come from the
/// verified credential, never from the body.
#[utoipa::path(
    post,
    path = "/api/v1/users/create",
    tag = "Users",
    request_body = User,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User created", body = User),
        (status = 400, description = "Body could not be decoded"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 409, description = "Email, wallet or page name already taken"),
        (status = 422, description = "Credential carries no email or wallet address"),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    if UserKey::for_identity(&identity).is_none() {
        tracing::warn!(subject = identity.subject_key(), "Credential has no user key");
        return Err(ApiError::unprocessable(
            "Credential carries no email or wallet address",
        ));
    }

    let mut user: User = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Couldn't decode user: {e}")))?;

    user.bind_identity(&identity);
    user.id = state.users.create(user.clone())?;

    tracing::info!(
        user_id = %user.id,
        subject = identity.subject_key(),
        page_name = %user.page_name,
        "User created"
    );
    Ok(Json(user))
}

/// Get the stored profile of the authenticated user.
///
/// Answers `{}` when the user has no profile yet.
#[utoipa::path(
    post,
    path = "/api/v1/users/get",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile, or `{}` when none exists", body = User),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Response, ApiError> {
    let Some(key) = UserKey::for_identity(&identity) else {
        tracing::debug!(subject = identity.subject_key(), "Credential has no user key");
        return Ok(Json(serde_json::json!({})).into_response());
    };

    match state.users.read(&key) {
        Ok(user) => Ok(Json(user).into_response()),
        Err(StoreError::NotFound) => {
            tracing::debug!(subject = identity.subject_key(), "No profile for user");
            Ok(Json(serde_json::json!({})).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Get the current authenticated identity.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Identity information", body = CurrentIdentityResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(identity): Auth) -> Json<CurrentIdentityResponse> {
    Json(CurrentIdentityResponse::from(&identity))
}

/// Get a public profile by page name.
#[utoipa::path(
    get,
    path = "/api/v1/pages/{page_name}",
    tag = "Users",
    params(("page_name" = String, Path, description = "Public page slug")),
    responses(
        (status = 200, description = "User profile", body = User),
        (status = 404, description = "No user with this page name"),
    )
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(page_name): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.read(&UserKey::PageName(page_name))?;
    Ok(Json(user))
}
