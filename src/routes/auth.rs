// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: register, password and Google login, token
//! refresh, logout and current-user lookups.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::headers::authorization::{Authorization, Bearer};
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::TypedHeader;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{bearer_token, AuthUser};
use crate::models::{
    ApiResponse, AuthResponse, GoogleAuthRequest, LoginRequest, RegisterRequest, UserProfile,
};
use crate::AppState;

/// Endpoints reachable without an access token.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/refresh", post(refresh))
}

/// Endpoints behind `require_auth`.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/verify", get(verify))
        .route("/auth/me", get(me))
}

/// Unwrap a JSON body, reporting malformed input in the response envelope.
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

async fn register(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let result = state.auth.register(json_body(payload)?).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(result, "User registered successfully")),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthResponse>>> {
    let result = state.auth.login(json_body(payload)?).await?;
    Ok(Json(ApiResponse::ok(result, "Login successful")))
}

async fn google_login(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<GoogleAuthRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthResponse>>> {
    let result = state.auth.login_with_google(json_body(payload)?).await?;
    Ok(Json(ApiResponse::ok(
        result,
        "Google authentication successful",
    )))
}

/// The refresh token arrives as the bearer credential.
async fn refresh(
    State(state): State<Arc<AppState>>,
    header: std::result::Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
) -> Result<Json<ApiResponse<AuthResponse>>> {
    let presented = bearer_token(header)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;
    let result = state.auth.refresh(&presented).await?;
    Ok(Json(ApiResponse::ok(result, "Tokens refreshed successfully")))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<()>>> {
    state.auth.logout(&user.user_id).await?;
    Ok(Json(ApiResponse::empty("Logout successful")))
}

async fn verify(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let profile = state.auth.current_user(&user.user_id).await?;
    Ok(Json(ApiResponse::ok(profile, "Valid token")))
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let profile = state.auth.current_user(&user.user_id).await?;
    Ok(Json(ApiResponse::ok(profile, "User data retrieved")))
}
