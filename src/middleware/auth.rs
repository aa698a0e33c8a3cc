// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::authorization::{Authorization, Bearer};
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::TypedHeader;
use std::sync::Arc;

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Bearer credential from an `Authorization` header extraction result.
pub fn bearer_token(
    header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
) -> Result<String, AppError> {
    match header {
        Ok(TypedHeader(Authorization(bearer))) if !bearer.token().is_empty() => {
            Ok(bearer.token().to_string())
        }
        _ => Err(AppError::Unauthorized("Missing bearer token".to_string())),
    }
}

/// Middleware that requires a valid access token.
///
/// Only signature and expiry are checked; the user record is not consulted.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(header)?;

    let claims = state
        .auth
        .tokens()
        .verify(&token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    request
        .extensions_mut()
        .insert(AuthUser { user_id: claims.sub });

    Ok(next.run(request).await)
}
