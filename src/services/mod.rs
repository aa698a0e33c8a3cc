// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod google_oidc;
pub mod password;
pub mod token;

pub use auth::AuthService;
pub use google_oidc::{GoogleIdentity, GoogleOidcVerifier, GoogleTokenVerifier, OidcError};
pub use token::{Claims, TokenError, TokenIssuer};
