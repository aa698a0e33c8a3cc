// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod auth;
pub mod user;

pub use auth::{ApiResponse, AuthResponse, AuthTokens, GoogleAuthRequest, LoginRequest, RegisterRequest};
pub use user::{GoogleLink, NewUser, Provider, User, UserProfile};
