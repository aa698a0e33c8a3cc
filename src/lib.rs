// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Authgate: account registration, password and Google login, and
//! access/refresh token lifecycle.
//!
//! The server half exposes the `/auth/*` HTTP API; the `client` module holds
//! the session-side pieces (persisted session state, API client, request
//! interceptor and route guards) that consume it.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserStore;
use services::AuthService;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn UserStore>,
        google: Arc<dyn services::GoogleTokenVerifier>,
    ) -> Self {
        let auth = AuthService::new(&config, store.clone(), google);
        Self {
            config,
            store,
            auth,
        }
    }
}
