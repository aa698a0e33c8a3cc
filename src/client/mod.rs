// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client side of the auth API.
//!
//! - `storage`: durable key/value storage for the session
//! - `session`: persisted session state mirrored in watch channels
//! - `api`: HTTP calls to the `/auth/*` endpoints
//! - `interceptor`: bearer attachment and 401 handling
//! - `manager`: login/logout/refresh flows over the pieces above
//! - `guard`: navigation guards

pub mod api;
pub mod error;
pub mod guard;
pub mod interceptor;
pub mod manager;
pub mod navigator;
pub mod session;
pub mod storage;

pub use api::AuthApi;
pub use error::{AuthErrorKind, AuthOperation, ClientError};
pub use guard::{AuthGuard, GuestGuard, RoleGuard};
pub use interceptor::{Interceptor, LatchState, Notice};
pub use manager::SessionManager;
pub use navigator::{HistoryNavigator, Navigator};
pub use session::SessionState;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

use std::time::Duration;

/// Server endpoint paths, relative to the API base URL.
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const GOOGLE: &str = "/auth/google";
    pub const REFRESH: &str = "/auth/refresh";
    pub const LOGOUT: &str = "/auth/logout";
    pub const VERIFY: &str = "/auth/verify";
    pub const ME: &str = "/auth/me";
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the auth server, without a trailing slash
    pub api_base_url: String,
    /// Google OAuth client id sent with Google credentials
    pub google_client_id: String,
    /// Route of the login page
    pub login_path: String,
    /// Where authenticated users land when there is no saved redirect
    pub default_landing: String,
    /// How long the 401 handler stays latched after redirecting
    pub logout_cooldown: Duration,
    /// How long to wait for a Google popup credential
    pub google_popup_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            google_client_id: String::new(),
            login_path: "/login".to_string(),
            default_landing: "/dashboard".to_string(),
            logout_cooldown: Duration::from_secs(1),
            google_popup_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_google_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.google_client_id = client_id.into();
        self
    }
}
