// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation guards.

use crate::client::interceptor::Notice;
use crate::client::manager::SessionManager;
use std::sync::Arc;

/// Admits authenticated users, sending everyone else to the login page.
pub struct AuthGuard {
    manager: Arc<SessionManager>,
}

impl AuthGuard {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Allow immediately when the local state says authenticated; otherwise
    /// ask the server. On failure the attempted URL is saved and the user is
    /// redirected to login.
    pub async fn can_activate(&self, url: &str) -> bool {
        if self.manager.is_authenticated() {
            return true;
        }

        if self.manager.check_auth_status().await {
            return true;
        }

        tracing::info!(url, "Access denied; redirecting to login");
        let login_path = &self.manager.config().login_path;
        self.manager.session().save_redirect_url(url, login_path);
        self.manager.navigator().navigate(login_path);
        false
    }
}

/// Keeps authenticated users away from guest-only pages (login, register).
pub struct GuestGuard {
    manager: Arc<SessionManager>,
}

impl GuestGuard {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Authenticated users are sent to the saved redirect URL, or the
    /// default landing page.
    pub fn can_activate(&self) -> bool {
        if !self.manager.is_authenticated() {
            return true;
        }

        let target = self
            .manager
            .session()
            .take_redirect_url()
            .unwrap_or_else(|| self.manager.config().default_landing.clone());
        self.manager.navigator().navigate(&target);
        false
    }
}

/// Admits users holding at least one of the required roles.
pub struct RoleGuard {
    manager: Arc<SessionManager>,
}

impl RoleGuard {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// An empty role list admits everyone. Without a user the guard
    /// redirects to login; with the wrong roles it reports access denied.
    pub fn can_activate(&self, required_roles: &[&str]) -> bool {
        if required_roles.is_empty() {
            return true;
        }

        let Some(user) = self.manager.current_user() else {
            self.manager
                .navigator()
                .navigate(&self.manager.config().login_path);
            return false;
        };

        if required_roles.iter().any(|role| user.has_role(role)) {
            return true;
        }

        tracing::info!(user_id = %user.id, ?required_roles, "Missing required role");
        self.manager.interceptor().notify(Notice::AccessDenied);
        false
    }
}
