// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outgoing request decoration and error-response handling.

use crate::client::endpoints;
use crate::client::navigator::Navigator;
use crate::client::session::SessionState;
use crate::client::ClientConfig;
use reqwest::{RequestBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Endpoints that never get the stored access token attached. Refresh sends
/// its own token.
const PUBLIC_ENDPOINTS: [&str; 4] = [
    endpoints::LOGIN,
    endpoints::REGISTER,
    endpoints::GOOGLE,
    endpoints::REFRESH,
];

/// Endpoints whose errors are left to the caller, so a failing logout or
/// refresh cannot trigger another logout.
const AUTH_ENDPOINTS: [&str; 6] = [
    endpoints::LOGIN,
    endpoints::REGISTER,
    endpoints::GOOGLE,
    endpoints::REFRESH,
    endpoints::LOGOUT,
    endpoints::VERIFY,
];

/// User-facing notification emitted for failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SessionExpired,
    AccessDenied,
    NotFound,
    ValidationFailed,
    ServerError,
    NetworkError,
    Unexpected,
}

/// State of the 401 logout-and-redirect sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Idle,
    Handling,
}

pub struct Interceptor {
    session: Arc<SessionState>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    cooldown: Duration,
    latch: Arc<Mutex<LatchState>>,
    notices: broadcast::Sender<Notice>,
}

fn endpoint_path(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

impl Interceptor {
    pub fn new(
        config: &ClientConfig,
        session: Arc<SessionState>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (notices, _) = broadcast::channel(16);
        Self {
            session,
            navigator,
            login_path: config.login_path.clone(),
            cooldown: config.logout_cooldown,
            latch: Arc::new(Mutex::new(LatchState::Idle)),
            notices,
        }
    }

    pub fn is_public_endpoint(path: &str) -> bool {
        PUBLIC_ENDPOINTS.contains(&endpoint_path(path))
    }

    pub fn is_auth_endpoint(path: &str) -> bool {
        AUTH_ENDPOINTS.contains(&endpoint_path(path))
    }

    /// Attach `Authorization: Bearer` when the endpoint is not public and a
    /// token is stored.
    pub fn authorize(&self, path: &str, request: RequestBuilder) -> RequestBuilder {
        if Self::is_public_endpoint(path) {
            return request;
        }
        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub async fn latch_state(&self) -> LatchState {
        *self.latch.lock().await
    }

    /// React to a non-success response.
    pub async fn on_error_status(&self, path: &str, status: StatusCode) {
        if Self::is_auth_endpoint(path) {
            tracing::debug!(path, status = status.as_u16(), "Leaving auth endpoint error to caller");
            return;
        }

        let notice = match status.as_u16() {
            401 => {
                self.handle_unauthorized().await;
                return;
            }
            403 => Notice::AccessDenied,
            404 => Notice::NotFound,
            422 => Notice::ValidationFailed,
            s if s >= 500 => Notice::ServerError,
            _ => Notice::Unexpected,
        };
        tracing::warn!(path, status = status.as_u16(), "Request failed");
        self.notify(notice);
    }

    /// React to a request that never got a response.
    pub fn on_transport_error(&self, path: &str) {
        if !Self::is_auth_endpoint(path) {
            self.notify(Notice::NetworkError);
        }
    }

    /// Clear the session and send the user to the login page, at most once
    /// per cool-down period.
    async fn handle_unauthorized(&self) {
        {
            let mut latch = self.latch.lock().await;
            if *latch == LatchState::Handling {
                tracing::debug!("Already handling logout, skipping");
                return;
            }
            *latch = LatchState::Handling;
        }

        tracing::info!("Unauthorized response; clearing session");
        self.session.clear();

        let current = self.navigator.current_url();
        if current != self.login_path {
            self.session.save_redirect_url(&current, &self.login_path);
            self.notify(Notice::SessionExpired);
        }

        self.navigator.navigate(&self.login_path);

        let latch = self.latch.clone();
        let cooldown = self.cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            *latch.lock().await = LatchState::Idle;
        });
    }

    pub(crate) fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}
