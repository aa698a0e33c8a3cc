// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager: the auth flows the UI calls.

use crate::client::api::AuthApi;
use crate::client::error::{AuthErrorKind, ClientError};
use crate::client::interceptor::Interceptor;
use crate::client::navigator::Navigator;
use crate::client::session::SessionState;
use crate::client::storage::SessionStorage;
use crate::client::ClientConfig;
use crate::models::{AuthResponse, GoogleAuthRequest, LoginRequest, RegisterRequest, UserProfile};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

pub struct SessionManager {
    config: ClientConfig,
    session: Arc<SessionState>,
    interceptor: Arc<Interceptor>,
    api: Arc<AuthApi>,
    navigator: Arc<dyn Navigator>,
}

impl SessionManager {
    /// Wire up session state, interceptor and API client. The session is
    /// restored from `storage`.
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = Arc::new(SessionState::new(storage));
        let interceptor = Arc::new(Interceptor::new(
            &config,
            session.clone(),
            navigator.clone(),
        ));
        let api = Arc::new(AuthApi::new(&config, interceptor.clone()));

        Self {
            config,
            session,
            interceptor,
            api,
            navigator,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn interceptor(&self) -> &Arc<Interceptor> {
        &self.interceptor
    }

    pub fn api(&self) -> &Arc<AuthApi> {
        &self.api
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.session.current_user()
    }

    pub fn token(&self) -> Option<String> {
        self.session.access_token()
    }

    pub fn subscribe_user(&self) -> watch::Receiver<Option<UserProfile>> {
        self.session.subscribe_user()
    }

    pub fn subscribe_authenticated(&self) -> watch::Receiver<bool> {
        self.session.subscribe_authenticated()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.session.subscribe_loading()
    }

    /// Password login. The email is trimmed and lowercased before sending.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<UserProfile, ClientError> {
        let req = LoginRequest {
            email: normalize_email(email),
            password: password.to_string(),
            remember_me,
        };
        self.authenticate(self.api.login(&req)).await
    }

    /// Create an account. The email is normalized the same way as for
    /// `login`, so the same credentials work for both.
    pub async fn register(&self, req: &RegisterRequest) -> Result<UserProfile, ClientError> {
        let req = RegisterRequest {
            email: normalize_email(&req.email),
            ..req.clone()
        };
        self.authenticate(self.api.register(&req)).await
    }

    pub async fn login_with_google(
        &self,
        credential: &str,
        client_id: &str,
    ) -> Result<UserProfile, ClientError> {
        let req = GoogleAuthRequest {
            credential: credential.to_string(),
            client_id: client_id.to_string(),
        };
        self.authenticate(self.api.login_with_google(&req)).await
    }

    /// Google sign-in through a popup that eventually yields a credential
    /// (`None` when the user dismisses it).
    ///
    /// If no credential arrives within the popup timeout the attempt is
    /// abandoned and the loading flag is reset.
    pub async fn login_with_google_popup<F>(&self, popup: F) -> Result<UserProfile, ClientError>
    where
        F: Future<Output = Option<String>>,
    {
        self.session.set_loading(true);

        let credential = match tokio::time::timeout(self.config.google_popup_timeout, popup).await
        {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                self.session.set_loading(false);
                return Err(ClientError::new(
                    AuthErrorKind::GoogleAuthError,
                    "Google sign-in was cancelled",
                ));
            }
            Err(_) => {
                tracing::warn!("Google popup timed out");
                self.session.set_loading(false);
                return Err(ClientError::new(
                    AuthErrorKind::GoogleAuthError,
                    "Google sign-in timed out",
                ));
            }
        };

        let client_id = self.config.google_client_id.clone();
        self.login_with_google(&credential, &client_id).await
    }

    /// Exchange the stored refresh token. Any failure clears the session.
    pub async fn refresh_token(&self) -> bool {
        let Some(refresh_token) = self.session.refresh_token() else {
            self.session.clear();
            return false;
        };

        match self.api.refresh_token(&refresh_token).await {
            Ok(response) => match self.session.apply_auth(&response.user, &response.tokens) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist refreshed session");
                    self.session.clear();
                    false
                }
            },
            Err(e) => {
                tracing::info!(kind = ?e.kind, "Refresh token rejected");
                self.session.clear();
                false
            }
        }
    }

    /// Decide whether the stored session is still good.
    ///
    /// An expired token gets one silent refresh. A live token is verified
    /// with the server, and a failed verification also falls back to a
    /// single refresh attempt.
    pub async fn check_auth_status(&self) -> bool {
        if self.session.access_token().is_none() {
            self.session.clear();
            return false;
        }

        if self.session.is_expired() {
            tracing::debug!("Access token expired; attempting refresh");
            return self.refresh_token().await;
        }

        match self.api.verify_token().await {
            Ok(user) => {
                self.session.set_user(user);
                true
            }
            Err(e) => {
                tracing::debug!(kind = ?e.kind, "Token verification failed; attempting refresh");
                self.refresh_token().await
            }
        }
    }

    /// Log out without waiting for the server.
    ///
    /// Local state is cleared immediately; the server call runs in the
    /// background and its outcome is only logged.
    pub fn logout(&self) {
        let api = self.api.clone();
        let request = api.logout_request();
        self.session.clear();

        tokio::spawn(async move {
            match api.send_logout(request).await {
                Ok(()) => tracing::debug!("Backend logout successful"),
                Err(e) => tracing::debug!(kind = ?e.kind, "Backend logout failed"),
            }
        });
    }

    /// Log out, waiting for the server. Local state is cleared whatever the
    /// outcome.
    pub async fn logout_secure(&self) {
        match self.api.logout().await {
            Ok(()) => tracing::info!("Logout acknowledged by backend"),
            Err(e) => match e.kind {
                AuthErrorKind::Unauthorized => {
                    tracing::info!("Token already invalid; logging out locally")
                }
                AuthErrorKind::ServerError | AuthErrorKind::NetworkError => {
                    tracing::warn!(kind = ?e.kind, "Backend unreachable; forcing local logout")
                }
                _ => tracing::warn!(kind = ?e.kind, "Unexpected logout failure; logging out locally"),
            },
        }
        self.session.clear();
    }

    /// Run an auth call, storing the session on success. The loading flag is
    /// raised for the duration of the call.
    async fn authenticate<Fut>(&self, call: Fut) -> Result<UserProfile, ClientError>
    where
        Fut: Future<Output = Result<AuthResponse, ClientError>>,
    {
        self.session.set_loading(true);

        let result = match call.await {
            Ok(response) => self
                .session
                .apply_auth(&response.user, &response.tokens)
                .map(|()| response.user)
                .map_err(|e| ClientError::unexpected(e.to_string())),
            Err(e) => {
                tracing::info!(kind = ?e.kind, status = ?e.status, "Authentication failed");
                Err(e)
            }
        };

        self.session.set_loading(false);
        result
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
