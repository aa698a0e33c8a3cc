// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client session state.
//!
//! The session lives in two places: durable storage (so it survives a
//! restart) and three watch channels (user, authenticated, loading) that UI
//! code subscribes to. Storage is written first, then the channels.
//!
//! Concurrent auth calls are not coalesced: whichever `apply_auth` runs last
//! determines the stored session.

use crate::client::storage::{keys, SessionStorage, StorageError};
use crate::config::MAX_TOKEN_TTL;
use crate::models::{AuthTokens, UserProfile};
use std::sync::Arc;
use tokio::sync::watch;

pub struct SessionState {
    storage: Arc<dyn SessionStorage>,
    user: watch::Sender<Option<UserProfile>>,
    authenticated: watch::Sender<bool>,
    loading: watch::Sender<bool>,
}

impl SessionState {
    /// Restore state from storage.
    ///
    /// A session is restored only when both an access token and parseable
    /// user data are present; anything partial is cleared.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let state = Self {
            storage,
            user: watch::Sender::new(None),
            authenticated: watch::Sender::new(false),
            loading: watch::Sender::new(false),
        };

        let token = state.storage.get(keys::ACCESS_TOKEN);
        let user_data = state.storage.get(keys::USER_DATA);

        match (token, user_data) {
            (Some(_), Some(data)) => match serde_json::from_str::<UserProfile>(&data) {
                Ok(user) => {
                    tracing::debug!(user_id = %user.id, "Restored session from storage");
                    state.user.send_replace(Some(user));
                    state.authenticated.send_replace(true);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stored user data is unreadable; clearing session");
                    state.clear();
                }
            },
            _ => state.clear(),
        }

        state
    }

    /// Persist a successful authentication and publish it.
    pub fn apply_auth(&self, user: &UserProfile, tokens: &AuthTokens) -> Result<(), StorageError> {
        let expires_at = expiry_after(now_millis(), tokens.expires_in);

        self.storage.set(keys::ACCESS_TOKEN, &tokens.access_token)?;
        if let Some(refresh) = tokens.refresh_token.as_deref() {
            self.storage.set(keys::REFRESH_TOKEN, refresh)?;
        }
        self.storage.set(keys::EXPIRES_AT, &expires_at.to_string())?;
        self.storage
            .set(keys::USER_DATA, &serde_json::to_string(user)?)?;

        self.user.send_replace(Some(user.clone()));
        self.authenticated.send_replace(true);
        Ok(())
    }

    /// Publish a user confirmed by the server without touching storage.
    pub fn set_user(&self, user: UserProfile) {
        self.user.send_replace(Some(user));
        self.authenticated.send_replace(true);
    }

    /// Remove all auth keys and publish the logged-out state.
    ///
    /// Storage failures are logged; the in-memory state is always reset.
    pub fn clear(&self) {
        for key in keys::AUTH_KEYS {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove session key");
            }
        }
        self.user.send_replace(None);
        self.authenticated.send_replace(false);
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(keys::REFRESH_TOKEN)
    }

    /// Access token expiry in epoch milliseconds.
    pub fn expires_at(&self) -> Option<i64> {
        self.storage
            .get(keys::EXPIRES_AT)
            .and_then(|raw| raw.parse().ok())
    }

    /// True when the expiry is missing, unreadable or in the past.
    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(at) => now_millis() >= at,
            None => true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.borrow()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.user.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.send_replace(loading);
    }

    pub fn subscribe_user(&self) -> watch::Receiver<Option<UserProfile>> {
        self.user.subscribe()
    }

    pub fn subscribe_authenticated(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Remember the page to resume after login. The login page itself is ignored.
    pub fn save_redirect_url(&self, url: &str, login_path: &str) {
        if url == login_path {
            return;
        }
        if let Err(e) = self.storage.set(keys::REDIRECT_URL, url) {
            tracing::warn!(error = %e, "Failed to save redirect URL");
        }
    }

    /// Take (and forget) the saved redirect URL.
    pub fn take_redirect_url(&self) -> Option<String> {
        let url = self.storage.get(keys::REDIRECT_URL)?;
        if let Err(e) = self.storage.remove(keys::REDIRECT_URL) {
            tracing::warn!(error = %e, "Failed to remove redirect URL");
        }
        Some(url)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Expiry instant in epoch millis. Lifetimes beyond the server's maximum
/// token lifetime are clamped to it.
fn expiry_after(now_millis: i64, expires_in_secs: u64) -> i64 {
    let secs = expires_in_secs.min(MAX_TOKEN_TTL.as_secs());
    // `secs` is at most a year, so the product fits in an i64.
    now_millis.saturating_add(secs as i64 * 1000)
}
