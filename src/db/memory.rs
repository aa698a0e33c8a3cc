// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user store for local development and tests.

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{GoogleLink, NewUser, User};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// User store backed by concurrent hash maps.
///
/// `emails` maps email → user id and is the uniqueness constraint: the
/// entry lock on the email key is held while the user is inserted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    emails: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Flip the active flag (administrative operation, used by tests).
    pub fn set_active(&self, user_id: &str, active: bool) -> bool {
        match self.users.get_mut(user_id) {
            Some(mut user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Remove a user entirely.
    pub fn remove(&self, user_id: &str) -> Option<User> {
        let (_, user) = self.users.remove(user_id)?;
        self.emails.remove(&user.email);
        Some(user)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let Some(user_id) = self.emails.get(email).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .map(|u| u.clone()))
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(
                "User already exists with this email".to_string(),
            )),
            Entry::Vacant(slot) => {
                let id = uuid::Uuid::new_v4().to_string();
                let user = User::from_new(new_user, id.clone(), format_utc_rfc3339(chrono::Utc::now()));
                self.users.insert(id.clone(), user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }

    async fn update_refresh_token_hash(
        &self,
        user_id: &str,
        digest: Option<String>,
    ) -> Result<(), AppError> {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.refresh_token_hash = digest;
        }
        Ok(())
    }

    async fn update_last_login(&self, user_id: &str, at: &str) -> Result<(), AppError> {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.last_login = Some(at.to_string());
        }
        Ok(())
    }

    async fn link_google_account(
        &self,
        user_id: &str,
        link: &GoogleLink,
    ) -> Result<Option<User>, AppError> {
        Ok(self.users.get_mut(user_id).map(|mut user| {
            user.apply_google_link(link);
            user.clone()
        }))
    }
}
