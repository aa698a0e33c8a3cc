//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Default role granted to every new account.
pub const DEFAULT_ROLE: &str = "user";

/// Origin of an account's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Email + password account
    #[default]
    Local,
    /// Google Sign-In account
    Google,
}

/// User record stored in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Generated UUID (also used as document ID)
    pub id: String,
    /// Email address, unique across all users
    pub email: String,
    /// Display name
    pub name: String,
    /// bcrypt hash; absent for Google-only accounts
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Google subject id, once linked
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// SHA-256 digest of the single currently valid refresh token
    #[serde(default)]
    pub refresh_token_hash: Option<String>,
    /// Last successful login (RFC 3339)
    #[serde(default)]
    pub last_login: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
}

fn default_roles() -> Vec<String> {
    vec![DEFAULT_ROLE.to_string()]
}

fn default_active() -> bool {
    true
}

impl User {
    /// Build a fresh record from creation data, assigning id and defaults.
    pub fn from_new(new_user: NewUser, id: String, created_at: String) -> Self {
        Self {
            id,
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            google_id: new_user.google_id,
            provider: new_user.provider,
            picture: new_user.picture,
            given_name: new_user.given_name,
            family_name: new_user.family_name,
            locale: new_user.locale,
            email_verified: new_user.email_verified,
            roles: default_roles(),
            is_active: true,
            refresh_token_hash: None,
            last_login: None,
            created_at,
        }
    }

    /// Merge Google profile data into this record.
    ///
    /// Password hash and provider are left untouched, so a linked local
    /// account keeps working with its password.
    pub fn apply_google_link(&mut self, link: &GoogleLink) {
        self.google_id = Some(link.google_id.clone());
        if link.picture.is_some() {
            self.picture = link.picture.clone();
        }
        if link.given_name.is_some() {
            self.given_name = link.given_name.clone();
        }
        if link.family_name.is_some() {
            self.family_name = link.family_name.clone();
        }
        if link.locale.is_some() {
            self.locale = link.locale.clone();
        }
        if let Some(verified) = link.email_verified {
            self.email_verified = verified;
        }
    }
}

/// Data needed to create a user. The store assigns id and timestamps.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub provider: Provider,
    pub picture: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub locale: Option<String>,
    pub email_verified: bool,
}

/// Google profile fields merged into an existing account on first Google login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleLink {
    pub google_id: String,
    pub picture: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub locale: Option<String>,
    pub email_verified: Option<bool>,
}

/// Public user profile returned by the API (no password or token fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl UserProfile {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .as_ref()
            .is_some_and(|roles| roles.iter().any(|r| r == role))
    }
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
            locale: user.locale.clone(),
            verified_email: Some(user.email_verified),
            roles: Some(user.roles.clone()),
        }
    }
}
