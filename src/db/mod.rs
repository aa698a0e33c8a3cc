//! Credential store: user records behind find/create/update operations.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{GoogleLink, NewUser, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness index (document id = url-encoded email)
    pub const USER_EMAILS: &str = "user_emails";
}

/// Persistent user records.
///
/// Each update touches a single document and is applied atomically by the
/// backend; there are no multi-document transactions in the auth flow.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Insert a new user. Fails with `AppError::Conflict` if the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Overwrite the refresh-token slot (`None` clears it).
    async fn update_refresh_token_hash(
        &self,
        user_id: &str,
        digest: Option<String>,
    ) -> Result<(), AppError>;

    async fn update_last_login(&self, user_id: &str, at: &str) -> Result<(), AppError>;

    /// Merge Google profile data into a user, returning the updated record.
    async fn link_google_account(
        &self,
        user_id: &str,
        link: &GoogleLink,
    ) -> Result<Option<User>, AppError>;
}
