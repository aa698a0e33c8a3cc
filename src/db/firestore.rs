// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed user operations.
//!
//! Provides high-level operations for:
//! - Users (profile, password hash, refresh-token slot)
//! - User emails (uniqueness index, one document per email)

use crate::db::{collections, UserStore};
use crate::error::AppError;
use crate::models::{GoogleLink, NewUser, User};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde::{Deserialize, Serialize};

/// Document in `user_emails`, claiming an email for one user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailClaim {
    user_id: String,
}

#[derive(Serialize, Deserialize)]
struct RefreshSlot {
    refresh_token_hash: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct LastLogin {
    last_login: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    fn email_doc_id(email: &str) -> String {
        urlencoding::encode(email).into_owned()
    }

    async fn find_one_by_field(&self, field: &'static str, value: &str) -> Result<Option<User>, AppError> {
        let value = value.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Release an email claim after a failed user insert.
    async fn release_email(&self, email: &str) {
        let result = match self.get_client() {
            Ok(client) => client
                .fluent()
                .delete()
                .from(collections::USER_EMAILS)
                .document_id(Self::email_doc_id(email))
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::error!(error = %e, email, "Failed to release email claim");
        }
    }
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_one_by_field("email", email).await
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        self.find_one_by_field("google_id", google_id).await
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Claim the email in `user_emails` first; the insert fails if the
    /// document already exists, which makes the claim the uniqueness check.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let client = self.get_client()?;
        let id = uuid::Uuid::new_v4().to_string();
        let email = new_user.email.clone();

        let claim = EmailClaim {
            user_id: id.clone(),
        };
        let claimed: Result<EmailClaim, FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::USER_EMAILS)
            .document_id(Self::email_doc_id(&email))
            .object(&claim)
            .execute()
            .await;

        match claimed {
            Ok(_) => {}
            Err(FirestoreError::DataConflictError(_)) => {
                return Err(AppError::Conflict(
                    "User already exists with this email".to_string(),
                ));
            }
            Err(e) => return Err(AppError::Database(e.to_string())),
        }

        let user = User::from_new(new_user, id.clone(), format_utc_rfc3339(chrono::Utc::now()));
        let inserted: Result<User, FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&id)
            .object(&user)
            .execute()
            .await;

        match inserted {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User created");
                Ok(user)
            }
            Err(e) => {
                self.release_email(&email).await;
                Err(AppError::Database(format!("Failed to insert user: {}", e)))
            }
        }
    }

    async fn update_refresh_token_hash(
        &self,
        user_id: &str,
        digest: Option<String>,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["refresh_token_hash"])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&RefreshSlot {
                refresh_token_hash: digest,
            })
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_last_login(&self, user_id: &str, at: &str) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["last_login"])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&LastLogin {
                last_login: at.to_string(),
            })
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch-modify-write restricted to the Google profile fields, so a
    /// concurrent refresh-slot write is not clobbered.
    async fn link_google_account(
        &self,
        user_id: &str,
        link: &GoogleLink,
    ) -> Result<Option<User>, AppError> {
        let Some(mut user) = self.find_by_id(user_id).await? else {
            return Ok(None);
        };
        user.apply_google_link(link);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields([
                "google_id",
                "picture",
                "given_name",
                "family_name",
                "locale",
                "email_verified",
            ])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_id, "Linked Google account");
        Ok(Some(user))
    }
}
