// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side authentication flows.
//!
//! Each operation is a single pass against the user store: look up, check,
//! issue a token pair and persist the digest of the new refresh token. The
//! refresh slot holds one digest per user, so every login or refresh
//! invalidates the refresh token issued before it.

use crate::config::Config;
use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::models::{
    AuthResponse, AuthTokens, GoogleAuthRequest, GoogleLink, LoginRequest, NewUser, Provider,
    RegisterRequest, User, UserProfile,
};
use crate::services::google_oidc::{GoogleIdentity, GoogleTokenVerifier};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{digest_matches, refresh_token_digest, TokenIssuer};
use crate::time_utils::format_utc_rfc3339;
use std::sync::Arc;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    google: Arc<dyn GoogleTokenVerifier>,
    bcrypt_cost: u32,
    google_client_id: Option<String>,
}

impl AuthService {
    pub fn new(
        config: &Config,
        store: Arc<dyn UserStore>,
        google: Arc<dyn GoogleTokenVerifier>,
    ) -> Self {
        Self {
            store,
            tokens: TokenIssuer::from_config(config),
            google,
            bcrypt_cost: config.bcrypt_cost,
            google_client_id: config.google_client_id.clone(),
        }
    }

    /// Token issuer shared with the bearer middleware.
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create a local account and sign it in.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse> {
        req.validate()?;

        if self.store.find_by_email(&req.email).await?.is_some() {
            return Err(AppError::Conflict(
                "User already exists with this email".to_string(),
            ));
        }

        let password_hash = hash_password(&req.password, self.bcrypt_cost).await?;

        // The store re-checks uniqueness, so a racing registration still gets Conflict.
        let user = self
            .store
            .create(NewUser {
                email: req.email,
                name: req.name,
                password_hash: Some(password_hash),
                provider: Provider::Local,
                email_verified: false,
                ..Default::default()
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        let tokens = self.issue_and_store(&user).await?;
        Ok(auth_response(&user, tokens, "User registered successfully"))
    }

    /// Email + password login.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        req.validate()?;

        let Some(user) = self.store.find_by_email(&req.email).await? else {
            tracing::debug!("Login for unknown email");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let Some(password_hash) = user.password_hash.as_deref() else {
            return Err(AppError::BadRequest(
                "This user must sign in with Google".to_string(),
            ));
        };

        if !verify_password(&req.password, password_hash).await? {
            tracing::info!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Login to disabled account");
            return Err(AppError::Unauthorized("Account disabled".to_string()));
        }

        self.touch_last_login(&user.id).await?;
        let tokens = self.issue_and_store(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(auth_response(&user, tokens, "Login successful"))
    }

    /// Sign in with a Google ID token, linking or creating the account.
    ///
    /// Every failure in this flow surfaces as `BadRequest` with the cause
    /// appended to the message. Store and internal errors are logged and
    /// reported without detail.
    pub async fn login_with_google(&self, req: GoogleAuthRequest) -> Result<AuthResponse> {
        self.google_flow(req).await.map_err(|e| {
            let cause = match &e {
                AppError::Database(_) | AppError::Internal(_) => {
                    tracing::error!(error = %e, "Google login failed");
                    "internal error".to_string()
                }
                other => {
                    tracing::info!(error = %other, "Google login rejected");
                    other.to_string()
                }
            };
            AppError::BadRequest(format!("Error validating Google token: {cause}"))
        })
    }

    async fn google_flow(&self, req: GoogleAuthRequest) -> Result<AuthResponse> {
        req.validate()?;

        if let Some(expected) = &self.google_client_id {
            if expected != &req.client_id {
                return Err(AppError::BadRequest("client id mismatch".to_string()));
            }
        }

        let identity = self
            .google
            .verify(&req.credential, &req.client_id)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let user = self.resolve_google_user(identity).await?;

        self.touch_last_login(&user.id).await?;
        let tokens = self.issue_and_store(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in with Google");
        Ok(auth_response(&user, tokens, "Google login successful"))
    }

    /// Find the account for a Google identity: email first, then subject id.
    async fn resolve_google_user(&self, identity: GoogleIdentity) -> Result<User> {
        let email = identity
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::BadRequest("Google account has no email".to_string()))?;

        let existing = match self.store.find_by_email(&email).await? {
            Some(user) => Some(user),
            None => self.store.find_by_google_id(&identity.subject).await?,
        };

        match existing {
            Some(user) if user.google_id.is_some() => Ok(user),
            Some(user) => {
                let link = GoogleLink {
                    google_id: identity.subject,
                    picture: identity.picture,
                    given_name: identity.given_name,
                    family_name: identity.family_name,
                    locale: identity.locale,
                    email_verified: identity.email_verified,
                };
                self.store
                    .link_google_account(&user.id, &link)
                    .await?
                    .ok_or_else(|| {
                        AppError::BadRequest("Error processing Google data".to_string())
                    })
            }
            None => {
                let name = identity
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| email.clone());
                self.store
                    .create(NewUser {
                        email,
                        name,
                        password_hash: None,
                        google_id: Some(identity.subject),
                        provider: Provider::Google,
                        picture: identity.picture,
                        given_name: identity.given_name,
                        family_name: identity.family_name,
                        locale: identity.locale,
                        email_verified: identity.email_verified.unwrap_or(false),
                    })
                    .await
            }
        }
    }

    /// Exchange the current refresh token for a new pair (rotation).
    pub async fn refresh(&self, presented: &str) -> Result<AuthResponse> {
        let claims = self
            .tokens
            .verify(presented)
            .map_err(|_| AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

        let Some(user) = self.store.find_by_id(&claims.sub).await? else {
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
        };

        let current = user.refresh_token_hash.as_deref().unwrap_or_default();
        if !digest_matches(current, presented) {
            tracing::info!(user_id = %user.id, "Stale or revoked refresh token presented");
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
        }

        let tokens = self.issue_and_store(&user).await?;
        tracing::debug!(user_id = %user.id, "Tokens refreshed");
        Ok(auth_response(&user, tokens, "Tokens refreshed successfully"))
    }

    /// Clear the refresh slot. Access tokens stay valid until they expire.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        self.store.update_refresh_token_hash(user_id, None).await?;
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    pub async fn current_user(&self, user_id: &str) -> Result<UserProfile> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(|user| UserProfile::from(&user))
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))
    }

    async fn issue_and_store(&self, user: &User) -> Result<AuthTokens> {
        let tokens = self
            .tokens
            .issue(&user.id, &user.email, &user.roles)
            .map_err(|e| AppError::Internal(e.into()))?;

        let digest = tokens.refresh_token.as_deref().map(refresh_token_digest);
        self.store
            .update_refresh_token_hash(&user.id, digest)
            .await?;

        Ok(tokens)
    }

    async fn touch_last_login(&self, user_id: &str) -> Result<()> {
        let now = format_utc_rfc3339(chrono::Utc::now());
        self.store.update_last_login(user_id, &now).await
    }
}

fn auth_response(user: &User, tokens: AuthTokens, message: &str) -> AuthResponse {
    AuthResponse {
        user: UserProfile::from(user),
        tokens,
        message: Some(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::google_oidc::OidcError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Verifier that accepts a fixed set of credentials.
    #[derive(Default)]
    struct FakeGoogle {
        identities: HashMap<String, GoogleIdentity>,
    }

    impl FakeGoogle {
        fn with(mut self, credential: &str, subject: &str, email: &str) -> Self {
            self.identities.insert(
                credential.to_string(),
                GoogleIdentity {
                    subject: subject.to_string(),
                    email: Some(email.to_string()),
                    email_verified: Some(true),
                    name: Some("Google Ann".to_string()),
                    picture: Some("https://example.com/ann.png".to_string()),
                    given_name: Some("Ann".to_string()),
                    family_name: Some("Lee".to_string()),
                    locale: Some("en".to_string()),
                },
            );
            self
        }
    }

    #[async_trait]
    impl GoogleTokenVerifier for FakeGoogle {
        async fn verify(
            &self,
            credential: &str,
            audience: &str,
        ) -> std::result::Result<GoogleIdentity, OidcError> {
            if audience != "client-1" {
                return Err(OidcError::Invalid("audience mismatch".to_string()));
            }
            self.identities
                .get(credential)
                .cloned()
                .ok_or_else(|| OidcError::Invalid("bad signature".to_string()))
        }
    }

    fn service_with(google: FakeGoogle) -> (AuthService, MemoryStore) {
        let store = MemoryStore::new();
        let service = AuthService::new(
            &Config::test_default(),
            Arc::new(store.clone()),
            Arc::new(google),
        );
        (service, store)
    }

    fn service() -> (AuthService, MemoryStore) {
        service_with(FakeGoogle::default())
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: "Ann".to_string(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            remember_me: false,
        }
    }

    fn google_req(credential: &str) -> GoogleAuthRequest {
        GoogleAuthRequest {
            credential: credential.to_string(),
            client_id: "client-1".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (svc, store) = service();
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        assert_eq!(registered.user.email, "a@x.com");
        assert_eq!(registered.user.roles, Some(vec!["user".to_string()]));
        assert_eq!(registered.user.verified_email, Some(false));

        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.provider, Provider::Local);
        assert_ne!(stored.password_hash.as_deref(), Some("secret1"));
        assert!(stored.refresh_token_hash.is_some());

        let logged_in = svc.login(login_req("a@x.com", "secret1")).await.unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
        assert_eq!(logged_in.message.as_deref(), Some("Login successful"));

        let stored = store.find_by_id(&registered.user.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (svc, _) = service();
        svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        let err = svc
            .register(register_req("a@x.com", "another"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn invalid_registration_is_bad_request() {
        let (svc, store) = service();
        let err = svc.register(register_req("not-an-email", "123")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_unauthorized() {
        let (svc, _) = service();
        svc.register(register_req("a@x.com", "secret1")).await.unwrap();

        let err = svc.login(login_req("a@x.com", "wrong")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid credentials"));

        let err = svc.login(login_req("b@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid credentials"));
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() {
        let (svc, _) = service();
        svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        let err = svc.login(login_req("A@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn google_only_account_cannot_use_password() {
        let (svc, _) = service_with(FakeGoogle::default().with("cred", "g-1", "g@x.com"));
        svc.login_with_google(google_req("cred")).await.unwrap();

        let err = svc.login(login_req("g@x.com", "anything")).await.unwrap_err();
        assert!(
            matches!(err, AppError::BadRequest(ref m) if m == "This user must sign in with Google")
        );
    }

    #[tokio::test]
    async fn disabled_account_is_unauthorized() {
        let (svc, store) = service();
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        assert!(store.set_active(&registered.user.id, false));

        let err = svc.login(login_req("a@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Account disabled"));
    }

    #[tokio::test]
    async fn access_token_subject_is_user_id() {
        let (svc, _) = service();
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        let claims = svc.tokens().verify(&registered.tokens.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.roles, vec!["user".to_string()]);
    }

    #[tokio::test]
    async fn refresh_rotates_and_rejects_previous_token() {
        let (svc, _) = service();
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        let rt1 = registered.tokens.refresh_token.unwrap();

        let refreshed = svc.refresh(&rt1).await.unwrap();
        let rt2 = refreshed.tokens.refresh_token.unwrap();
        assert_ne!(rt1, rt2);

        let err = svc.refresh(&rt1).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid refresh token"));

        assert!(svc.refresh(&rt2).await.is_ok());
    }

    #[tokio::test]
    async fn new_login_invalidates_older_refresh_token() {
        let (svc, _) = service();
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        let old = registered.tokens.refresh_token.unwrap();

        svc.login(login_req("a@x.com", "secret1")).await.unwrap();
        assert!(svc.refresh(&old).await.is_err());
    }

    #[tokio::test]
    async fn refresh_for_deleted_user_is_unauthorized() {
        let (svc, store) = service();
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        store.remove(&registered.user.id);

        let err = svc
            .refresh(registered.tokens.refresh_token.as_deref().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn garbage_refresh_token_is_unauthorized() {
        let (svc, _) = service();
        assert!(matches!(
            svc.refresh("nope").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn logout_revokes_refresh_but_not_access() {
        let (svc, _) = service();
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        svc.logout(&registered.user.id).await.unwrap();

        let err = svc
            .refresh(registered.tokens.refresh_token.as_deref().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        // Access token is stateless and still verifies.
        let claims = svc.tokens().verify(&registered.tokens.access_token).unwrap();
        let profile = svc.current_user(&claims.sub).await.unwrap();
        assert_eq!(profile.email, "a@x.com");
    }

    #[tokio::test]
    async fn current_user_missing_is_unauthorized() {
        let (svc, _) = service();
        let err = svc.current_user("missing").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "User not found"));
    }

    #[tokio::test]
    async fn google_login_is_idempotent_on_subject() {
        let (svc, store) = service_with(FakeGoogle::default().with("cred", "g-1", "g@x.com"));
        let first = svc.login_with_google(google_req("cred")).await.unwrap();
        let second = svc.login_with_google(google_req("cred")).await.unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_eq!(store.len(), 1);

        let stored = store.find_by_id(&first.user.id).await.unwrap().unwrap();
        assert_eq!(stored.provider, Provider::Google);
        assert!(stored.password_hash.is_none());
        assert_eq!(stored.google_id.as_deref(), Some("g-1"));
        assert_eq!(first.user.name, "Google Ann");
    }

    #[tokio::test]
    async fn google_login_links_existing_local_account() {
        let (svc, store) = service_with(FakeGoogle::default().with("cred", "g-1", "a@x.com"));
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();

        let google = svc.login_with_google(google_req("cred")).await.unwrap();
        assert_eq!(google.user.id, registered.user.id);
        assert_eq!(google.user.picture.as_deref(), Some("https://example.com/ann.png"));
        assert_eq!(store.len(), 1);

        let stored = store.find_by_id(&registered.user.id).await.unwrap().unwrap();
        assert_eq!(stored.google_id.as_deref(), Some("g-1"));
        assert_eq!(stored.provider, Provider::Local);
        assert!(stored.email_verified);

        // Password login keeps working after linking.
        assert!(svc.login(login_req("a@x.com", "secret1")).await.is_ok());
    }

    #[tokio::test]
    async fn google_verification_failure_is_bad_request_with_cause() {
        let (svc, _) = service();
        let err = svc.login_with_google(google_req("forged")).await.unwrap_err();
        match err {
            AppError::BadRequest(msg) => {
                assert!(msg.starts_with("Error validating Google token: "));
                assert!(msg.contains("bad signature"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn google_client_id_must_match_configuration() {
        let store = MemoryStore::new();
        let mut config = Config::test_default();
        config.google_client_id = Some("configured-client".to_string());
        let svc = AuthService::new(
            &config,
            Arc::new(store),
            Arc::new(FakeGoogle::default().with("cred", "g-1", "g@x.com")),
        );

        let err = svc.login_with_google(google_req("cred")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("client id mismatch")));
    }

    #[tokio::test]
    async fn concurrent_refreshes_leave_exactly_one_valid_token() {
        let (svc, store) = service();
        let svc = Arc::new(svc);
        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        let rt = registered.tokens.refresh_token.unwrap();

        let (a, b) = tokio::join!(svc.refresh(&rt), svc.refresh(&rt));
        let issued: Vec<String> = [a, b]
            .into_iter()
            .filter_map(|r| r.ok())
            .filter_map(|r| r.tokens.refresh_token)
            .collect();
        assert!(!issued.is_empty());

        let slot = store
            .find_by_id(&registered.user.id)
            .await
            .unwrap()
            .unwrap()
            .refresh_token_hash
            .unwrap();
        let matching = issued
            .iter()
            .filter(|token| digest_matches(&slot, token))
            .count();
        assert_eq!(matching, 1);
        assert!(!digest_matches(&slot, &rt));
    }
}
