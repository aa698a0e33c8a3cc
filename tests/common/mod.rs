// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use authgate::config::Config;
use authgate::db::{FirestoreDb, MemoryStore};
use authgate::routes::create_router;
use authgate::services::GoogleOidcVerifier;
use authgate::AppState;
use axum::body::Body;
use axum::http::{header, Request};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Audience used for Google credentials in tests.
#[allow(dead_code)]
pub const GOOGLE_CLIENT_ID: &str = "test-client.apps.googleusercontent.com";
const GOOGLE_KID: &str = "test-google-kid";

const GOOGLE_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/google_test_key.pem");
const GOOGLE_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/google_test_key.pub.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Google verifier that trusts the fixture key instead of Google's JWKS.
#[allow(dead_code)]
pub fn test_google_verifier() -> GoogleOidcVerifier {
    let key = DecodingKey::from_rsa_pem(GOOGLE_PUBLIC_KEY).expect("fixture public key");
    GoogleOidcVerifier::new_with_static_key(GOOGLE_KID, key).expect("static verifier")
}

/// Create a test app backed by an in-memory store.
/// Returns the router, the shared state and the store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let state = Arc::new(AppState::new(
        config,
        Arc::new(store.clone()),
        Arc::new(test_google_verifier()),
    ));

    (create_router(state.clone()), state, store)
}

/// Serve a fresh test app on an ephemeral port. Returns its base URL.
#[allow(dead_code)]
pub async fn spawn_test_server() -> (String, Arc<AppState>, MemoryStore) {
    let (app, state, store) = create_test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });

    (format!("http://{addr}"), state, store)
}

/// Build a JSON request, optionally with a bearer token.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    bearer: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Default Google ID token claims for a subject and email.
#[allow(dead_code)]
pub fn google_claims(sub: &str, email: &str) -> serde_json::Value {
    let now = now_secs();
    serde_json::json!({
        "iss": "https://accounts.google.com",
        "aud": GOOGLE_CLIENT_ID,
        "sub": sub,
        "email": email,
        "email_verified": true,
        "name": "Google User",
        "picture": "https://example.com/photo.png",
        "given_name": "Google",
        "family_name": "User",
        "locale": "en",
        "iat": now,
        "exp": now + 3600,
    })
}

/// Sign arbitrary claims as a Google ID token with the fixture key.
#[allow(dead_code)]
pub fn sign_google_claims(claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(GOOGLE_KID.to_string());
    let key = EncodingKey::from_rsa_pem(GOOGLE_PRIVATE_KEY).expect("fixture private key");
    encode(&header, claims, &key).expect("sign Google credential")
}

/// A valid Google credential for `sub` / `email`.
#[allow(dead_code)]
pub fn google_credential(sub: &str, email: &str) -> String {
    sign_google_claims(&google_claims(sub, email))
}
