// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP-level tests of the auth endpoints.
//!
//! These tests drive the full router (middleware, envelope, status codes)
//! against an in-memory store.

use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, json_request};

async fn register(app: &axum::Router, email: &str, password: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            Some(json!({"email": email, "password": password, "name": "Ann"})),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn login(app: &axum::Router, email: &str, password: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            Some(json!({"email": email, "password": password})),
            None,
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_returns_envelope_with_tokens() {
    let (app, _, _) = create_test_app();
    let body = register(&app, "a@x.com", "secret1").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User registered successfully");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    assert!(body.get("error").is_none());

    let data = &body["data"];
    assert_eq!(data["user"]["email"], "a@x.com");
    assert_eq!(data["user"]["name"], "Ann");
    assert_eq!(data["user"]["verified_email"], false);
    assert_eq!(data["user"]["roles"], json!(["user"]));
    assert!(data["user"].get("password_hash").is_none());

    let tokens = &data["tokens"];
    assert!(tokens["accessToken"].as_str().unwrap().len() > 20);
    assert!(tokens["refreshToken"].as_str().unwrap().len() > 20);
    assert_eq!(tokens["expiresIn"], 3600);
    assert_eq!(tokens["tokenType"], "Bearer");
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let (app, _, _) = create_test_app();
    register(&app, "a@x.com", "secret1").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            Some(json!({"email": "a@x.com", "password": "secret2", "name": "Bob"})),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["message"], "User already exists with this email");
}

#[tokio::test]
async fn test_invalid_registration_is_bad_request() {
    let (app, _, store) = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            Some(json!({"email": "nope", "password": "secret1", "name": "Ann"})),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
    assert_eq!(body["message"], "Email must be a valid email address");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_enveloped() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_register_login_logout_refresh_scenario() {
    let (app, _, _) = create_test_app();
    register(&app, "a@x.com", "secret1").await;

    let wrong = login(&app, "a@x.com", "wrong").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(wrong).await;
    assert_eq!(body["message"], "Invalid credentials");

    let ok = login(&app, "a@x.com", "secret1").await;
    assert_eq!(ok.status(), StatusCode::OK);
    let body = body_json(ok).await;
    assert_eq!(body["message"], "Login successful");
    let access = body["data"]["tokens"]["accessToken"].as_str().unwrap().to_string();
    let refresh = body["data"]["tokens"]["refreshToken"].as_str().unwrap().to_string();

    let logout = app
        .clone()
        .oneshot(json_request("POST", "/auth/logout", None, Some(&access)))
        .await
        .unwrap();
    assert_eq!(logout.status(), StatusCode::OK);
    let body = body_json(logout).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Logout successful");
    assert!(body.get("data").is_none());

    let refreshed = app
        .clone()
        .oneshot(json_request("POST", "/auth/refresh", None, Some(&refresh)))
        .await
        .unwrap();
    assert_eq!(refreshed.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(refreshed).await;
    assert_eq!(body["message"], "Invalid refresh token");

    // The access token is not revoked by logout.
    let me = app
        .clone()
        .oneshot(json_request("GET", "/auth/me", None, Some(&access)))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    let body = body_json(me).await;
    assert_eq!(body["message"], "User data retrieved");
    assert_eq!(body["data"]["email"], "a@x.com");
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let (app, _, _) = create_test_app();
    let body = register(&app, "a@x.com", "secret1").await;
    let rt1 = body["data"]["tokens"]["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/auth/refresh", None, Some(&rt1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Tokens refreshed successfully");
    let rt2 = body["data"]["tokens"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rt1, rt2);

    let reused = app
        .clone()
        .oneshot(json_request("POST", "/auth/refresh", None, Some(&rt1)))
        .await
        .unwrap();
    assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);

    let rotated = app
        .clone()
        .oneshot(json_request("POST", "/auth/refresh", None, Some(&rt2)))
        .await
        .unwrap();
    assert_eq!(rotated.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_token_is_unauthorized() {
    let (app, _, _) = create_test_app();
    let response = app
        .oneshot(json_request("POST", "/auth/refresh", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let (app, _, _) = create_test_app();

    for (method, uri) in [
        ("GET", "/auth/me"),
        ("GET", "/auth/verify"),
        ("POST", "/auth/logout"),
    ] {
        let missing = app
            .clone()
            .oneshot(json_request(method, uri, None, None))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = body_json(missing).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "unauthorized");

        let garbage = app
            .clone()
            .oneshot(json_request(method, uri, None, Some("not-a-token")))
            .await
            .unwrap();
        assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_verify_returns_user() {
    let (app, _, _) = create_test_app();
    let body = register(&app, "a@x.com", "secret1").await;
    let access = body["data"]["tokens"]["accessToken"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request("GET", "/auth/verify", None, Some(access)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Valid token");
    assert_eq!(body["data"]["email"], "a@x.com");
}

#[tokio::test]
async fn test_me_for_deleted_user_is_unauthorized() {
    let (app, _, store) = create_test_app();
    let body = register(&app, "a@x.com", "secret1").await;
    let access = body["data"]["tokens"]["accessToken"].as_str().unwrap();
    let user_id = body["data"]["user"]["id"].as_str().unwrap();
    store.remove(user_id);

    let response = app
        .clone()
        .oneshot(json_request("GET", "/auth/me", None, Some(access)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_disabled_account_cannot_log_in() {
    let (app, _, store) = create_test_app();
    let body = register(&app, "a@x.com", "secret1").await;
    store.set_active(body["data"]["user"]["id"].as_str().unwrap(), false);

    let response = login(&app, "a@x.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Account disabled");
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = create_test_app();
    let response = app
        .oneshot(json_request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/auth/login")
                .header(header::ORIGIN, "http://localhost:4200")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:4200"
    );
}

#[tokio::test]
async fn test_responses_are_not_cacheable() {
    let (app, _, _) = create_test_app();
    let response = login(&app, "nobody@x.com", "secret1").await;
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
}
