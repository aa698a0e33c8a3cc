// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the auth endpoints.
//!
//! Every call goes through the interceptor: bearer attachment on the way
//! out, error handling on the way back. Responses are unwrapped from the
//! `{success, data, ...}` envelope.

use crate::client::endpoints;
use crate::client::error::{AuthOperation, ClientError};
use crate::client::interceptor::Interceptor;
use crate::client::ClientConfig;
use crate::models::{
    ApiResponse, AuthResponse, GoogleAuthRequest, LoginRequest, RegisterRequest, UserProfile,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub struct AuthApi {
    http: reqwest::Client,
    base_url: String,
    interceptor: Arc<Interceptor>,
}

impl AuthApi {
    pub fn new(config: &ClientConfig, interceptor: Arc<Interceptor>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            interceptor,
        }
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let request = self.request(Method::POST, endpoints::LOGIN).json(req);
        self.call(AuthOperation::Login, endpoints::LOGIN, request)
            .await
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let request = self.request(Method::POST, endpoints::REGISTER).json(req);
        self.call(AuthOperation::Register, endpoints::REGISTER, request)
            .await
    }

    pub async fn login_with_google(
        &self,
        req: &GoogleAuthRequest,
    ) -> Result<AuthResponse, ClientError> {
        let request = self.request(Method::POST, endpoints::GOOGLE).json(req);
        self.call(AuthOperation::Google, endpoints::GOOGLE, request)
            .await
    }

    /// Exchange a refresh token, sent explicitly as the bearer credential.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, ClientError> {
        let request = self
            .request(Method::POST, endpoints::REFRESH)
            .bearer_auth(refresh_token);
        self.call(AuthOperation::Refresh, endpoints::REFRESH, request)
            .await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.send_logout(self.logout_request()).await
    }

    /// Logout request with the current access token already attached, so it
    /// can be sent after the local session is gone.
    pub(crate) fn logout_request(&self) -> RequestBuilder {
        self.request(Method::POST, endpoints::LOGOUT)
    }

    pub(crate) async fn send_logout(&self, request: RequestBuilder) -> Result<(), ClientError> {
        let response = self
            .execute(AuthOperation::Logout, endpoints::LOGOUT, request)
            .await?;
        let envelope: ApiResponse<serde_json::Value> = parse_envelope(response).await?;
        if !envelope.success {
            return Err(ClientError::unexpected(
                envelope.error.unwrap_or_else(|| "logout failed".to_string()),
            ));
        }
        Ok(())
    }

    pub async fn verify_token(&self) -> Result<UserProfile, ClientError> {
        let request = self.request(Method::GET, endpoints::VERIFY);
        self.call(AuthOperation::Verify, endpoints::VERIFY, request)
            .await
    }

    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        let request = self.request(Method::GET, endpoints::ME);
        self.call(AuthOperation::Me, endpoints::ME, request).await
    }

    /// GET an application endpoint that uses the same envelope.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.request(Method::GET, path);
        self.call(AuthOperation::Request, path, request).await
    }

    /// POST to an application endpoint that uses the same envelope.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = self.request(Method::POST, path).json(body);
        self.call(AuthOperation::Request, path, request).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        self.interceptor.authorize(path, builder)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        op: AuthOperation,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.execute(op, path, request).await?;
        let envelope: ApiResponse<T> = parse_envelope(response).await?;

        if !envelope.success {
            return Err(ClientError::unexpected(
                envelope
                    .error
                    .unwrap_or_else(|| "server reported failure".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| ClientError::unexpected("response has no data"))
    }

    /// Send the request, classifying transport failures and error statuses.
    async fn execute(
        &self,
        op: AuthOperation,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response, ClientError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(path, error = %e, "Request failed before a response arrived");
                self.interceptor.on_transport_error(path);
                return Err(ClientError::network(e.to_string()));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ApiResponse<serde_json::Value>>()
            .await
            .ok()
            .and_then(|envelope| envelope.message);

        tracing::debug!(path, status = status.as_u16(), detail = ?detail, "Request rejected");
        self.interceptor.on_error_status(path, status).await;
        Err(ClientError::from_status(op, status.as_u16(), detail))
    }
}

async fn parse_envelope<T: DeserializeOwned>(
    response: Response,
) -> Result<ApiResponse<T>, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::unexpected(format!("invalid response body: {e}")))
}
