// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error classification.

use std::fmt;

/// Fixed set of error kinds surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredentials,
    NetworkError,
    TokenExpired,
    Unauthorized,
    ServerError,
    ValidationError,
    GoogleAuthError,
    Unexpected,
}

impl AuthErrorKind {
    /// User-facing message for this kind.
    pub fn message(self) -> &'static str {
        match self {
            AuthErrorKind::InvalidCredentials => "Invalid email or password",
            AuthErrorKind::NetworkError => "Network error, check your connection",
            AuthErrorKind::TokenExpired => "Your session has expired",
            AuthErrorKind::Unauthorized => "You are not authorized",
            AuthErrorKind::ServerError => "Server error, please try again later",
            AuthErrorKind::ValidationError => "Please check the submitted data",
            AuthErrorKind::GoogleAuthError => "Google sign-in failed",
            AuthErrorKind::Unexpected => "An unexpected error occurred",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Which call produced an error; selects the kind used for 400/409.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    Login,
    Register,
    Google,
    Refresh,
    Verify,
    Logout,
    Me,
    /// Any other application request
    Request,
}

impl AuthOperation {
    pub fn default_kind(self) -> AuthErrorKind {
        match self {
            AuthOperation::Login => AuthErrorKind::InvalidCredentials,
            AuthOperation::Register => AuthErrorKind::ValidationError,
            AuthOperation::Google => AuthErrorKind::GoogleAuthError,
            AuthOperation::Refresh | AuthOperation::Verify => AuthErrorKind::TokenExpired,
            AuthOperation::Logout => AuthErrorKind::ServerError,
            AuthOperation::Me => AuthErrorKind::Unauthorized,
            AuthOperation::Request => AuthErrorKind::Unexpected,
        }
    }
}

/// Error returned by client operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct ClientError {
    pub kind: AuthErrorKind,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Server- or transport-provided detail, for logs
    pub detail: Option<String>,
}

impl ClientError {
    pub fn new(kind: AuthErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            detail: Some(detail.into()),
        }
    }

    /// No response arrived (connection refused, DNS, timeout).
    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::NetworkError, detail)
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Unexpected, detail)
    }

    /// Classify a non-success HTTP status for the given operation.
    pub fn from_status(op: AuthOperation, status: u16, detail: Option<String>) -> Self {
        let kind = match status {
            401 => AuthErrorKind::Unauthorized,
            422 => AuthErrorKind::ValidationError,
            400 | 409 => op.default_kind(),
            s if s >= 500 => AuthErrorKind::ServerError,
            _ => AuthErrorKind::Unexpected,
        };
        Self {
            kind,
            status: Some(status),
            detail,
        }
    }

    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}
