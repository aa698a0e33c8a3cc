//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. For local development a `.env` file
//! is honored via `dotenvy`.

use std::env;
use std::time::Duration;

const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_BCRYPT_COST: u32 = 12;
/// Longest accepted token lifetime.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// GCP project ID; when absent the in-memory user store is used
    pub gcp_project_id: Option<String>,
    /// Google OAuth client ID; when set, Google logins must target it
    pub google_client_id: Option<String>,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,

    // --- Secrets ---
    /// JWT signing key shared by access and refresh tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
}

impl Config {
    /// Config for tests: in-memory store, cheap bcrypt, fixed key.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:4200".to_string(),
            port: 3000,
            gcp_project_id: None,
            google_client_id: None,
            access_token_ttl: DEFAULT_ACCESS_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TTL,
            bcrypt_cost: 4,
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            gcp_project_id: optional_var("GCP_PROJECT_ID"),
            google_client_id: optional_var("GOOGLE_CLIENT_ID"),
            access_token_ttl: duration_var("JWT_EXPIRES_IN", DEFAULT_ACCESS_TTL)?,
            refresh_token_ttl: duration_var("JWT_REFRESH_EXPIRES_IN", DEFAULT_REFRESH_TTL)?,
            bcrypt_cost: match optional_var("BCRYPT_COST") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::Invalid("BCRYPT_COST", raw))?,
                None => DEFAULT_BCRYPT_COST,
            },
            jwt_secret: optional_var("JWT_SECRET")
                .ok_or(ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn duration_var(name: &'static str, fallback: Duration) -> Result<Duration, ConfigError> {
    match optional_var(name) {
        Some(raw) => parse_ttl(&raw).ok_or(ConfigError::Invalid(name, raw)),
        None => Ok(fallback),
    }
}

/// Token lifetime: a parseable, non-zero duration no longer than `MAX_TOKEN_TTL`.
fn parse_ttl(raw: &str) -> Option<Duration> {
    parse_duration(raw).filter(|ttl| !ttl.is_zero() && *ttl <= MAX_TOKEN_TTL)
}

/// Parse a lifetime such as `3600`, `90s`, `15m`, `1h` or `7d`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };
    Some(Duration::from_secs(value.checked_mul(multiplier)?))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
