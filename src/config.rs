// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (JWT key, Stripe keys, maintenance token) are read once at startup
//! and kept in memory.

use std::env;

/// Default lifetime of cached user records.
pub const DEFAULT_USER_CACHE_TTL_SECS: i64 = 300;

/// Longest accepted user cache lifetime (one day).
pub const MAX_USER_CACHE_TTL_SECS: i64 = 24 * 60 * 60;

/// Parse `USER_CACHE_TTL_SECS`, which must lie in `0..=MAX_USER_CACHE_TTL_SECS`.
fn parse_cache_ttl(value: Option<String>) -> Result<i64, ConfigError> {
    let Some(value) = value else {
        return Ok(DEFAULT_USER_CACHE_TTL_SECS);
    };
    match value.trim().parse::<i64>() {
        Ok(secs) if (0..=MAX_USER_CACHE_TTL_SECS).contains(&secs) => Ok(secs),
        _ => Err(ConfigError::Invalid("USER_CACHE_TTL_SECS", value)),
    }
}

/// Which store backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// Google Cloud Firestore (production)
    Firestore,
    /// Process-local store (development and tests)
    Memory,
}

impl std::str::FromStr for DatabaseBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid("DATABASE_BACKEND", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Public base URL of this app, used for Stripe redirect URLs and CORS
    pub app_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Store backend
    pub database: DatabaseBackend,
    /// Stripe price for the paid plan
    pub stripe_price_id: String,
    /// Lifetime of cached user records, in seconds
    pub user_cache_ttl_secs: i64,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Stripe secret API key
    pub stripe_api_key: String,
    /// Stripe webhook endpoint signing secret (`whsec_...`)
    pub stripe_webhook_secret: String,
    /// Bearer token for `/tasks/*` maintenance endpoints
    pub tasks_auth_token: String,
}

impl Config {
    /// Config for tests: in-memory store and fixed secrets.
    pub fn test_default() -> Self {
        Self {
            app_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            database: DatabaseBackend::Memory,
            stripe_price_id: "price_test".to_string(),
            user_cache_ttl_secs: DEFAULT_USER_CACHE_TTL_SECS,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            stripe_api_key: "sk_test_key".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
            tasks_auth_token: "test_tasks_token".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let database = env::var("DATABASE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse()?;

        Ok(Self {
            app_url: env::var("APP_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            database,
            stripe_price_id: env::var("STRIPE_PRICE_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRIPE_PRICE_ID"))?,
            user_cache_ttl_secs: parse_cache_ttl(env::var("USER_CACHE_TTL_SECS").ok())?,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            stripe_api_key: env::var("STRIPE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRIPE_API_KEY"))?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?,
            tasks_auth_token: env::var("TASKS_AUTH_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("TASKS_AUTH_TOKEN"))?,
        })
    }

    /// Whether the app is served from a local development host.
    pub fn is_local(&self) -> bool {
        self.app_url.starts_with("http://localhost") || self.app_url.starts_with("http://127.0.0.1")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
