// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every core operation returns [`AppError`]. Client errors carry a specific
//! message and never follow a state change; server errors are logged in full
//! and reported to the caller with an opaque body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Todo limit of {limit} reached for free accounts")]
    QuotaExceeded { limit: usize },

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Stripe API error: {0}")]
    StripeApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the caller is at fault (4xx) rather than the server (5xx).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidToken | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::InvalidSignature => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::StripeApi(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Flatten validator errors into `field -> [message]`.
fn field_messages(errors: &validator::ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid {}", field))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, details, fields) = match &self {
            AppError::Unauthorized => ("unauthorized", None, None),
            AppError::InvalidToken => ("invalid_token", None, None),
            AppError::InvalidCredentials => {
                ("invalid_credentials", Some(self.to_string()), None)
            }
            AppError::Forbidden(msg) => ("forbidden", Some(msg.clone()), None),
            AppError::NotFound(msg) => ("not_found", Some(msg.clone()), None),
            AppError::BadRequest(msg) => ("bad_request", Some(msg.clone()), None),
            AppError::Validation(errors) => {
                ("validation_failed", None, Some(field_messages(errors)))
            }
            AppError::Conflict(msg) => ("conflict", Some(msg.clone()), None),
            AppError::QuotaExceeded { .. } => ("quota_exceeded", Some(self.to_string()), None),
            AppError::InvalidSignature => ("invalid_signature", None, None),
            AppError::StripeApi(msg) => {
                tracing::error!(error = %msg, "Stripe API error");
                ("billing_provider_error", None, None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", None, None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", None, None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
