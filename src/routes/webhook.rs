// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for Stripe events.
//!
//! Status codes tell Stripe what to do next: 2xx accepted, 4xx rejected
//! (never retried), 5xx retried later.

use crate::error::{AppError, Result};
use crate::services::stripe_webhook::{verify_signature, Event, SIGNATURE_HEADER};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(handle_event))
}

#[derive(Serialize)]
struct WebhookResponse {
    status: &'static str,
}

/// Handle incoming webhook events (POST).
///
/// The signature is checked against the raw body before anything is parsed.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook request without signature header");
            AppError::InvalidSignature
        })?;

    verify_signature(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        chrono::Utc::now().timestamp(),
    )?;

    let event: Event = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse webhook event");
        AppError::BadRequest("Malformed webhook event".to_string())
    })?;

    let outcome = state.billing.handle_event(&event).await?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        outcome = outcome.as_str(),
        "Webhook event handled"
    );

    Ok(Json(WebhookResponse {
        status: outcome.as_str(),
    }))
}
