// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Billing routes: Stripe Checkout, the success/cancel returns and the
//! customer portal. All require a session.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserResponse;
use crate::services::stripe::NewCheckoutSession;
use crate::services::CheckoutSummary;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Billing routes.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/billing/checkout", post(create_checkout))
        .route("/billing/success", get(checkout_success))
        .route("/billing/cancel", get(checkout_cancel))
        .route("/billing/portal", post(billing_portal))
}

/// Start a subscription checkout and redirect to Stripe.
async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Redirect> {
    let success_url = format!(
        "{}/billing/success?session_id={{CHECKOUT_SESSION_ID}}",
        state.config.app_url
    );
    let cancel_url = format!("{}/billing/cancel", state.config.app_url);

    let session = state
        .stripe
        .create_checkout_session(&NewCheckoutSession {
            price_id: &state.config.stripe_price_id,
            user_id: &auth.user.id,
            customer_email: &auth.user.email,
            customer_id: auth.user.customer_id(),
            success_url: &success_url,
            cancel_url: &cancel_url,
        })
        .await?;

    let url = session.url.ok_or_else(|| {
        AppError::StripeApi(format!("checkout session {} has no URL", session.id))
    })?;

    tracing::info!(user_id = %auth.user.id, session_id = %session.id, "Checkout session created");
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
struct SuccessParams {
    session_id: String,
}

/// Checkout session IDs look like `cs_test_a1B2...`.
fn is_valid_session_id(session_id: &str) -> bool {
    session_id.starts_with("cs_")
        && session_id.len() <= 255
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Return from a completed checkout: reconcile and show the updated user.
async fn checkout_success(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<SuccessParams>,
) -> Result<Json<UserResponse>> {
    if !is_valid_session_id(&params.session_id) {
        return Err(AppError::BadRequest("Invalid checkout session ID".to_string()));
    }

    let session = state
        .stripe
        .retrieve_checkout_session(&params.session_id)
        .await?;
    let summary = CheckoutSummary::from(&session);

    if summary.customer_email.as_deref() != Some(auth.user.email.as_str()) {
        tracing::warn!(
            user_id = %auth.user.id,
            session_id = %summary.session_id,
            "Checkout session email differs from the logged-in user"
        );
    }

    let user = state.billing.complete_checkout(&summary).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Checkout abandoned: nothing changes.
async fn checkout_cancel(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.user))
}

/// Redirect to the Stripe customer portal.
async fn billing_portal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Redirect> {
    let customer_id = auth.user.customer_id().ok_or_else(|| {
        AppError::BadRequest("No billing account linked to this user".to_string())
    })?;

    let portal = state
        .stripe
        .create_portal_session(customer_id, &state.config.app_url)
        .await?;

    tracing::info!(user_id = %auth.user.id, "Billing portal session created");
    Ok(Redirect::to(&portal.url))
}
