// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stripe API client for checkout and billing portal sessions.
//!
//! Handles:
//! - Checkout session creation (subscription mode) and retrieval
//! - Billing portal session creation
//! - The object shapes shared with webhook payloads
//!
//! Requests are form-encoded and authenticated with the secret key.

use crate::error::AppError;
use serde::Deserialize;

/// A reference to a Stripe customer that may or may not be expanded.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CustomerRef {
    Id(String),
    Object {
        id: String,
        #[serde(default)]
        email: Option<String>,
    },
}

impl CustomerRef {
    /// The customer ID (`cus_...`).
    pub fn id(&self) -> &str {
        match self {
            CustomerRef::Id(id) => id,
            CustomerRef::Object { id, .. } => id,
        }
    }

    fn email(&self) -> Option<&str> {
        match self {
            CustomerRef::Id(_) => None,
            CustomerRef::Object { email, .. } => email.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// Checkout session (also the object of `checkout.session.completed`).
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// `paid`, `unpaid` or `no_payment_required`
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Our user ID, when the session was created by this app
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Hosted checkout URL (only present on creation)
    #[serde(default)]
    pub url: Option<String>,
}

impl CheckoutSession {
    /// Email the customer entered at checkout, falling back to the prefilled one.
    pub fn email(&self) -> Option<&str> {
        let non_empty = |e: &&str| !e.is_empty();
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .filter(non_empty)
            .or_else(|| self.customer_email.as_deref().filter(non_empty))
            .or_else(|| {
                self.customer
                    .as_ref()
                    .and_then(CustomerRef::email)
                    .filter(non_empty)
            })
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .map(CustomerRef::id)
            .filter(|id| !id.is_empty())
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

/// Invoice (object of `invoice.*` events).
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl Invoice {
    pub fn customer_id(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .map(CustomerRef::id)
            .filter(|id| !id.is_empty())
    }
}

/// Subscription (object of `customer.subscription.*` events).
///
/// Users are resolved through `customer`, never through the subscription's
/// own `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer: CustomerRef,
    #[serde(default)]
    pub status: Option<String>,
}

/// Billing portal session.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalSession {
    pub id: String,
    pub url: String,
}

/// Stripe error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Parameters for a subscription checkout.
#[derive(Debug, Clone)]
pub struct NewCheckoutSession<'a> {
    pub price_id: &'a str,
    pub user_id: &'a str,
    pub customer_email: &'a str,
    /// Existing customer to reuse instead of creating a new one
    pub customer_id: Option<&'a str>,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StripeClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.stripe.com/v1".to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Create a subscription-mode checkout session.
    pub async fn create_checkout_session(
        &self,
        params: &NewCheckoutSession<'_>,
    ) -> Result<CheckoutSession, AppError> {
        let url = format!("{}/checkout/sessions", self.base_url);

        let mut form: Vec<(&str, &str)> = vec![
            ("mode", "subscription"),
            ("line_items[0][price]", params.price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", params.success_url),
            ("cancel_url", params.cancel_url),
            ("client_reference_id", params.user_id),
        ];
        // Stripe rejects customer and customer_email together
        match params.customer_id {
            Some(customer_id) => form.push(("customer", customer_id)),
            None => form.push(("customer_email", params.customer_email)),
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::StripeApi(format!("Create checkout session failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Retrieve a checkout session by ID.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, AppError> {
        let url = format!("{}/checkout/sessions/{}", self.base_url, session_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::StripeApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Create a billing portal session for an existing customer.
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, AppError> {
        let url = format!("{}/billing_portal/sessions", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .form(&[("customer", customer_id), ("return_url", return_url)])
            .send()
            .await
            .map_err(|e| AppError::StripeApi(format!("Create portal session failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = describe_error(&body);

            if status.as_u16() == 404 {
                return Err(AppError::NotFound(format!("Stripe object: {}", message)));
            }

            if status.as_u16() == 429 {
                tracing::warn!("Stripe rate limit hit (429)");
            }

            return Err(AppError::StripeApi(format!("HTTP {}: {}", status, message)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StripeApi(format!("JSON parse error: {}", e)))
    }
}

/// Pull the message out of a Stripe error body, falling back to the raw text.
fn describe_error(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "{} ({})",
            envelope.error.message.unwrap_or_default(),
            envelope.error.kind.unwrap_or_else(|| "unknown".to_string())
        ),
        Err(_) => body.to_string(),
    }
}
