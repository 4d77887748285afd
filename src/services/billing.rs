// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Billing state reconciliation.
//!
//! Two independent paths update a user's paid flag and Stripe customer link:
//! the synchronous checkout-success return and asynchronous webhook events.
//! They may arrive in any order and may be retried, so every step either
//! moves state forward or is an idempotent no-op.
//!
//! Users are matched by Stripe customer ID (`cus_...`) or by email. A webhook
//! for a user we do not know is acknowledged so Stripe stops retrying it;
//! a failed write is an error so that Stripe does retry.

use crate::error::AppError;
use crate::models::User;
use crate::services::stripe::{CheckoutSession, Invoice, Subscription};
use crate::services::stripe_webhook::{Event, EventKind};
use crate::services::users::UserService;
use serde::de::DeserializeOwned;

/// Result of handling a webhook event, reported back to Stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// State was updated (or already up to date)
    Processed,
    /// Known event that needs no state change
    Acknowledged,
    /// No local user matches the event
    UserNotFound,
    /// Event type this app does not handle
    Unrecognized,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Processed => "processed",
            WebhookOutcome::Acknowledged => "acknowledged",
            WebhookOutcome::UserNotFound => "user_not_found",
            WebhookOutcome::Unrecognized => "unrecognized",
        }
    }
}

/// What the checkout-success path needs from a retrieved checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub session_id: String,
    pub customer_email: Option<String>,
    pub customer_id: Option<String>,
    pub is_paid: bool,
}

impl From<&CheckoutSession> for CheckoutSummary {
    fn from(session: &CheckoutSession) -> Self {
        Self {
            session_id: session.id.clone(),
            customer_email: session.email().map(str::to_string),
            customer_id: session.customer_id().map(str::to_string),
            is_paid: session.is_paid(),
        }
    }
}

#[derive(Clone)]
pub struct BillingReconciler {
    users: UserService,
}

impl BillingReconciler {
    pub fn new(users: UserService) -> Self {
        Self { users }
    }

    /// Apply a completed checkout to the user who paid for it.
    ///
    /// An email that matches no user is an inconsistency between Stripe and
    /// our store, reported as a server error. Returns the updated user.
    pub async fn complete_checkout(&self, summary: &CheckoutSummary) -> Result<User, AppError> {
        let Some(email) = summary.customer_email.as_deref() else {
            tracing::error!(
                session_id = %summary.session_id,
                "Checkout session has no customer email"
            );
            return Err(AppError::Internal(anyhow::anyhow!(
                "checkout session {} has no customer email",
                summary.session_id
            )));
        };

        let Some(user) = self.users.get_user_by_email(email).await? else {
            tracing::error!(
                session_id = %summary.session_id,
                "Checkout completed for an email with no account"
            );
            return Err(AppError::Internal(anyhow::anyhow!(
                "no user for checkout session {}",
                summary.session_id
            )));
        };

        if let Some(customer_id) = summary.customer_id.as_deref() {
            self.users.attach_customer_id(&user.id, customer_id).await?;
        }

        if summary.is_paid {
            self.users.set_paid_status(&user.id, true).await?;
        } else {
            tracing::info!(
                user_id = %user.id,
                session_id = %summary.session_id,
                "Checkout returned without payment"
            );
        }

        self.users
            .get_user_fresh(&user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user.id)))
    }

    /// Apply a verified webhook event.
    pub async fn handle_event(&self, event: &Event) -> Result<WebhookOutcome, AppError> {
        let kind = EventKind::from_type(&event.event_type);
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            ?kind,
            "Stripe webhook event received"
        );

        match kind {
            EventKind::CheckoutSessionCompleted => {
                let session: CheckoutSession = parse_object(event)?;
                self.on_checkout_completed(event, &session).await
            }
            EventKind::InvoicePaid => {
                let invoice: Invoice = parse_object(event)?;
                self.on_invoice_paid(event, &invoice).await
            }
            EventKind::InvoicePaymentFailed => {
                let invoice: Invoice = parse_object(event)?;
                let Some(user) = self.user_for_customer(invoice.customer_id()).await? else {
                    return Ok(user_not_found(event));
                };
                self.users.set_paid_status(&user.id, false).await?;
                Ok(WebhookOutcome::Processed)
            }
            EventKind::SubscriptionDeleted => {
                let subscription: Subscription = parse_object(event)?;
                let Some(user) = self
                    .user_for_customer(Some(subscription.customer.id()))
                    .await?
                else {
                    return Ok(user_not_found(event));
                };
                self.users.set_paid_status(&user.id, false).await?;
                tracing::info!(
                    user_id = %user.id,
                    subscription_id = %subscription.id,
                    "Subscription ended"
                );
                Ok(WebhookOutcome::Processed)
            }
            EventKind::SubscriptionChanged => {
                let subscription: Subscription = parse_object(event)?;
                let Some(user) = self
                    .user_for_customer(Some(subscription.customer.id()))
                    .await?
                else {
                    return Ok(user_not_found(event));
                };
                tracing::info!(
                    user_id = %user.id,
                    subscription_id = %subscription.id,
                    status = subscription.status.as_deref().unwrap_or("unknown"),
                    event_type = %event.event_type,
                    "Subscription changed"
                );
                Ok(WebhookOutcome::Acknowledged)
            }
            EventKind::Ignored => Ok(WebhookOutcome::Acknowledged),
            EventKind::Unrecognized => {
                tracing::info!(event_type = %event.event_type, "Unhandled Stripe event type");
                Ok(WebhookOutcome::Unrecognized)
            }
        }
    }

    /// Link the customer only. Paid status comes from the success return and
    /// from `invoice.paid`.
    async fn on_checkout_completed(
        &self,
        event: &Event,
        session: &CheckoutSession,
    ) -> Result<WebhookOutcome, AppError> {
        let Some(email) = session.email() else {
            return Ok(user_not_found(event));
        };
        let Some(user) = self.users.get_user_by_email(email).await? else {
            return Ok(user_not_found(event));
        };

        if let Some(customer_id) = session.customer_id() {
            self.users.attach_customer_id(&user.id, customer_id).await?;
        }
        Ok(WebhookOutcome::Processed)
    }

    async fn on_invoice_paid(
        &self,
        event: &Event,
        invoice: &Invoice,
    ) -> Result<WebhookOutcome, AppError> {
        let customer_id = invoice.customer_id();

        let user = match self.user_for_customer(customer_id).await? {
            Some(user) => user,
            None => {
                // First invoice can beat the checkout return; fall back to email
                let by_email = match invoice.customer_email.as_deref() {
                    Some(email) if !email.is_empty() => {
                        self.users.get_user_by_email(email).await?
                    }
                    _ => None,
                };
                let Some(user) = by_email else {
                    return Ok(user_not_found(event));
                };
                if let Some(customer_id) = customer_id {
                    self.users.attach_customer_id(&user.id, customer_id).await?;
                }
                user
            }
        };

        self.users.set_paid_status(&user.id, true).await?;
        Ok(WebhookOutcome::Processed)
    }

    async fn user_for_customer(&self, customer_id: Option<&str>) -> Result<Option<User>, AppError> {
        match customer_id {
            Some(customer_id) => self.users.get_user_by_customer_id(customer_id).await,
            None => Ok(None),
        }
    }
}

/// Parse the event's object as `T`. A known event type with an object we
/// cannot read is a server error so that Stripe retries it.
fn parse_object<T: DeserializeOwned>(event: &Event) -> Result<T, AppError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "cannot parse {} object for event {}: {}",
            event.event_type,
            event.id,
            e
        ))
    })
}

fn user_not_found(event: &Event) -> WebhookOutcome {
    tracing::warn!(
        event_id = %event.id,
        event_type = %event.event_type,
        "No user matches Stripe event"
    );
    WebhookOutcome::UserNotFound
}
