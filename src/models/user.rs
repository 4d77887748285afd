// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User account stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user ID (UUID v4, also used as document ID)
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address (unique across users)
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Paid subscriber flag, drives quota enforcement
    #[serde(default)]
    pub is_paid_user: bool,
    /// Stripe customer ID (`cus_...`), set once the user has paid
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
}

impl User {
    /// Stripe customer ID, treating an empty string as unset.
    pub fn customer_id(&self) -> Option<&str> {
        self.stripe_customer_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

/// Public view of a user (no credentials).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_paid_user: bool,
    pub has_billing_account: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            is_paid_user: user.is_paid_user,
            has_billing_account: user.customer_id().is_some(),
        }
    }
}
