// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod billing;
pub mod password;
pub mod quota;
pub mod stripe;
pub mod stripe_webhook;
pub mod todos;
pub mod user_cache;
pub mod users;

pub use billing::{BillingReconciler, CheckoutSummary, WebhookOutcome};
pub use quota::{can_create_todo, FREE_TIER_TODO_LIMIT};
pub use stripe::StripeClient;
pub use todos::{TodoListResponse, TodoService};
pub use user_cache::UserCache;
pub use users::{LoginRequest, SignupRequest, UserService};
