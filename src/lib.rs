// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Todo-Billing: a todo list service with Stripe subscription billing
//!
//! This crate provides the backend API for user accounts, per-user todo
//! lists with a free-tier quota, and paid upgrades through Stripe Checkout.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SharedStore;
use services::{BillingReconciler, StripeClient, TodoService, UserCache, UserService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: UserService,
    pub todos: TodoService,
    pub billing: BillingReconciler,
    pub stripe: StripeClient,
}

impl AppState {
    /// Wire up the services over `db`, talking to the live Stripe API.
    pub fn new(config: Config, db: SharedStore) -> Self {
        let stripe = StripeClient::new(config.stripe_api_key.clone());
        Self::with_stripe(config, db, stripe)
    }

    /// Wire up the services with a caller-supplied Stripe client.
    pub fn with_stripe(config: Config, db: SharedStore, stripe: StripeClient) -> Self {
        let users = UserService::new(db.clone(), UserCache::new(config.user_cache_ttl_secs));
        Self {
            todos: TodoService::new(db),
            billing: BillingReconciler::new(users.clone()),
            stripe,
            users,
            config,
        }
    }
}
