// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process cache of user records.
//!
//! Users are keyed by ID, with secondary indices by email and by Stripe
//! customer ID so that every lookup is a direct map hit. Entries expire after
//! a fixed TTL and are evicted lazily on access.

use crate::config::MAX_USER_CACHE_TTL_SECS;
use crate::models::User;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Cached user with expiry information.
#[derive(Clone)]
struct CachedUser {
    user: User,
    expires_at: DateTime<Utc>,
}

/// Shared user cache. Cloning shares the underlying maps.
#[derive(Clone)]
pub struct UserCache {
    by_id: Arc<DashMap<String, CachedUser>>,
    /// email -> user ID
    by_email: Arc<DashMap<String, String>>,
    /// Stripe customer ID -> user ID
    by_customer_id: Arc<DashMap<String, String>>,
    ttl: Duration,
}

impl UserCache {
    /// `ttl_secs` is clamped to `0..=MAX_USER_CACHE_TTL_SECS`.
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            by_id: Arc::new(DashMap::new()),
            by_email: Arc::new(DashMap::new()),
            by_customer_id: Arc::new(DashMap::new()),
            ttl: Duration::seconds(ttl_secs.clamp(0, MAX_USER_CACHE_TTL_SECS)),
        }
    }

    /// Insert or refresh a user, replacing any stale index keys.
    pub fn insert(&self, user: &User) {
        self.invalidate(&user.id);

        self.by_email.insert(user.email.clone(), user.id.clone());
        if let Some(customer_id) = user.customer_id() {
            self.by_customer_id
                .insert(customer_id.to_string(), user.id.clone());
        }
        self.by_id.insert(
            user.id.clone(),
            CachedUser {
                user: user.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    pub fn get_by_id(&self, user_id: &str) -> Option<User> {
        let cached = self.by_id.get(user_id).map(|c| c.clone())?;
        if cached.expires_at <= Utc::now() {
            self.invalidate(user_id);
            return None;
        }
        Some(cached.user)
    }

    pub fn get_by_email(&self, email: &str) -> Option<User> {
        let user_id = self.by_email.get(email).map(|id| id.clone())?;
        self.get_by_id(&user_id)
    }

    pub fn get_by_customer_id(&self, customer_id: &str) -> Option<User> {
        let user_id = self.by_customer_id.get(customer_id).map(|id| id.clone())?;
        self.get_by_id(&user_id)
    }

    /// Remove a user and all of its index keys.
    pub fn invalidate(&self, user_id: &str) {
        if let Some((_, cached)) = self.by_id.remove(user_id) {
            self.by_email
                .remove_if(&cached.user.email, |_, id| id == user_id);
            if let Some(customer_id) = cached.user.customer_id() {
                self.by_customer_id
                    .remove_if(customer_id, |_, id| id == user_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
