// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account service: signup, login, cached lookups and billing-field writes.
//!
//! Reads go through the [`UserCache`]; every write invalidates the affected
//! user before returning, whether or not the write succeeded.

use crate::db::SharedStore;
use crate::error::AppError;
use crate::models::User;
use crate::services::password::{hash_password, verify_password};
use crate::services::user_cache::UserCache;
use crate::time_utils::format_utc_rfc3339;
use serde::Deserialize;
use validator::Validate;

/// Signup form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "You must provide a user name."))]
    pub name: String,
    #[validate(
        length(min = 1, message = "You must provide an email."),
        email(message = "You must provide a valid email.")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "You must provide a password."))]
    pub password: String,
}

/// Login form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "You've provided an invalid email."))]
    pub email: String,
    pub password: String,
}

/// User account operations.
#[derive(Clone)]
pub struct UserService {
    db: SharedStore,
    cache: UserCache,
}

impl UserService {
    pub fn new(db: SharedStore, cache: UserCache) -> Self {
        Self { db, cache }
    }

    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    /// Create a free-tier account.
    ///
    /// Fields are trimmed and the display name is HTML-escaped before
    /// validation. Fails with `Conflict` when the email is already registered.
    pub async fn signup(&self, request: SignupRequest) -> Result<User, AppError> {
        let request = SignupRequest {
            name: html_escape::encode_safe(request.name.trim()).into_owned(),
            email: request.email.trim().to_string(),
            password: request.password.trim().to_string(),
        };
        request.validate()?;

        if self.db.get_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict(
                "An account for this email already exists".to_string(),
            ));
        }

        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            email: request.email,
            password_hash,
            is_paid_user: false,
            stripe_customer_id: None,
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        self.db.create_user(&user).await?;
        tracing::info!(user_id = %user.id, "User signed up");

        Ok(user)
    }

    /// Check credentials. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, request: LoginRequest) -> Result<User, AppError> {
        let request = LoginRequest {
            email: request.email.trim().to_string(),
            password: request.password.trim().to_string(),
        };
        request.validate()?;

        let Some(user) = self.db.get_user_by_email(&request.email).await? else {
            tracing::debug!("Login attempt for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let password = request.password;
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        if !valid {
            tracing::info!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        self.cache.insert(&user);
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Look up a user by ID, serving from the cache when possible.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        if let Some(user) = self.cache.get_by_id(user_id) {
            return Ok(Some(user));
        }
        let user = self.db.get_user(user_id).await?;
        if let Some(user) = &user {
            self.cache.insert(user);
        }
        Ok(user)
    }

    /// Read a user straight from the store and refresh the cached copy.
    ///
    /// Sessions resolve through here: paid status can change on another
    /// instance, which never invalidates this instance's cache.
    pub async fn get_user_fresh(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let user = self.db.get_user(user_id).await?;
        match &user {
            Some(user) => self.cache.insert(user),
            None => self.cache.invalidate(user_id),
        }
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        if let Some(user) = self.cache.get_by_email(email) {
            return Ok(Some(user));
        }
        let user = self.db.get_user_by_email(email).await?;
        if let Some(user) = &user {
            self.cache.insert(user);
        }
        Ok(user)
    }

    pub async fn get_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, AppError> {
        if customer_id.is_empty() {
            return Ok(None);
        }
        if let Some(user) = self.cache.get_by_customer_id(customer_id) {
            return Ok(Some(user));
        }
        let user = self.db.get_user_by_customer_id(customer_id).await?;
        if let Some(user) = &user {
            self.cache.insert(user);
        }
        Ok(user)
    }

    /// Link a Stripe customer to a user who has none.
    ///
    /// Re-linking the same customer is a no-op. An existing link to a
    /// different customer is kept and the mismatch is logged. Returns whether
    /// a write happened.
    pub async fn attach_customer_id(
        &self,
        user_id: &str,
        customer_id: &str,
    ) -> Result<bool, AppError> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

        match user.customer_id() {
            Some(existing) if existing == customer_id => {
                tracing::debug!(user_id, customer_id, "Stripe customer already linked");
                return Ok(false);
            }
            Some(existing) => {
                tracing::warn!(
                    user_id,
                    existing_customer_id = existing,
                    new_customer_id = customer_id,
                    "User already linked to a different Stripe customer, keeping existing"
                );
                return Ok(false);
            }
            None => {}
        }

        let result = self.db.set_stripe_customer_id(user_id, customer_id).await;
        self.cache.invalidate(user_id);
        result?;

        tracing::info!(user_id, customer_id, "Linked Stripe customer to user");
        Ok(true)
    }

    pub async fn set_paid_status(&self, user_id: &str, is_paid_user: bool) -> Result<(), AppError> {
        let result = self.db.set_paid_status(user_id, is_paid_user).await;
        self.cache.invalidate(user_id);
        result?;

        tracing::info!(user_id, is_paid_user, "Updated paid status");
        Ok(())
    }

    /// Delete a user and all of their todos. Returns the number of todos removed.
    ///
    /// Todos go first; if the user delete then fails, the user still exists
    /// and the request can be repeated.
    pub async fn delete_account(&self, user_id: &str) -> Result<usize, AppError> {
        let todos = self.db.delete_todos_for_user(user_id, None).await;
        let result = match todos {
            Ok(count) => self.db.delete_user(user_id).await.map(|_| count),
            Err(e) => Err(e),
        };
        self.cache.invalidate(user_id);
        let count = result?;

        tracing::info!(user_id, todos_deleted = count, "Account deleted");
        Ok(count)
    }
}
