// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Store`] is the contract the services consume. Lookups return `Ok(None)`
//! when nothing matches, which is distinct from an `Err` (store failure).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{NewTodo, Todo, User};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TODOS: &str = "todos";
}

/// Shared handle to the configured store.
pub type SharedStore = Arc<dyn Store>;

/// Persistence for users and todos.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    /// Insert a new user. Fails with `Conflict` if the email is taken.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Look up a user by Stripe customer ID (`cus_...`).
    async fn get_user_by_customer_id(&self, customer_id: &str)
        -> Result<Option<User>, AppError>;

    async fn set_stripe_customer_id(
        &self,
        user_id: &str,
        customer_id: &str,
    ) -> Result<(), AppError>;

    async fn set_paid_status(&self, user_id: &str, is_paid_user: bool) -> Result<(), AppError>;

    /// Delete a user record. Their todos are left for the caller.
    async fn delete_user(&self, user_id: &str) -> Result<(), AppError>;

    // ─── Todos ───────────────────────────────────────────────────

    /// Insert a todo and return it with its assigned ID.
    async fn create_todo(&self, todo: NewTodo) -> Result<Todo, AppError>;

    async fn get_todo(&self, todo_id: i64) -> Result<Option<Todo>, AppError>;

    /// A user's todos in creation order, at most `limit` when given.
    async fn list_todos_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Todo>, AppError>;

    async fn count_todos_for_user(&self, user_id: &str) -> Result<usize, AppError>;

    async fn update_todo(&self, todo: &Todo) -> Result<(), AppError>;

    async fn delete_todo(&self, todo_id: i64) -> Result<(), AppError>;

    /// Delete a user's todos, optionally only those with the given status.
    /// Returns the number deleted.
    async fn delete_todos_for_user(
        &self,
        user_id: &str,
        is_complete: Option<bool>,
    ) -> Result<usize, AppError>;

    /// Delete todos whose owner no longer exists. Returns the number deleted.
    async fn delete_orphaned_todos(&self) -> Result<usize, AppError>;
}
