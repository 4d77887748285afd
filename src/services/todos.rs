// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Todo operations with ownership checks and quota enforcement.
//!
//! Every per-todo operation looks the todo up first (`NotFound`) and then
//! checks ownership (`Forbidden`), so a failed check never mutates anything.

use crate::db::SharedStore;
use crate::error::AppError;
use crate::models::{NewTodo, Todo, User};
use crate::services::quota::{can_create_todo, FREE_TIER_TODO_LIMIT};
use crate::time_utils::format_sortable_rfc3339;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Todo list view for the current user.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
    pub can_create_todo: bool,
    /// Cap on stored todos; absent for paid users.
    pub todo_limit: Option<usize>,
}

#[derive(Clone)]
pub struct TodoService {
    db: SharedStore,
}

impl TodoService {
    pub fn new(db: SharedStore) -> Self {
        Self { db }
    }

    /// The user's todos in creation order. Free users see at most
    /// [`FREE_TIER_TODO_LIMIT`] of them.
    pub async fn list_todos(&self, user: &User) -> Result<TodoListResponse, AppError> {
        let limit = (!user.is_paid_user).then_some(FREE_TIER_TODO_LIMIT);
        let todos = self.db.list_todos_for_user(&user.id, limit).await?;
        let count = self.db.count_todos_for_user(&user.id).await?;

        Ok(TodoListResponse {
            todos,
            can_create_todo: can_create_todo(user, count),
            todo_limit: limit,
        })
    }

    /// Create a todo for `user_id`.
    ///
    /// The quota decision uses the user record and todo count as they are in
    /// the store right now.
    pub async fn create_todo(&self, user_id: &str, description: &str) -> Result<Todo, AppError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::BadRequest(
                "Todo description must not be empty".to_string(),
            ));
        }

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        let count = self.db.count_todos_for_user(user_id).await?;

        if !can_create_todo(&user, count) {
            tracing::info!(user_id, count, "Todo quota reached");
            return Err(AppError::QuotaExceeded {
                limit: FREE_TIER_TODO_LIMIT,
            });
        }

        let todo = self
            .db
            .create_todo(NewTodo {
                user_id: user_id.to_string(),
                description: html_escape::encode_safe(description).into_owned(),
                created_at: format_sortable_rfc3339(chrono::Utc::now()),
            })
            .await?;

        tracing::info!(user_id, todo_id = todo.id, "Todo created");
        Ok(todo)
    }

    /// Fetch a todo owned by `user_id`.
    pub async fn get_todo(&self, user_id: &str, todo_id: i64) -> Result<Todo, AppError> {
        let todo = self
            .db
            .get_todo(todo_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("todo {}", todo_id)))?;

        if todo.user_id != user_id {
            tracing::warn!(user_id, todo_id, "Access to another user's todo denied");
            return Err(AppError::Forbidden(
                "This todo belongs to another user".to_string(),
            ));
        }

        Ok(todo)
    }

    /// Flip a todo's completion state.
    pub async fn toggle_todo(&self, user_id: &str, todo_id: i64) -> Result<Todo, AppError> {
        let todo = self.get_todo(user_id, todo_id).await?;
        let todo = Todo {
            is_complete: !todo.is_complete,
            ..todo
        };
        self.db.update_todo(&todo).await?;

        tracing::debug!(user_id, todo_id, is_complete = todo.is_complete, "Todo toggled");
        Ok(todo)
    }

    pub async fn delete_todo(&self, user_id: &str, todo_id: i64) -> Result<(), AppError> {
        self.get_todo(user_id, todo_id).await?;
        self.db.delete_todo(todo_id).await?;

        tracing::info!(user_id, todo_id, "Todo deleted");
        Ok(())
    }

    /// Delete the user's completed todos. Returns how many were removed.
    pub async fn clear_completed(&self, user_id: &str) -> Result<usize, AppError> {
        let count = self.db.delete_todos_for_user(user_id, Some(true)).await?;
        tracing::info!(user_id, count, "Cleared completed todos");
        Ok(count)
    }

    /// Remove todos whose owner no longer exists.
    pub async fn delete_orphaned_todos(&self) -> Result<usize, AppError> {
        let count = self.db.delete_orphaned_todos().await?;
        tracing::info!(count, "Deleted orphaned todos");
        Ok(count)
    }
}
