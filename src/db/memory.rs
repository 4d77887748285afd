// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local store for development and tests.
//!
//! Data lives in `DashMap`s and is lost on restart. Email uniqueness is
//! enforced atomically through the email index entry.

use crate::db::Store;
use crate::error::AppError;
use crate::models::{NewTodo, Todo, User};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// In-memory store. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    users: DashMap<String, User>,
    /// email -> user ID
    emails: DashMap<String, String>,
    todos: DashMap<i64, Todo>,
    next_todo_id: AtomicI64,
    fail_writes: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with a database error, as an unreachable
    /// store would. Reads keep working.
    pub fn fail_writes(&self, enabled: bool) {
        self.inner.fail_writes.store(enabled, Ordering::SeqCst);
    }

    fn check_writable(&self, op: &str) -> Result<(), AppError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(format!("{}: store unavailable", op)));
        }
        Ok(())
    }

    fn update_user<F>(&self, user_id: &str, op: &str, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut User),
    {
        self.check_writable(op)?;
        let mut user = self
            .inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::Database(format!("{}: user {} not found", op, user_id)))?;
        apply(&mut user);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.check_writable("create_user")?;
        match self.inner.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(
                    "An account for this email already exists".to_string(),
                ))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }
        self.inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.inner.users.get(user_id).map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let Some(user_id) = self.inner.emails.get(email).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.get_user(&user_id).await
    }

    async fn get_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .inner
            .users
            .iter()
            .find(|u| u.customer_id() == Some(customer_id))
            .map(|u| u.clone()))
    }

    async fn set_stripe_customer_id(
        &self,
        user_id: &str,
        customer_id: &str,
    ) -> Result<(), AppError> {
        self.update_user(user_id, "set_stripe_customer_id", |user| {
            user.stripe_customer_id = Some(customer_id.to_string());
        })
    }

    async fn set_paid_status(&self, user_id: &str, is_paid_user: bool) -> Result<(), AppError> {
        self.update_user(user_id, "set_paid_status", |user| {
            user.is_paid_user = is_paid_user;
        })
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.check_writable("delete_user")?;
        if let Some((_, user)) = self.inner.users.remove(user_id) {
            self.inner.emails.remove(&user.email);
        }
        Ok(())
    }

    async fn create_todo(&self, todo: NewTodo) -> Result<Todo, AppError> {
        self.check_writable("create_todo")?;
        let id = self.inner.next_todo_id.fetch_add(1, Ordering::SeqCst) + 1;
        let todo = todo.with_id(id);
        self.inner.todos.insert(id, todo.clone());
        Ok(todo)
    }

    async fn get_todo(&self, todo_id: i64) -> Result<Option<Todo>, AppError> {
        Ok(self.inner.todos.get(&todo_id).map(|t| t.clone()))
    }

    async fn list_todos_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Todo>, AppError> {
        let mut todos: Vec<Todo> = self
            .inner
            .todos
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.clone())
            .collect();
        // IDs are handed out in creation order
        todos.sort_by_key(|t| t.id);
        if let Some(limit) = limit {
            todos.truncate(limit);
        }
        Ok(todos)
    }

    async fn count_todos_for_user(&self, user_id: &str) -> Result<usize, AppError> {
        Ok(self
            .inner
            .todos
            .iter()
            .filter(|t| t.user_id == user_id)
            .count())
    }

    async fn update_todo(&self, todo: &Todo) -> Result<(), AppError> {
        self.check_writable("update_todo")?;
        match self.inner.todos.get_mut(&todo.id) {
            Some(mut stored) => {
                *stored = todo.clone();
                Ok(())
            }
            None => Err(AppError::Database(format!(
                "update_todo: todo {} not found",
                todo.id
            ))),
        }
    }

    async fn delete_todo(&self, todo_id: i64) -> Result<(), AppError> {
        self.check_writable("delete_todo")?;
        self.inner.todos.remove(&todo_id);
        Ok(())
    }

    async fn delete_todos_for_user(
        &self,
        user_id: &str,
        is_complete: Option<bool>,
    ) -> Result<usize, AppError> {
        self.check_writable("delete_todos_for_user")?;
        let matching: Vec<i64> = self
            .inner
            .todos
            .iter()
            .filter(|t| t.user_id == user_id && is_complete.map_or(true, |c| t.is_complete == c))
            .map(|t| t.id)
            .collect();

        // Other users' todos may be inserted concurrently; count only our removals.
        let deleted = matching
            .iter()
            .filter(|id| self.inner.todos.remove(*id).is_some())
            .count();
        Ok(deleted)
    }

    async fn delete_orphaned_todos(&self) -> Result<usize, AppError> {
        self.check_writable("delete_orphaned_todos")?;
        let orphaned: Vec<i64> = self
            .inner
            .todos
            .iter()
            .filter(|t| !self.inner.users.contains_key(&t.user_id))
            .map(|t| t.id)
            .collect();
        for id in &orphaned {
            self.inner.todos.remove(id);
        }
        Ok(orphaned.len())
    }
}
