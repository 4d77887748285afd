// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`Store`].
//!
//! Collections:
//! - `users` (document ID = user ID)
//! - `todos` (document ID = todo ID)
//!
//! Paid status and customer linkage are written with field masks so the two
//! can be updated independently without clobbering each other.

use crate::db::{collections, Store};
use crate::error::AppError;
use crate::models::{NewTodo, Todo, User};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Maximum concurrent owner lookups during the orphan sweep.
const MAX_CONCURRENT_DB_OPS: usize = 10;

/// Field-masked update of `users.is_paid_user`.
#[derive(Serialize, Deserialize)]
struct PaidStatusPatch {
    is_paid_user: bool,
}

/// Field-masked update of `users.stripe_customer_id`.
#[derive(Serialize, Deserialize)]
struct CustomerIdPatch {
    stripe_customer_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Fetch the first user whose `field` equals `value`.
    async fn find_user_by_field(&self, field: &str, value: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field(field).eq(value)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(format!("user lookup: {}", e)))?;
        Ok(users.into_iter().next())
    }

    /// Ensure a user document exists before a masked update, so that an
    /// update for a deleted user does not recreate a partial document.
    async fn require_user(&self, user_id: &str, op: &str) -> Result<(), AppError> {
        if self.get_user(user_id).await?.is_none() {
            return Err(AppError::Database(format!(
                "{}: user {} not found",
                op, user_id
            )));
        }
        Ok(())
    }

    async fn query_todos(
        &self,
        user_id: &str,
        is_complete: Option<bool>,
    ) -> Result<Vec<Todo>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::TODOS)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    is_complete.and_then(|c| q.field("is_complete").eq(c)),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(format!("todo query: {}", e)))
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Random positive 53-bit ID (safe as a JavaScript number).
fn generate_todo_id() -> i64 {
    (uuid::Uuid::new_v4().as_u128() >> 75) as i64
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        // Check-then-insert: concurrent signups with the same email can race.
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict(
                "An account for this email already exists".to_string(),
            ));
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("create_user: {}", e)))?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(format!("get_user {}: {}", user_id, e)))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_field("email", email).await
    }

    async fn get_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, AppError> {
        if customer_id.is_empty() {
            return Ok(None);
        }
        self.find_user_by_field("stripe_customer_id", customer_id)
            .await
    }

    async fn set_stripe_customer_id(
        &self,
        user_id: &str,
        customer_id: &str,
    ) -> Result<(), AppError> {
        self.require_user(user_id, "set_stripe_customer_id").await?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["stripe_customer_id"])
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&CustomerIdPatch {
                stripe_customer_id: customer_id.to_string(),
            })
            .execute()
            .await
            .map_err(|e| {
                AppError::Database(format!("set_stripe_customer_id {}: {}", user_id, e))
            })?;
        Ok(())
    }

    async fn set_paid_status(&self, user_id: &str, is_paid_user: bool) -> Result<(), AppError> {
        self.require_user(user_id, "set_paid_status").await?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["is_paid_user"])
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&PaidStatusPatch { is_paid_user })
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("set_paid_status {}: {}", user_id, e)))?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("delete_user {}: {}", user_id, e)))?;
        Ok(())
    }

    // ─── Todo Operations ─────────────────────────────────────────

    async fn create_todo(&self, todo: NewTodo) -> Result<Todo, AppError> {
        let todo = todo.with_id(generate_todo_id());

        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::TODOS)
            .document_id(todo.id.to_string())
            .object(&todo)
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("create_todo: {}", e)))?;
        Ok(todo)
    }

    async fn get_todo(&self, todo_id: i64) -> Result<Option<Todo>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TODOS)
            .obj()
            .one(&todo_id.to_string())
            .await
            .map_err(|e| AppError::Database(format!("get_todo {}: {}", todo_id, e)))
    }

    async fn list_todos_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Todo>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TODOS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)]);

        let query = match limit {
            Some(limit) => query.limit(limit as u32),
            None => query,
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(format!("list_todos_for_user {}: {}", user_id, e)))
    }

    async fn count_todos_for_user(&self, user_id: &str) -> Result<usize, AppError> {
        Ok(self.query_todos(user_id, None).await?.len())
    }

    async fn update_todo(&self, todo: &Todo) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TODOS)
            .document_id(todo.id.to_string())
            .object(todo)
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("update_todo {}: {}", todo.id, e)))?;
        Ok(())
    }

    async fn delete_todo(&self, todo_id: i64) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::TODOS)
            .document_id(todo_id.to_string())
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("delete_todo {}: {}", todo_id, e)))?;
        Ok(())
    }

    async fn delete_todos_for_user(
        &self,
        user_id: &str,
        is_complete: Option<bool>,
    ) -> Result<usize, AppError> {
        let todos = self.query_todos(user_id, is_complete).await?;
        self.batch_delete(&todos, collections::TODOS, |todo: &Todo| {
            todo.id.to_string()
        })
        .await?;

        tracing::debug!(user_id, count = todos.len(), "Deleted todos for user");
        Ok(todos.len())
    }

    async fn delete_orphaned_todos(&self) -> Result<usize, AppError> {
        let todos: Vec<Todo> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TODOS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(format!("list todos: {}", e)))?;

        let owners: HashSet<String> = todos.iter().map(|t| t.user_id.clone()).collect();

        let missing: HashSet<String> = stream::iter(owners)
            .map(|user_id| async move {
                let exists = self.get_user(&user_id).await?.is_some();
                Ok::<_, AppError>((user_id, exists))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(String, bool), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, AppError>>()?
            .into_iter()
            .filter(|(_, exists)| !exists)
            .map(|(user_id, _)| user_id)
            .collect();

        let orphaned: Vec<Todo> = todos
            .into_iter()
            .filter(|t| missing.contains(&t.user_id))
            .collect();

        self.batch_delete(&orphaned, collections::TODOS, |todo: &Todo| {
            todo.id.to_string()
        })
        .await?;

        Ok(orphaned.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patches_carry_only_their_field() {
        let paid = serde_json::to_value(PaidStatusPatch { is_paid_user: true }).unwrap();
        assert_eq!(paid, serde_json::json!({"is_paid_user": true}));
        let back: PaidStatusPatch = serde_json::from_value(paid).unwrap();
        assert!(back.is_paid_user);

        let customer = serde_json::to_value(CustomerIdPatch {
            stripe_customer_id: "cus_1".to_string(),
        })
        .unwrap();
        assert_eq!(customer, serde_json::json!({"stripe_customer_id": "cus_1"}));
        let back: CustomerIdPatch = serde_json::from_value(customer).unwrap();
        assert_eq!(back.stripe_customer_id, "cus_1");
    }

    #[test]
    fn test_todo_ids_are_positive_and_js_safe() {
        for _ in 0..1000 {
            let id = generate_todo_id();
            assert!(id >= 0);
            assert!(id < (1i64 << 53));
        }
    }
}
