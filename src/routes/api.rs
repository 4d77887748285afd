// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::{removal_cookie, AuthUser};
use crate::models::UserResponse;
use crate::services::TodoListResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/account", delete(delete_account))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/completed", delete(clear_completed))
        .route("/api/todos/{id}", get(get_todo).delete(delete_todo))
        .route("/api/todos/{id}/toggle", post(toggle_todo))
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user profile.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.user))
}

// ─── Account Deletion ────────────────────────────────────────

/// Response for account deletion.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub todos_deleted: usize,
}

/// Delete the account and all of its todos, and end the session.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DeleteAccountResponse>)> {
    let todos_deleted = state.users.delete_account(&auth.user.id).await?;

    Ok((
        jar.remove(removal_cookie()),
        Json(DeleteAccountResponse {
            success: true,
            todos_deleted,
        }),
    ))
}

// ─── Todos ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub description: String,
}

async fn list_todos(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TodoListResponse>> {
    Ok(Json(state.todos.list_todos(&auth.user).await?))
}

/// Create a todo and return the refreshed list.
async fn create_todo(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoListResponse>)> {
    state
        .todos
        .create_todo(&auth.user.id, &request.description)
        .await?;

    let view = state.todos.list_todos(&auth.user).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_todo(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(todo_id): Path<i64>,
) -> Result<Json<crate::models::Todo>> {
    Ok(Json(state.todos.get_todo(&auth.user.id, todo_id).await?))
}

async fn toggle_todo(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(todo_id): Path<i64>,
) -> Result<Json<TodoListResponse>> {
    state.todos.toggle_todo(&auth.user.id, todo_id).await?;
    Ok(Json(state.todos.list_todos(&auth.user).await?))
}

async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(todo_id): Path<i64>,
) -> Result<Json<TodoListResponse>> {
    state.todos.delete_todo(&auth.user.id, todo_id).await?;
    Ok(Json(state.todos.list_todos(&auth.user).await?))
}

async fn clear_completed(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TodoListResponse>> {
    state.todos.clear_completed(&auth.user.id).await?;
    Ok(Json(state.todos.list_todos(&auth.user).await?))
}
