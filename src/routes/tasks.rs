// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance task routes.
//!
//! These endpoints are called by a scheduler, not directly by users. They
//! are protected by the shared tasks bearer token (see `require_tasks_auth`).

use crate::error::Result;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Task handler routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/cleanup-orphans", post(cleanup_orphans))
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub deleted: usize,
}

/// Delete todos whose owner no longer exists.
async fn cleanup_orphans(State(state): State<Arc<AppState>>) -> Result<Json<CleanupResponse>> {
    let deleted = state.todos.delete_orphaned_todos().await?;
    Ok(Json(CleanupResponse { deleted }))
}
