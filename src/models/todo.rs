// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Todo item model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Todo {
    /// Store-assigned ID (also used as document ID)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    /// Owning user ID
    pub user_id: String,
    /// HTML-escaped description
    pub description: String,
    pub is_complete: bool,
    /// Creation time (RFC 3339), used for list ordering
    pub created_at: String,
}

/// A todo that has not been assigned an ID yet.
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub user_id: String,
    pub description: String,
    pub created_at: String,
}

impl NewTodo {
    /// Attach the store-assigned ID. New todos always start incomplete.
    pub fn with_id(self, id: i64) -> Todo {
        Todo {
            id,
            user_id: self.user_id,
            description: self.description,
            is_complete: false,
            created_at: self.created_at,
        }
    }
}
