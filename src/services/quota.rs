// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Free-tier todo quota.

use crate::models::User;

/// Maximum number of todos a non-paying user may hold.
pub const FREE_TIER_TODO_LIMIT: usize = 10;

/// Whether `user` may create another todo given how many they already have.
///
/// Callers must pass a user record and count read from the store for this
/// decision, never cached values.
pub fn can_create_todo(user: &User, current_todo_count: usize) -> bool {
    user.is_paid_user || current_todo_count < FREE_TIER_TODO_LIMIT
}
