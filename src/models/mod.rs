// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod todo;
pub mod user;

pub use todo::{NewTodo, Todo};
pub use user::{User, UserResponse};
