// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance endpoint authentication and orphan cleanup tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use todo_billing::db::Store;
use tower::ServiceExt;

mod common;

fn cleanup_request(token: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri("/tasks/cleanup-orphans");
    let builder = match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
        None => builder,
    };
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_cleanup_requires_token() {
    let (app, _, _) = common::create_test_app();

    let response = app.oneshot(cleanup_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cleanup_rejects_wrong_token() {
    let (app, state, db) = common::create_test_app();
    common::seed_todos(&db, "gone", 2).await;

    // A user session is not a tasks token
    let session = common::create_test_jwt("gone", &state.config.jwt_signing_key);
    for token in ["wrong_token", session.as_str()] {
        let response = app.clone().oneshot(cleanup_request(Some(token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
    assert_eq!(db.count_todos_for_user("gone").await.unwrap(), 2);
}

#[tokio::test]
async fn test_cleanup_deletes_only_orphans() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", false).await;
    common::seed_todos(&db, "user-1", 3).await;
    common::seed_todos(&db, "gone", 2).await;

    let response = app
        .oneshot(cleanup_request(Some(&state.config.tasks_auth_token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["deleted"], 2);
    assert_eq!(db.count_todos_for_user("user-1").await.unwrap(), 3);
    assert_eq!(db.count_todos_for_user("gone").await.unwrap(), 0);
}
