// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Todo API tests: quota enforcement, ownership checks and list views.

use axum::http::StatusCode;
use serde_json::json;
use todo_billing::db::Store;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_create_and_list() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", false).await;
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    let response = app
        .clone()
        .oneshot(common::authed_request(
            "POST",
            "/api/todos",
            &token,
            Some(json!({"description": "buy <milk>"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = common::body_json(response).await;
    assert_eq!(json["todos"].as_array().unwrap().len(), 1);
    assert_eq!(json["todos"][0]["description"], "buy &lt;milk&gt;");
    assert_eq!(json["todos"][0]["is_complete"], false);
    assert_eq!(json["can_create_todo"], true);
    assert_eq!(json["todo_limit"], 10);

    let response = app
        .oneshot(common::authed_request("GET", "/api/todos", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::body_json(response).await["todos"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_empty_description_rejected() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", false).await;
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::authed_request(
            "POST",
            "/api/todos",
            &token,
            Some(json!({"description": "   "})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(db.count_todos_for_user("user-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_free_user_quota() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", false).await;
    common::seed_todos(&db, "user-1", 9).await;
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    // Tenth todo fits, and the view reports the list as full
    let response = app
        .clone()
        .oneshot(common::authed_request(
            "POST",
            "/api/todos",
            &token,
            Some(json!({"description": "tenth"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(common::body_json(response).await["can_create_todo"], false);

    // Eleventh is refused without touching the store
    let response = app
        .oneshot(common::authed_request(
            "POST",
            "/api/todos",
            &token,
            Some(json!({"description": "eleventh"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(common::body_json(response).await["error"], "quota_exceeded");
    assert_eq!(db.count_todos_for_user("user-1").await.unwrap(), 10);
}

#[tokio::test]
async fn test_paid_user_unlimited() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", true).await;
    common::seed_todos(&db, "user-1", 25).await;
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::authed_request(
            "POST",
            "/api/todos",
            &token,
            Some(json!({"description": "twenty-sixth"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = common::body_json(response).await;
    assert_eq!(json["todos"].as_array().unwrap().len(), 26);
    assert_eq!(json["can_create_todo"], true);
    assert!(json["todo_limit"].is_null());
}

#[tokio::test]
async fn test_delete_frees_quota() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", false).await;
    common::seed_todos(&db, "user-1", 10).await;
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);
    let first = db.list_todos_for_user("user-1", Some(1)).await.unwrap()[0].id;

    let response = app
        .clone()
        .oneshot(common::authed_request(
            "DELETE",
            &format!("/api/todos/{}", first),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["can_create_todo"], true);

    let response = app
        .oneshot(common::authed_request(
            "POST",
            "/api/todos",
            &token,
            Some(json!({"description": "fits again"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_other_users_todo_is_forbidden() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "owner", "owner@example.com", false).await;
    common::seed_user(&db, "intruder", "intruder@example.com", false).await;
    common::seed_todos(&db, "owner", 1).await;
    let todo_id = db.list_todos_for_user("owner", None).await.unwrap()[0].id;
    let token = common::create_test_jwt("intruder", &state.config.jwt_signing_key);

    for (method, uri) in [
        ("GET", format!("/api/todos/{}", todo_id)),
        ("POST", format!("/api/todos/{}/toggle", todo_id)),
        ("DELETE", format!("/api/todos/{}", todo_id)),
    ] {
        let response = app
            .clone()
            .oneshot(common::authed_request(method, &uri, &token, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);

        let json = common::body_json(response).await;
        assert_eq!(json["error"], "forbidden");
        assert!(json.get("todos").is_none());
    }

    let todo = db.get_todo(todo_id).await.unwrap().unwrap();
    assert!(!todo.is_complete);
}

#[tokio::test]
async fn test_missing_todo_is_not_found() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", false).await;
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::authed_request(
            "POST",
            "/api/todos/424242/toggle",
            &token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_toggle_and_clear_completed() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", false).await;
    common::seed_todos(&db, "user-1", 3).await;
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);
    let first = db.list_todos_for_user("user-1", Some(1)).await.unwrap()[0].id;

    let response = app
        .clone()
        .oneshot(common::authed_request(
            "POST",
            &format!("/api/todos/{}/toggle", first),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["todos"][0]["is_complete"], true);

    let response = app
        .oneshot(common::authed_request(
            "DELETE",
            "/api/todos/completed",
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::body_json(response).await["todos"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
    assert!(db.get_todo(first).await.unwrap().is_none());
}

#[tokio::test]
async fn test_free_list_capped_after_downgrade() {
    let (app, state, db) = common::create_test_app();
    common::seed_user(&db, "user-1", "ada@example.com", false).await;
    common::seed_todos(&db, "user-1", 14).await;
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::authed_request("GET", "/api/todos", &token, None))
        .await
        .unwrap();

    let json = common::body_json(response).await;
    assert_eq!(json["todos"].as_array().unwrap().len(), 10);
    assert_eq!(json["todos"][0]["description"], "todo 0");
    assert_eq!(json["can_create_todo"], false);
}
