// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use todo_billing::config::Config;
use todo_billing::db::{FirestoreDb, MemoryDb, Store};
use todo_billing::models::{NewTodo, User};
use todo_billing::routes::create_router;
use todo_billing::services::password::hash_password;
use todo_billing::services::StripeClient;
use todo_billing::services::stripe_webhook::{sign_payload, SIGNATURE_HEADER};
use todo_billing::AppState;

/// Password used for seeded users.
#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by the in-memory store.
/// Returns the router, the shared state and a handle on the store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryDb) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>, MemoryDb) {
    let db = MemoryDb::new();
    let (app, state) = create_test_app_on(config, db.clone());
    (app, state, db)
}

/// Another app instance over an existing store, as a second replica would be.
#[allow(dead_code)]
pub fn create_test_app_on(config: Config, db: MemoryDb) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Arc::new(db)));
    (create_router(state.clone()), state)
}

/// App instance whose Stripe client talks to `stripe_base_url`.
#[allow(dead_code)]
pub fn create_test_app_with_stripe(
    stripe_base_url: &str,
) -> (axum::Router, Arc<AppState>, MemoryDb) {
    let config = Config::test_default();
    let stripe = StripeClient::with_base_url(
        config.stripe_api_key.clone(),
        stripe_base_url.to_string(),
    );
    let db = MemoryDb::new();
    let state = Arc::new(AppState::with_stripe(config, Arc::new(db.clone()), stripe));
    (create_router(state.clone()), state, db)
}

/// Create a test JWT token.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    todo_billing::middleware::auth::create_jwt(user_id, signing_key).unwrap()
}

/// JWT that expired an hour ago.
#[allow(dead_code)]
pub fn create_expired_jwt(user_id: &str, signing_key: &[u8]) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use todo_billing::middleware::auth::Claims;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: user_id.to_string(),
            iat: now - 7200,
            exp: now - 3600,
        },
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

/// Insert a user directly into the store.
#[allow(dead_code)]
pub async fn seed_user(db: &MemoryDb, id: &str, email: &str, is_paid_user: bool) -> User {
    let user = User {
        id: id.to_string(),
        name: "Test User".to_string(),
        email: email.to_string(),
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        is_paid_user,
        stripe_customer_id: None,
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };
    db.create_user(&user).await.unwrap();
    user
}

/// Insert `count` todos for `user_id` directly into the store.
#[allow(dead_code)]
pub async fn seed_todos(db: &MemoryDb, user_id: &str, count: usize) {
    for i in 0..count {
        db.create_todo(NewTodo {
            user_id: user_id.to_string(),
            description: format!("todo {}", i),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
        .await
        .unwrap();
    }
}

/// Authenticated JSON request.
#[allow(dead_code)]
pub fn authed_request(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Unauthenticated JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Webhook request signed with `secret` at the current time.
#[allow(dead_code)]
pub fn signed_webhook_request(payload: &[u8], secret: &str) -> Request<Body> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, sign_payload(payload, secret, now).unwrap())
        .body(Body::from(payload.to_vec()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All `Set-Cookie` header values on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
