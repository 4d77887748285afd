// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: signup, login and logout.

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, current_user, removal_cookie, session_cookie};
use crate::models::{User, UserResponse};
use crate::services::{LoginRequest, SignupRequest};
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Auth routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Attach a fresh session for `user` to the cookie jar.
fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar> {
    let token = create_jwt(&user.id, &state.config.jwt_signing_key).map_err(AppError::Internal)?;
    Ok(jar.add(session_cookie(token, !state.config.is_local())))
}

/// Create an account and log it in.
async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<UserResponse>)> {
    let user = state.users.signup(request).await?;
    let jar = start_session(&state, jar, &user)?;

    Ok((StatusCode::CREATED, jar, Json(UserResponse::from(&user))))
}

/// Log in with email and password.
///
/// A request that already carries a valid session is answered with the
/// current user without checking credentials again.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>)> {
    if let Some(user) = current_user(&state, &jar, &headers).await? {
        tracing::debug!(user_id = %user.id, "Login with active session");
        return Ok((jar, Json(UserResponse::from(&user))));
    }

    let user = state.users.login(request).await?;
    let jar = start_session(&state, jar, &user)?;

    Ok((jar, Json(UserResponse::from(&user))))
}

/// Clear the session cookie.
async fn logout(jar: CookieJar) -> (StatusCode, CookieJar) {
    (StatusCode::NO_CONTENT, jar.remove(removal_cookie()))
}
