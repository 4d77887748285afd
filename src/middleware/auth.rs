// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT session middleware.
//!
//! The session token carries only the user ID. The user record itself is
//! read from the store on every request, bypassing the user cache, so
//! billing changes made on any instance apply immediately.

use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "todo_session";

/// Session lifetime.
pub const SESSION_TTL_DAYS: i64 = 30;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Pull the session token from the cookie, then the `Authorization` header.
pub fn session_token(jar: &CookieJar, headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Decode a session token into the user ID it carries.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> Result<String, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Session token rejected");
        AppError::InvalidToken
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::InvalidToken);
    }
    Ok(token_data.claims.sub)
}

/// Resolve the session on a request to a live user, if there is one.
pub async fn current_user(
    state: &AppState,
    jar: &CookieJar,
    headers: &axum::http::HeaderMap,
) -> Result<Option<User>, AppError> {
    let Some(token) = session_token(jar, headers) else {
        return Ok(None);
    };
    let Ok(user_id) = verify_jwt(&token, &state.config.jwt_signing_key) else {
        return Ok(None);
    };
    state.users.get_user_fresh(&user_id).await
}

/// Middleware that requires a valid session for an existing user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, request.headers()).ok_or(AppError::Unauthorized)?;
    let user_id = verify_jwt(&token, &state.config.jwt_signing_key)?;

    let Some(user) = state.users.get_user_fresh(&user_id).await? else {
        tracing::info!(user_id = %user_id, "Session for deleted user rejected");
        return Err(AppError::Unauthorized);
    };

    request.extensions_mut().insert(AuthUser { user });

    Ok(next.run(request).await)
}

/// Create a JWT for a user session.
pub fn create_jwt(user_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + (SESSION_TTL_DAYS as usize) * 24 * 60 * 60,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Build the session cookie for `token`. `Secure` is set unless the app is
/// served from localhost.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Cookie that clears the session.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    #[test]
    fn test_jwt_round_trip() {
        let token = create_jwt("user-1", KEY).unwrap();
        assert_eq!(verify_jwt(&token, KEY).unwrap(), "user-1");
    }

    #[test]
    fn test_jwt_wrong_key() {
        let token = create_jwt("user-1", KEY).unwrap();
        assert!(matches!(
            verify_jwt(&token, b"another_key_entirely_32_bytes!!"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_session_token_prefers_cookie() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "from-cookie"));
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());

        assert_eq!(
            session_token(&jar, &headers).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(
            session_token(&CookieJar::new(), &headers).as_deref(),
            Some("from-header")
        );
        assert_eq!(
            session_token(&CookieJar::new(), &axum::http::HeaderMap::new()),
            None
        );
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok".to_string(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
