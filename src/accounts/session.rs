//! Cookie-backed login sessions.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::db::{DbPool, User};
use crate::AppState;

pub const SESSION_COOKIE: &str = "superlists_session";

/// Upper bound on a session's lifetime, whatever the config asks for
const MAX_SESSION_DAYS: i64 = 3650;

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Open a session for `user` and return the cookie value identifying it
pub async fn start_session(
    db: &DbPool,
    user: &User,
    ttl_days: i64,
) -> Result<String, sqlx::Error> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(ttl_days.clamp(0, MAX_SESSION_DAYS));

    // Expired sessions are never read again
    sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(timestamp(now))
        .execute(db)
        .await?;

    let token = generate_token();
    sqlx::query(
        "INSERT INTO sessions (id, user_email, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&user.email)
    .bind(hash_token(&token))
    .bind(timestamp(expires_at))
    .bind(timestamp(now))
    .execute(db)
    .await?;

    tracing::info!(email = %user.email, "Started session");
    Ok(token)
}

/// The user behind a live session token
pub async fn session_user(db: &DbPool, token: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT u.* FROM sessions s
        JOIN users u ON u.email = s.user_email
        WHERE s.token_hash = ? AND s.expires_at > ?
        "#,
    )
    .bind(hash_token(token))
    .bind(timestamp(Utc::now()))
    .fetch_optional(db)
    .await
}

pub async fn end_session(db: &DbPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(db)
        .await?;
    Ok(())
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// The logged-in user for this request, if any
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(CurrentUser(None));
        };

        let user = session_user(&state.db, cookie.value()).await.map_err(|e| {
            tracing::error!("Failed to look up session: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        Ok(CurrentUser(user))
    }
}
