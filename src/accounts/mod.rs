//! Passwordless accounts.
//!
//! A login link carries a token uid; redeeming it resolves (or creates) the
//! user bound to the token's email. Tokens are not consumed on use.

pub mod session;

pub use session::{end_session, session_user, start_session, CurrentUser, SESSION_COOKIE};

use crate::db::{DbPool, Token, User};

pub const LOGIN_EMAIL_SUBJECT: &str = "Your login link for Superlists";

pub async fn get_user(db: &DbPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await
}

pub async fn get_or_create_user(db: &DbPool, email: &str) -> Result<User, sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO users (email, created_at) VALUES (?, ?)")
        .bind(email)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(db)
        .await?;

    sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(db)
        .await
}

/// Create a fresh login token for `email`. The address is not validated and
/// no user is created until the token is redeemed.
pub async fn issue_login_token(db: &DbPool, email: &str) -> Result<Token, sqlx::Error> {
    let uid = uuid::Uuid::new_v4().to_string();

    sqlx::query_as("INSERT INTO tokens (uid, email, created_at) VALUES (?, ?, ?) RETURNING *")
        .bind(&uid)
        .bind(email)
        .bind(chrono::Utc::now().to_rfc3339())
        .fetch_one(db)
        .await
}

/// Resolve the user a login token was issued for.
///
/// Missing and unknown uids both yield `None`.
pub async fn authenticate(db: &DbPool, uid: Option<&str>) -> Result<Option<User>, sqlx::Error> {
    let Some(uid) = uid.map(str::trim).filter(|uid| !uid.is_empty()) else {
        return Ok(None);
    };

    let token: Option<Token> = sqlx::query_as("SELECT * FROM tokens WHERE uid = ?")
        .bind(uid)
        .fetch_optional(db)
        .await?;

    match token {
        Some(token) => get_or_create_user(db, &token.email).await.map(Some),
        None => Ok(None),
    }
}

/// Absolute URL that logs the bearer in with `token`
pub fn login_url(base_url: &str, token: &Token) -> String {
    format!(
        "{}/accounts/login?token={}",
        base_url.trim_end_matches('/'),
        token.uid
    )
}

pub fn login_email_body(url: &str) -> String {
    format!("Use this link to log in:\n\n{}", url)
}
