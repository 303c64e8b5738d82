//! User and login token models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered user. Users have no password; the email is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub email: String,
    pub created_at: String,
}

/// A login grant emailed to `email`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    pub uid: String,
    pub email: String,
    pub created_at: String,
}
