//! To-do list and item models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TodoList {
    pub id: i64,
    pub owner_email: Option<String>,
    pub created_at: String,
}

impl TodoList {
    /// Canonical URL of the list page
    pub fn url(&self) -> String {
        list_url(self.id)
    }
}

pub fn list_url(id: i64) -> String {
    format!("/lists/{}/", id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub list_id: i64,
    pub text: String,
    pub created_at: String,
}

/// A list as shown on the "my lists" page, named after its first item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ListSummary {
    pub id: i64,
    pub owner_email: Option<String>,
    pub name: String,
}

impl ListSummary {
    pub fn url(&self) -> String {
        list_url(self.id)
    }

    /// Owner's email when someone other than `viewer` owns the list,
    /// otherwise empty
    pub fn shared_by(&self, viewer: &str) -> &str {
        match self.owner_email.as_deref() {
            Some(owner) if owner != viewer => owner,
            _ => "",
        }
    }
}
