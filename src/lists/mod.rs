//! List and item rules.
//!
//! A list only exists while it has at least one item, and item text must be
//! non-empty and unique within its list. Validation failures come back as
//! [`ItemError`] so the handlers can re-render the form with the message.

pub mod sharing;

pub use sharing::{lists_visible_to, share_list, sharees};

use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::debug;

use crate::db::{DbPool, Item, TodoList, User};

pub const EMPTY_ITEM_ERROR: &str = "You can't have an empty list item";
pub const DUPLICATE_ITEM_ERROR: &str = "You've already got this in your list";

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("{}", EMPTY_ITEM_ERROR)]
    Empty,
    #[error("{}", DUPLICATE_ITEM_ERROR)]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create a new list holding `text` as its first item.
///
/// The list and the item are written in one transaction; if the item is
/// rejected the transaction is rolled back so no empty list is left behind.
pub async fn create_list_with_first_item(
    db: &DbPool,
    owner: Option<&User>,
    text: &str,
) -> Result<TodoList, ItemError> {
    let now = chrono::Utc::now().to_rfc3339();
    let mut tx = db.begin().await?;

    let list: TodoList =
        sqlx::query_as("INSERT INTO lists (owner_email, created_at) VALUES (?, ?) RETURNING *")
            .bind(owner.map(|u| u.email.as_str()))
            .bind(&now)
            .fetch_one(&mut *tx)
            .await?;

    match insert_item(&mut *tx, list.id, text).await {
        Ok(_) => {
            tx.commit().await?;
            Ok(list)
        }
        Err(e) => {
            tx.rollback().await?;
            debug!(error = %e, "Discarded new list after its first item was rejected");
            Err(e)
        }
    }
}

/// Append an item to an existing list
pub async fn add_item_to_list(
    db: &DbPool,
    list: &TodoList,
    text: &str,
) -> Result<Item, ItemError> {
    let mut conn = db.acquire().await?;
    insert_item(&mut *conn, list.id, text).await
}

async fn insert_item(
    conn: &mut SqliteConnection,
    list_id: i64,
    text: &str,
) -> Result<Item, ItemError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ItemError::Empty);
    }

    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE list_id = ? AND text = ?")
            .bind(list_id)
            .bind(text)
            .fetch_one(&mut *conn)
            .await?;
    if existing > 0 {
        return Err(ItemError::Duplicate);
    }

    // The unique index still catches a concurrent insert of the same text
    sqlx::query_as(
        "INSERT INTO items (list_id, text, created_at) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(list_id)
    .bind(text)
    .bind(chrono::Utc::now().to_rfc3339())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => ItemError::Duplicate,
        _ => ItemError::Database(e),
    })
}

pub async fn get_list(db: &DbPool, id: i64) -> Result<Option<TodoList>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM lists WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Items of a list in the order they were added
pub async fn list_items(db: &DbPool, list: &TodoList) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM items WHERE list_id = ? ORDER BY id")
        .bind(list.id)
        .fetch_all(db)
        .await
}

/// A list is named after its first item
pub async fn list_name(db: &DbPool, list: &TodoList) -> Result<String, sqlx::Error> {
    let name: Option<String> =
        sqlx::query_scalar("SELECT text FROM items WHERE list_id = ? ORDER BY id LIMIT 1")
            .bind(list.id)
            .fetch_optional(db)
            .await?;
    Ok(name.unwrap_or_default())
}
