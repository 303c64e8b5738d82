//! Sharing lists with other registered users.

use crate::accounts::get_user;
use crate::db::{DbPool, ListSummary, TodoList, User};

/// Share `list` with the user registered under `email`.
///
/// Unknown or blank emails are ignored without an error, so the outcome does
/// not reveal which addresses have accounts. Returns whether a new sharee was
/// added.
pub async fn share_list(
    db: &DbPool,
    list: &TodoList,
    email: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let email = match email.map(str::trim) {
        Some(email) if !email.is_empty() => email,
        _ => return Ok(false),
    };

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO list_shares (list_id, user_email, created_at)
        SELECT ?, email, ? FROM users WHERE email = ?
        "#,
    )
    .bind(list.id)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(email)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Users a list is shared with, ordered by email
pub async fn sharees(db: &DbPool, list: &TodoList) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT u.* FROM users u
        JOIN list_shares s ON s.user_email = u.email
        WHERE s.list_id = ?
        ORDER BY u.email
        "#,
    )
    .bind(list.id)
    .fetch_all(db)
    .await
}

/// The user registered as `email` with every list they own or that is shared
/// with them. Unknown emails yield no user and no lists.
pub async fn lists_visible_to(
    db: &DbPool,
    email: &str,
) -> Result<(Option<User>, Vec<ListSummary>), sqlx::Error> {
    let Some(user) = get_user(db, email).await? else {
        return Ok((None, Vec::new()));
    };

    let lists: Vec<ListSummary> = sqlx::query_as(
        r#"
        SELECT l.id, l.owner_email,
               COALESCE((SELECT text FROM items WHERE list_id = l.id ORDER BY id LIMIT 1), '') AS name
        FROM lists l
        WHERE l.owner_email = ?
           OR l.id IN (SELECT list_id FROM list_shares WHERE user_email = ?)
        ORDER BY l.id
        "#,
    )
    .bind(&user.email)
    .bind(&user.email)
    .fetch_all(db)
    .await?;

    Ok((Some(user), lists))
}
