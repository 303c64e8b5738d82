//! Errors a page handler can end in.
//!
//! Input problems never get here: they are rendered back into the form. What
//! remains is a missing list, which gets the 404 page, and store failures,
//! which are logged and answered with a bare 500.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use super::{render_template, NotFoundTemplate};

#[derive(Debug, Error)]
pub enum UiError {
    /// Carries the viewer's email so the page keeps the logged-in nav
    #[error("page not found")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        match self {
            UiError::NotFound(user_email) => {
                let page = render_template(NotFoundTemplate { user_email });
                (StatusCode::NOT_FOUND, page).into_response()
            }
            UiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("<h1>Server Error</h1><p>Something went wrong, please try again.</p>"),
                )
                    .into_response()
            }
        }
    }
}
