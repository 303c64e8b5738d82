// Askama template definitions

use askama::Template;

use crate::db::{Item, ListSummary, TodoList};

// Optional values are flattened to empty strings where the templates only
// need to test for presence.

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub user_email: String,
    pub text: String,
    pub error: String,
    pub flash: String,
}

#[derive(Template)]
#[template(path = "list.html")]
pub struct ListTemplate {
    pub user_email: String,
    pub list: TodoList,
    pub name: String,
    pub owner_email: String,
    pub items: Vec<Item>,
    pub sharees: Vec<String>,
    pub text: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "my_lists.html")]
pub struct MyListsTemplate {
    pub user_email: String,
    pub owner_email: String,
    pub lists: Vec<ListSummary>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub user_email: String,
}
