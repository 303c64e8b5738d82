// Server-rendered pages: list editing, sharing and the email login flow.
// Uses Askama templates; every POST answers with a redirect or re-renders
// its form with the error.

mod error;
mod templates;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::accounts::{self, session::session_cookie, CurrentUser, SESSION_COOKIE};
use crate::config::Config;
use crate::db::{DbPool, TodoList, User};
use crate::lists::{self, ItemError};
use crate::AppState;

pub use error::UiError;
pub use templates::*;

const FLASH_COOKIE: &str = "superlists_flash";
const LOGIN_EMAIL_SENT: &str = "login_email_sent";
pub const LOGIN_EMAIL_SENT_MESSAGE: &str =
    "Check your email, we've sent you a link you can use to log in.";

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {}", e)).into_response()
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/lists/new", post(new_list))
        .route("/lists/:id/", get(view_list).post(add_item))
        .route("/lists/:id/share", post(share_list))
        .route("/lists/users/:email/", get(my_lists))
        .route("/accounts/send_login_email", post(send_login_email))
        .route("/accounts/login", get(login))
        .route("/accounts/logout", get(logout))
        .route("/health", get(health_check))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn email_of(user: Option<&User>) -> String {
    user.map(|u| u.email.clone()).unwrap_or_default()
}

#[derive(Deserialize)]
struct ItemForm {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ShareForm {
    share_with_email: Option<String>,
}

#[derive(Deserialize)]
struct LoginEmailForm {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct LoginQuery {
    token: Option<String>,
}

// Home page with an empty item form
async fn home_page(CurrentUser(user): CurrentUser, jar: CookieJar) -> Response {
    let (jar, flash) = take_flash(jar);
    let template = HomeTemplate {
        user_email: email_of(user.as_ref()),
        text: String::new(),
        error: String::new(),
        flash,
    };
    (jar, render_template(template)).into_response()
}

// Start a list from its first item
async fn new_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ItemForm>,
) -> Result<Response, UiError> {
    match lists::create_list_with_first_item(&state.db, user.as_ref(), &form.text).await {
        Ok(list) => {
            tracing::info!(list_id = list.id, owner = ?list.owner_email, "Created list");
            Ok(Redirect::to(&list.url()).into_response())
        }
        Err(ItemError::Database(e)) => Err(e.into()),
        Err(invalid) => {
            let template = HomeTemplate {
                user_email: email_of(user.as_ref()),
                text: form.text,
                error: invalid.to_string(),
                flash: String::new(),
            };
            Ok(render_template(template))
        }
    }
}

async fn load_list(db: &DbPool, id: &str, viewer: Option<&User>) -> Result<TodoList, UiError> {
    let not_found = || UiError::NotFound(email_of(viewer));
    let id: i64 = id.parse().map_err(|_| not_found())?;
    lists::get_list(db, id).await?.ok_or_else(not_found)
}

async fn render_list(
    db: &DbPool,
    user: Option<&User>,
    list: TodoList,
    text: String,
    error: String,
) -> Result<Response, UiError> {
    let items = lists::list_items(db, &list).await?;
    let name = lists::list_name(db, &list).await?;
    let sharees = lists::sharees(db, &list)
        .await?
        .into_iter()
        .map(|u| u.email)
        .collect();

    let template = ListTemplate {
        user_email: email_of(user),
        owner_email: list.owner_email.clone().unwrap_or_default(),
        list,
        name,
        items,
        sharees,
        text,
        error,
    };
    Ok(render_template(template))
}

// List page
async fn view_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, UiError> {
    let list = load_list(&state.db, &id, user.as_ref()).await?;
    render_list(&state.db, user.as_ref(), list, String::new(), String::new()).await
}

// Add an item to an existing list
async fn add_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<ItemForm>,
) -> Result<Response, UiError> {
    let list = load_list(&state.db, &id, user.as_ref()).await?;

    match lists::add_item_to_list(&state.db, &list, &form.text).await {
        Ok(item) => {
            tracing::debug!(list_id = list.id, item_id = item.id, "Added item");
            Ok(Redirect::to(&list.url()).into_response())
        }
        Err(ItemError::Database(e)) => Err(e.into()),
        Err(invalid) => {
            render_list(
                &state.db,
                user.as_ref(),
                list,
                form.text,
                invalid.to_string(),
            )
            .await
        }
    }
}

// Share a list; the response is the same whether or not the email is known
async fn share_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<ShareForm>,
) -> Result<Response, UiError> {
    let list = load_list(&state.db, &id, user.as_ref()).await?;

    if lists::share_list(&state.db, &list, form.share_with_email.as_deref()).await? {
        tracing::info!(list_id = list.id, "Shared list");
    }

    Ok(Redirect::to(&list.url()).into_response())
}

// Lists owned by or shared with a user
async fn my_lists(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(email): Path<String>,
) -> Result<Response, UiError> {
    let (owner, lists) = lists::lists_visible_to(&state.db, &email).await?;

    let template = MyListsTemplate {
        user_email: email_of(user.as_ref()),
        owner_email: email_of(owner.as_ref()),
        lists,
    };
    Ok(render_template(template))
}

/// Origin used for links in outgoing email
fn site_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(base_url) = &config.server.base_url {
        return base_url.trim_end_matches('/').to_string();
    }

    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|host| {
            let allowed = config.server.is_allowed_host(host);
            if !allowed {
                tracing::warn!(host = %host, "Ignoring untrusted Host header for links");
            }
            allowed
        })
        .map(|host| format!("http://{}", host))
        .unwrap_or_else(|| format!("http://{}:{}", config.server.host, config.server.port))
}

// Email a login link
async fn send_login_email(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<LoginEmailForm>,
) -> Result<Response, UiError> {
    let email = form.email.trim();
    let token = accounts::issue_login_token(&state.db, email).await?;
    let url = accounts::login_url(&site_url(&state.config, &headers), &token);

    if let Err(e) = state
        .mailer
        .send(
            email,
            accounts::LOGIN_EMAIL_SUBJECT,
            &accounts::login_email_body(&url),
        )
        .await
    {
        tracing::error!(to = %email, "Failed to send login email: {:#}", e);
    }

    let jar = jar.add(flash_cookie(LOGIN_EMAIL_SENT));
    Ok((jar, Redirect::to("/")).into_response())
}

// Redeem a login link. Bad or missing tokens fall through to the home page
// exactly like good ones, just without a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    query: Option<Query<LoginQuery>>,
) -> Result<Response, UiError> {
    let uid = query.as_ref().and_then(|q| q.token.as_deref());

    let jar = match accounts::authenticate(&state.db, uid).await? {
        Some(user) => {
            let token =
                accounts::start_session(&state.db, &user, state.config.auth.session_days).await?;
            jar.add(session_cookie(token, state.config.auth.secure_cookies))
        }
        None => {
            tracing::debug!("Login attempted with an unknown token");
            jar
        }
    };

    Ok((jar, Redirect::to("/")).into_response())
}

async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response, UiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        accounts::end_session(&state.db, cookie.value()).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    Ok((jar, Redirect::to("/")).into_response())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found(CurrentUser(user): CurrentUser) -> UiError {
    UiError::NotFound(email_of(user.as_ref()))
}

fn flash_cookie(key: &'static str) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, key))
        .path("/")
        .http_only(true)
        .build()
}

/// Pop the pending flash message, if any
fn take_flash(jar: CookieJar) -> (CookieJar, String) {
    let Some(key) = jar.get(FLASH_COOKIE).map(|c| c.value().to_string()) else {
        return (jar, String::new());
    };
    let message = match key.as_str() {
        LOGIN_EMAIL_SENT => LOGIN_EMAIL_SENT_MESSAGE,
        _ => "",
    };
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/").build());
    (jar, message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::lists::tests::{count, create_user};
    use crate::lists::{DUPLICATE_ITEM_ERROR, EMPTY_ITEM_ERROR};
    use crate::notifications::MemoryMailer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        state: Arc<AppState>,
        mailer: Arc<MemoryMailer>,
    }

    impl TestApp {
        async fn new() -> Self {
            let pool = db::init_memory().await.unwrap();
            let mailer = Arc::new(MemoryMailer::new());
            let mut config = Config::default();
            config.server.allowed_hosts.push("testserver".to_string());
            let state = Arc::new(AppState::new(config, pool, mailer.clone()));
            Self {
                router: create_router(state.clone()),
                state,
                mailer,
            }
        }

        fn db(&self) -> &DbPool {
            &self.state.db
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post(&self, uri: &str, body: &str) -> Response {
            self.send(form_request(uri, body, None)).await
        }
    }

    fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::HOST, "testserver");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    /// `name=value` pairs from every Set-Cookie header
    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| {
                v.to_str()
                    .unwrap()
                    .split(';')
                    .next()
                    .unwrap()
                    .to_string()
            })
            .collect()
    }

    async fn first_list_id(db: &DbPool) -> i64 {
        sqlx::query_scalar("SELECT id FROM lists ORDER BY id LIMIT 1")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_home_page_renders_item_form() {
        let app = TestApp::new().await;

        let response = app.get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Start a new To-Do list"));
        assert!(body.contains(r#"name="text""#));
        assert!(body.contains(r#"action="/lists/new""#));
    }

    #[tokio::test]
    async fn test_new_list_redirects_to_list_page() {
        let app = TestApp::new().await;

        let response = app.post("/lists/new", "text=A%20new%20list%20item").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let id = first_list_id(app.db()).await;
        assert_eq!(location(&response), format!("/lists/{}/", id));

        let page = app.get(&format!("/lists/{}/", id)).await;
        assert_eq!(page.status(), StatusCode::OK);
        let body = body_text(page).await;
        assert!(body.contains("1: A new list item"));
        assert_eq!(count(app.db(), "items").await, 1);
    }

    #[tokio::test]
    async fn test_new_list_with_empty_item_shows_error_on_home_page() {
        let app = TestApp::new().await;

        let response = app.post("/lists/new", "text=").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Start a new To-Do list"));
        assert!(body.contains(EMPTY_ITEM_ERROR));

        assert_eq!(count(app.db(), "lists").await, 0);
        assert_eq!(count(app.db(), "items").await, 0);
    }

    #[tokio::test]
    async fn test_new_list_without_text_field_is_empty_item() {
        let app = TestApp::new().await;

        let response = app.post("/lists/new", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(EMPTY_ITEM_ERROR));
        assert_eq!(count(app.db(), "lists").await, 0);
    }

    #[tokio::test]
    async fn test_list_page_shows_only_its_items() {
        let app = TestApp::new().await;
        let correct = lists::create_list_with_first_item(app.db(), None, "itemey 1")
            .await
            .unwrap();
        lists::add_item_to_list(app.db(), &correct, "itemey 2")
            .await
            .unwrap();
        lists::create_list_with_first_item(app.db(), None, "other list item 1")
            .await
            .unwrap();

        let body = body_text(app.get(&correct.url()).await).await;
        assert!(body.contains("itemey 1"));
        assert!(body.contains("itemey 2"));
        assert!(!body.contains("other list item 1"));
        assert!(body.contains(&format!(r#"action="/lists/{}/""#, correct.id)));
        assert!(body.contains("<title>itemey 1 - To-Do lists</title>"));
    }

    #[tokio::test]
    async fn test_unknown_list_is_not_found() {
        let app = TestApp::new().await;

        assert_eq!(app.get("/lists/999/").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.get("/lists/abc/").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            app.post("/lists/999/", "text=hello").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(count(app.db(), "items").await, 0);
    }

    #[tokio::test]
    async fn test_post_to_existing_list_saves_and_redirects() {
        let app = TestApp::new().await;
        lists::create_list_with_first_item(app.db(), None, "other")
            .await
            .unwrap();
        let correct = lists::create_list_with_first_item(app.db(), None, "first")
            .await
            .unwrap();

        let response = app
            .post(&correct.url(), "text=A%20new%20item%20for%20an%20existing%20list")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), correct.url());

        let texts: Vec<String> = lists::list_items(app.db(), &correct)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.text)
            .collect();
        assert_eq!(texts, vec!["first", "A new item for an existing list"]);
    }

    #[tokio::test]
    async fn test_invalid_item_on_list_page_keeps_input() {
        let app = TestApp::new().await;
        let list = lists::create_list_with_first_item(app.db(), None, "textey")
            .await
            .unwrap();

        let response = app.post(&list.url(), "text=textey").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Your To-Do list"));
        assert!(body.contains(DUPLICATE_ITEM_ERROR));
        assert!(body.contains(r#"value="textey""#));
        assert_eq!(count(app.db(), "items").await, 1);

        let response = app.post(&list.url(), "text=").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(EMPTY_ITEM_ERROR));
        assert_eq!(count(app.db(), "items").await, 1);
    }

    #[tokio::test]
    async fn test_rejected_input_is_escaped() {
        let app = TestApp::new().await;
        let list = lists::create_list_with_first_item(app.db(), None, "<b>x</b>")
            .await
            .unwrap();

        let body = body_text(app.post(&list.url(), "text=%3Cb%3Ex%3C%2Fb%3E").await).await;
        assert!(!body.contains("<b>x</b>"));
        assert!(body.contains("&lt;b&gt;x"));
    }

    #[tokio::test]
    async fn test_share_known_user_shows_on_list_page() {
        let app = TestApp::new().await;
        create_user(app.db(), "to_share@with.com").await;
        let list = lists::create_list_with_first_item(app.db(), None, "share this")
            .await
            .unwrap();

        let response = app
            .post(
                &format!("/lists/{}/share", list.id),
                "share_with_email=to_share%40with.com",
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), list.url());

        let body = body_text(app.get(&list.url()).await).await;
        assert!(body.contains("List shared with"));
        assert!(body.contains("to_share@with.com"));
    }

    #[tokio::test]
    async fn test_share_unknown_user_still_redirects() {
        let app = TestApp::new().await;
        let list = lists::create_list_with_first_item(app.db(), None, "item")
            .await
            .unwrap();

        let response = app
            .post(
                &format!("/lists/{}/share", list.id),
                "share_with_email=un%40known.com",
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), list.url());
        assert_eq!(count(app.db(), "list_shares").await, 0);

        let response = app.post(&format!("/lists/{}/share", list.id), "").await;
        assert_eq!(location(&response), list.url());
    }

    #[tokio::test]
    async fn test_my_lists_shows_owned_and_shared_lists() {
        let app = TestApp::new().await;
        let user = create_user(app.db(), "user@1.com").await;
        lists::create_list_with_first_item(app.db(), Some(&user), "my own list")
            .await
            .unwrap();
        let shared = lists::create_list_with_first_item(app.db(), None, "share this")
            .await
            .unwrap();
        lists::share_list(app.db(), &shared, Some("user@1.com"))
            .await
            .unwrap();

        let response = app.get("/lists/users/user@1.com/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("user@1.com"));
        assert!(body.contains("my own list"));
        assert!(body.contains("share this"));
        assert!(body.contains(&shared.url()));
    }

    #[tokio::test]
    async fn test_my_lists_for_unknown_email() {
        let app = TestApp::new().await;

        let response = app.get("/lists/users/nobody@x.com/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("No lists to show."));
    }

    #[tokio::test]
    async fn test_send_login_email_mails_link_and_sets_flash() {
        let app = TestApp::new().await;

        let response = app
            .post("/accounts/send_login_email", "email=edith%40example.com")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let cookies = set_cookies(&response);
        assert!(cookies.contains(&format!("{}={}", FLASH_COOKIE, LOGIN_EMAIL_SENT)));

        let uid: String = sqlx::query_scalar("SELECT uid FROM tokens WHERE email = ?")
            .bind("edith@example.com")
            .fetch_one(app.db())
            .await
            .unwrap();

        let outbox = app.mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, "edith@example.com");
        assert_eq!(outbox[0].subject, "Your login link for Superlists");
        assert!(outbox[0].body.contains(&format!(
            "http://testserver/accounts/login?token={}",
            uid
        )));

        // The next home page shows the notice once
        let request = Request::builder()
            .uri("/")
            .header(header::COOKIE, cookies.join("; "))
            .body(Body::empty())
            .unwrap();
        let home = app.send(request).await;
        assert!(set_cookies(&home)
            .iter()
            .any(|c| c.starts_with(&format!("{}=", FLASH_COOKIE))));
        assert!(body_text(home).await.contains(LOGIN_EMAIL_SENT_MESSAGE));
    }

    #[tokio::test]
    async fn test_login_with_valid_token_starts_session() {
        let app = TestApp::new().await;
        let token = accounts::issue_login_token(app.db(), "a@b.com")
            .await
            .unwrap();

        let response = app
            .get(&format!("/accounts/login?token={}", token.uid))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let session = set_cookies(&response)
            .into_iter()
            .find(|c| c.starts_with(&format!("{}=", SESSION_COOKIE)))
            .unwrap();

        // Lists created in this session belong to the user
        let response = app
            .send(form_request("/lists/new", "text=new%20item", Some(session.as_str())))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let list = lists::get_list(app.db(), first_list_id(app.db()).await)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(list.owner_email.as_deref(), Some("a@b.com"));

        let request = Request::builder()
            .uri("/")
            .header(header::COOKIE, &session)
            .body(Body::empty())
            .unwrap();
        let body = body_text(app.send(request).await).await;
        assert!(body.contains("Logged in as a@b.com"));
    }

    #[tokio::test]
    async fn test_login_with_bad_token_redirects_silently() {
        let app = TestApp::new().await;

        for uri in [
            "/accounts/login?token=bogus",
            "/accounts/login",
            "/accounts/login?token=",
        ] {
            let response = app.get(uri).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/");
            assert!(set_cookies(&response).is_empty());
        }
        assert_eq!(count(app.db(), "users").await, 0);
    }

    #[tokio::test]
    async fn test_anonymous_list_has_no_owner() {
        let app = TestApp::new().await;

        app.post("/lists/new", "text=anon").await;
        let list = lists::get_list(app.db(), first_list_id(app.db()).await)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(list.owner_email, None);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = TestApp::new().await;
        let user = create_user(app.db(), "a@b.com").await;
        let token = accounts::start_session(app.db(), &user, 14).await.unwrap();
        let cookie = format!("{}={}", SESSION_COOKIE, token);

        let request = Request::builder()
            .uri("/accounts/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(accounts::session_user(app.db(), &token)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_site_url_prefers_configured_base() {
        let mut config = Config::default();
        config.server.allowed_hosts = vec!["example.org".to_string()];
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "example.org".parse().unwrap());
        assert_eq!(site_url(&config, &headers), "http://example.org");

        config.server.base_url = Some("https://lists.example.com/".to_string());
        assert_eq!(site_url(&config, &headers), "https://lists.example.com");

        config.server.base_url = None;
        assert_eq!(site_url(&config, &HeaderMap::new()), "http://127.0.0.1:8000");
    }

    #[tokio::test]
    async fn test_login_link_ignores_untrusted_host_header() {
        let app = TestApp::new().await;

        let request = Request::builder()
            .method("POST")
            .uri("/accounts/send_login_email")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::HOST, "evil.attacker.example")
            .body(Body::from("email=victim%40example.com"))
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let outbox = app.mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert!(!outbox[0].body.contains("evil.attacker.example"));
        assert!(outbox[0]
            .body
            .contains("http://127.0.0.1:8000/accounts/login?token="));
    }

    #[tokio::test]
    async fn test_health_and_fallback() {
        let app = TestApp::new().await;

        let response = app.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");

        assert_eq!(app.get("/nope").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_found_page_keeps_logged_in_nav() {
        let app = TestApp::new().await;
        let user = create_user(app.db(), "a@b.com").await;
        let token = accounts::start_session(app.db(), &user, 14).await.unwrap();
        let cookie = format!("{}={}", SESSION_COOKIE, token);

        for uri in ["/lists/999/", "/nope"] {
            let request = Request::builder()
                .uri(uri)
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap();
            let response = app.send(request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert!(body_text(response).await.contains("Logged in as a@b.com"));
        }
    }
}
