use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use async_trait::async_trait;
use serde_json::Value;

use yatube_core::domain::{
    Group, NewComment, NewGroup, NewPost, NewUser, Post, PostDetails, PostFilter, User,
};
use yatube_core::error::RepoError;
use yatube_core::ports::{BaseRepository, PostRepository};
use yatube_infra::{InMemoryMailer, InMemoryStore, JwtConfig};

use super::configure_routes;
use crate::config::Settings;
use crate::middleware::auth::SESSION_COOKIE;
use crate::state::AppState;

const SMALL_GIF: &[u8] = b"\x47\x49\x46\x38\x39\x61\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\
\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\
\x0A\x00\x3B";

const PASSWORD: &str = "4Thdffgj7l";
const NEW_PASSWORD: &str = "Zx9ughkq2Lm7";

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

fn test_state() -> AppState {
    AppState::in_memory(
        Settings::default(),
        JwtConfig {
            secret: "test-secret".to_string(),
            ..JwtConfig::default()
        },
    )
}

async fn user(state: &AppState, username: &str) -> User {
    let mut new = NewUser::new(username, "!unusable");
    new.email = format!("{}@example.com", username);
    state.users.insert(new).await.unwrap()
}

async fn group(state: &AppState) -> Group {
    state
        .groups
        .insert(NewGroup::new(
            "Тестовая группа",
            "test-slug",
            "Тестовое описание",
        ))
        .await
        .unwrap()
}

async fn post(state: &AppState, author: &User, text: &str) -> Post {
    state
        .posts
        .insert(NewPost::new(author.id, text))
        .await
        .unwrap()
}

fn session(state: &AppState, user: &User) -> Cookie<'static> {
    let token = state
        .tokens
        .issue_session(user.id, &user.username, &user.password_hash)
        .unwrap();
    Cookie::new(SESSION_COOKIE, token)
}

fn location(resp: &actix_web::dev::ServiceResponse) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn form_post(uri: &str, body: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
        .set_payload(body.to_string())
}

/// A multipart body with text fields and an optional `image` file.
fn multipart_post(uri: &str, fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> test::TestRequest {
    let boundary = "yatube-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: image/gif\r\n\r\n",
                boundary, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body)
}

#[actix_rt::test]
async fn test_index_paginates_ten_then_three() {
    let state = test_state();
    let author = user(&state, "auth").await;
    for n in 0..13 {
        post(&state, &author, &format!("Пост {}", n)).await;
    }
    let app = app!(state);

    let first: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    let second: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/?page=2").to_request(),
    )
    .await;

    assert_eq!(first["template"], "posts/index.html");
    assert!(first["year"].as_i64().is_some());
    assert_eq!(first["page_obj"]["object_list"].as_array().unwrap().len(), 10);
    assert_eq!(first["page_obj"]["object_list"][0]["text"], "Пост 12");
    assert_eq!(second["page_obj"]["object_list"].as_array().unwrap().len(), 3);
    assert_eq!(second["page_obj"]["has_next"], false);
}

#[actix_rt::test]
async fn test_group_and_profile_listings() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let other = user(&state, "other").await;
    let group = group(&state).await;
    state
        .posts
        .insert(NewPost::new(author.id, "В группе").in_group(group.id))
        .await
        .unwrap();
    post(&state, &other, "Без группы").await;
    let app = app!(state);

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/group/test-slug/").to_request(),
    )
    .await;
    assert_eq!(page["template"], "posts/group_list.html");
    assert_eq!(page["group"]["title"], "Тестовая группа");
    assert_eq!(page["page_obj"]["count"], 1);
    assert_eq!(page["page_obj"]["object_list"][0]["text"], "В группе");

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/profile/other/").to_request(),
    )
    .await;
    assert_eq!(page["template"], "posts/profile.html");
    assert_eq!(page["author"]["username"], "other");
    assert_eq!(page["page_obj"]["count"], 1);
    assert_eq!(page["show_follow"], false);
    assert_eq!(page["following"], false);
}

#[actix_rt::test]
async fn test_missing_records_are_404() {
    let state = test_state();
    let app = app!(state);

    for uri in [
        "/group/missing/",
        "/profile/nobody/",
        "/posts/999/",
        "/unexisting_page/",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_rt::test]
async fn test_post_detail_shows_comments() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let post = post(&state, &author, "Тестовый пост").await;
    state
        .comments
        .insert(NewComment {
            post_id: post.id,
            author_id: author.id,
            text: "Комментарий".to_string(),
        })
        .await
        .unwrap();
    let app = app!(state);

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", post.id))
            .to_request(),
    )
    .await;

    assert_eq!(page["template"], "posts/post_detail.html");
    assert_eq!(page["post"]["author"]["username"], "auth");
    assert_eq!(page["comments"][0]["text"], "Комментарий");
    assert_eq!(page["form"]["is_bound"], false);
}

#[actix_rt::test]
async fn test_protected_pages_redirect_anonymous() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let post = post(&state, &author, "Тестовый пост").await;
    let app = app!(state);

    let cases = [
        ("/create/".to_string(), "/auth/login/?next=/create/".to_string()),
        ("/follow/".to_string(), "/auth/login/?next=/follow/".to_string()),
        (
            format!("/posts/{}/edit/", post.id),
            format!("/auth/login/?next=/posts/{}/edit/", post.id),
        ),
    ];
    for (uri, expected) in cases {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), expected);
    }
}

#[actix_rt::test]
async fn test_create_post_with_group_and_image() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let group = group(&state).await;
    let app = app!(state);

    let group_id = group.id.to_string();
    let req = multipart_post(
        "/create/",
        &[("text", "Текст из формы"), ("group", group_id.as_str())],
        Some(("small.gif", SMALL_GIF)),
    )
    .cookie(session(&state, &author))
    .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/auth/");

    let posts = state
        .posts
        .list(yatube_core::domain::PostFilter::All, 0, 10)
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    let created = &posts[0].post;
    assert_eq!(created.text, "Текст из формы");
    assert_eq!(created.author_id, author.id);
    assert_eq!(created.group_id, Some(group.id));
    assert_eq!(created.image.as_deref(), Some("posts/small.gif"));
    assert!(state.media.exists("posts/small.gif").await);
}

#[actix_rt::test]
async fn test_invalid_post_rerenders_form() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let app = app!(state);

    let req = multipart_post(
        "/create/",
        &[("text", "Текст")],
        Some(("notes.txt", b"plain text")),
    )
    .cookie(session(&state, &author))
    .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(page["template"], "posts/create_post.html");
    assert_eq!(page["is_edit"], false);
    assert!(page["form"]["errors"]["image"].is_array());
    assert_eq!(
        state
            .posts
            .count(yatube_core::domain::PostFilter::All)
            .await
            .unwrap(),
        0
    );
}

#[actix_rt::test]
async fn test_edit_by_non_author_changes_nothing() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let stranger = user(&state, "stranger").await;
    let post = post(&state, &author, "Исходный текст").await;
    let app = app!(state);

    let uri = format!("/posts/{}/edit/", post.id);
    let resp = test::call_service(
        &app,
        form_post(&uri, "text=Hacked")
            .cookie(session(&state, &stranger))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    let stored = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);
}

#[actix_rt::test]
async fn test_author_edit_updates_post_and_clears_group() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let group = group(&state).await;
    let post = state
        .posts
        .insert(NewPost::new(author.id, "Исходный текст").in_group(group.id))
        .await
        .unwrap();
    let app = app!(state);

    let uri = format!("/posts/{}/edit/", post.id);
    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;
    assert_eq!(page["is_edit"], true);
    assert_eq!(page["form"]["data"]["text"], "Исходный текст");

    let resp = test::call_service(
        &app,
        form_post(&uri, "text=Новый+текст")
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;

    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    let stored = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Новый текст");
    assert_eq!(stored.group_id, None);
}

#[actix_rt::test]
async fn test_comments_from_logged_in_users_only() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let post = post(&state, &author, "Тестовый пост").await;
    let app = app!(state);
    let uri = format!("/posts/{}/comment/", post.id);

    let resp = test::call_service(&app, form_post(&uri, "text=Аноним").to_request()).await;
    assert!(location(&resp).starts_with("/auth/login/"));

    let resp = test::call_service(
        &app,
        form_post(&uri, "text=")
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let resp = test::call_service(
        &app,
        form_post(&uri, "text=Отличный+пост")
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let comments = state.comments.list_for_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment.text, "Отличный пост");
}

#[actix_rt::test]
async fn test_follow_is_idempotent() {
    let state = test_state();
    let author = user(&state, "author").await;
    let follower = user(&state, "follower").await;
    let app = app!(state);

    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/profile/author/follow/")
                .cookie(session(&state, &follower))
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/profile/author/");
    }
    assert_eq!(state.follows.count_for_user(follower.id).await.unwrap(), 1);

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/")
            .cookie(session(&state, &follower))
            .to_request(),
    )
    .await;
    assert_eq!(page["following"], true);
    assert_eq!(page["show_follow"], true);

    for _ in 0..2 {
        test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/profile/author/unfollow/")
                .cookie(session(&state, &follower))
                .to_request(),
        )
        .await;
    }
    assert!(!state.follows.exists(follower.id, author.id).await.unwrap());
}

#[actix_rt::test]
async fn test_cannot_follow_yourself() {
    let state = test_state();
    let author = user(&state, "author").await;
    let app = app!(state);

    test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/follow/")
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;

    assert_eq!(state.follows.count_for_user(author.id).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_feed_shows_followed_authors_only() {
    let state = test_state();
    let author = user(&state, "author").await;
    let follower = user(&state, "follower").await;
    let stranger = user(&state, "stranger").await;
    let app = app!(state);

    test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/follow/")
            .cookie(session(&state, &follower))
            .to_request(),
    )
    .await;
    post(&state, &author, "Новая запись").await;

    let feed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .cookie(session(&state, &follower))
            .to_request(),
    )
    .await;
    assert_eq!(feed["template"], "posts/follow.html");
    assert_eq!(feed["page_obj"]["object_list"][0]["text"], "Новая запись");

    let feed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .cookie(session(&state, &stranger))
            .to_request(),
    )
    .await;
    assert_eq!(feed["page_obj"]["count"], 0);
}

#[actix_rt::test]
async fn test_index_is_cached() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let post = post(&state, &author, "Кешированный пост").await;
    let app = app!(state);

    let before =
        test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    state.posts.delete(post.id).await.unwrap();
    let cached =
        test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(before, cached);

    state.cache.clear().await.unwrap();
    let fresh =
        test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_ne!(before, fresh);
}

#[actix_rt::test]
async fn test_deleting_group_keeps_post() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let group = group(&state).await;
    let post = state
        .posts
        .insert(NewPost::new(author.id, "Пост в группе").in_group(group.id))
        .await
        .unwrap();
    state.groups.delete(group.id).await.unwrap();
    let app = app!(state);

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", post.id))
            .to_request(),
    )
    .await;

    assert_eq!(page["post"]["text"], "Пост в группе");
    assert!(page["post"]["group"].is_null());
}

#[actix_rt::test]
async fn test_signup_creates_user() {
    let state = test_state();
    let app = app!(state);

    let body = format!(
        "first_name=Jon&last_name=Snow&username=second&email=targarian%40winterfel.com&password1={0}&password2={0}",
        PASSWORD
    );
    let resp = test::call_service(&app, form_post("/auth/signup/", &body).to_request()).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let created = state.users.find_by_username("second").await.unwrap().unwrap();
    assert_eq!(created.full_name(), "Jon Snow");

    let page: Value =
        test::call_and_read_body_json(&app, form_post("/auth/signup/", &body).to_request()).await;
    assert_eq!(page["template"], "users/signup.html");
    assert!(page["form"]["errors"]["username"].is_array());
    assert!(page["form"]["data"].get("password1").is_none());
}

#[actix_rt::test]
async fn test_login_sets_session_and_follows_next() {
    let state = test_state();
    let hash = state.passwords.hash(PASSWORD).unwrap();
    state.users.insert(NewUser::new("auth", hash)).await.unwrap();
    let app = app!(state);

    let page: Value = test::call_and_read_body_json(
        &app,
        form_post("/auth/login/", "username=auth&password=wrong-password").to_request(),
    )
    .await;
    assert!(page["form"]["errors"]["__all__"].is_array());

    let resp = test::call_service(
        &app,
        form_post(
            "/auth/login/?next=/create/",
            &format!("username=auth&password={}", PASSWORD),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/create/");

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();
    assert!(cookie.http_only().unwrap_or(false));

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/create/").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_password_reset_flow() {
    let mailer = Arc::new(InMemoryMailer::new());
    let state = test_state().with_mailer(mailer.clone());
    let user = user(&state, "auth").await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        form_post("/auth/password_reset/", "email=auth%40example.com").to_request(),
    )
    .await;
    assert_eq!(location(&resp), "/auth/password_reset/done/");

    let outbox = mailer.outbox().await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, vec![user.email.clone()]);
    let link = outbox[0]
        .body
        .split_whitespace()
        .find_map(|word| word.strip_prefix(&state.settings.site_url))
        .unwrap()
        .to_string();

    let page: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&link).to_request()).await;
    assert_eq!(page["template"], "users/password_reset_confirm.html");
    assert_eq!(page["validlink"], true);

    let resp = test::call_service(
        &app,
        form_post(
            &link,
            &format!("new_password1={0}&new_password2={0}", PASSWORD),
        )
        .to_request(),
    )
    .await;
    assert_eq!(location(&resp), "/auth/reset/done/");

    let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
    assert!(state.passwords.verify(PASSWORD, &stored.password_hash).unwrap());

    // The link dies with the old password.
    let page: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&link).to_request()).await;
    assert_eq!(page["validlink"], false);
}

#[actix_rt::test]
async fn test_unknown_email_still_redirects() {
    let mailer = Arc::new(InMemoryMailer::new());
    let state = test_state().with_mailer(mailer.clone());
    let app = app!(state);

    let resp = test::call_service(
        &app,
        form_post("/auth/password_reset/", "email=nobody%40example.com").to_request(),
    )
    .await;

    assert_eq!(location(&resp), "/auth/password_reset/done/");
    assert!(mailer.outbox().await.is_empty());
}

#[actix_rt::test]
async fn test_health() {
    let state = test_state();
    let app = app!(state);

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health/").to_request())
            .await;

    assert_eq!(body["status"], "ok");
}

fn response_cookie(resp: &actix_web::dev::ServiceResponse) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(Cookie::into_owned)
}

async fn user_with_password(state: &AppState, username: &str) -> User {
    let hash = state.passwords.hash(PASSWORD).unwrap();
    state.users.insert(NewUser::new(username, hash)).await.unwrap()
}

#[actix_rt::test]
async fn test_overflowing_page_number_gives_last_page() {
    let state = test_state();
    let author = user(&state, "auth").await;
    for n in 0..13 {
        post(&state, &author, &format!("Пост {}", n)).await;
    }
    let app = app!(state);

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/?page=99999999999999999999")
            .to_request(),
    )
    .await;

    assert_eq!(page["page_obj"]["number"], 2);
    assert_eq!(page["page_obj"]["object_list"].as_array().unwrap().len(), 3);
}

#[actix_rt::test]
async fn test_image_named_file_with_other_content_is_rejected() {
    let state = test_state();
    let author = user(&state, "auth").await;
    let app = app!(state);

    let req = multipart_post(
        "/create/",
        &[("text", "Текст")],
        Some(("notes.gif", b"BMW owners club meeting notes")),
    )
    .cookie(session(&state, &author))
    .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(page["template"], "posts/create_post.html");
    assert!(page["form"]["errors"]["image"].is_array());
    assert_eq!(state.posts.count(PostFilter::All).await.unwrap(), 0);
    assert!(!state.media.exists("posts/notes.gif").await);
}

/// Post storage that serves reads from a store but fails every write.
struct ReadOnlyPosts(Arc<InMemoryStore>);

#[async_trait]
impl BaseRepository<Post, NewPost, i32> for ReadOnlyPosts {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, RepoError> {
        BaseRepository::<Post, NewPost, i32>::find_by_id(self.0.as_ref(), id).await
    }

    async fn insert(&self, _new: NewPost) -> Result<Post, RepoError> {
        Err(RepoError::Connection("database is read-only".to_string()))
    }

    async fn update(&self, _post: Post) -> Result<Post, RepoError> {
        Err(RepoError::Connection("database is read-only".to_string()))
    }

    async fn delete(&self, _id: i32) -> Result<(), RepoError> {
        Err(RepoError::Connection("database is read-only".to_string()))
    }
}

#[async_trait]
impl PostRepository for ReadOnlyPosts {
    async fn find_details(&self, id: i32) -> Result<Option<PostDetails>, RepoError> {
        PostRepository::find_details(self.0.as_ref(), id).await
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        PostRepository::count(self.0.as_ref(), filter).await
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetails>, RepoError> {
        PostRepository::list(self.0.as_ref(), filter, offset, limit).await
    }
}

#[actix_rt::test]
async fn test_failed_post_write_removes_upload() {
    let store = Arc::new(InMemoryStore::new());
    let mut state = test_state();
    state.users = store.clone();
    state.groups = store.clone();
    state.posts = Arc::new(ReadOnlyPosts(store.clone()));
    let author = user(&state, "auth").await;
    let existing = BaseRepository::<Post, NewPost, i32>::insert(
        store.as_ref(),
        NewPost::new(author.id, "Исходный текст"),
    )
    .await
    .unwrap();
    let app = app!(state);

    let resp = test::call_service(
        &app,
        multipart_post("/create/", &[("text", "Текст")], Some(("small.gif", SMALL_GIF)))
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!state.media.exists("posts/small.gif").await);

    let resp = test::call_service(
        &app,
        multipart_post(
            &format!("/posts/{}/edit/", existing.id),
            &[("text", "Новый текст")],
            Some(("small.gif", SMALL_GIF)),
        )
        .cookie(session(&state, &author))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!state.media.exists("posts/small.gif").await);
}

#[actix_rt::test]
async fn test_password_change_requires_login() {
    let state = test_state();
    let app = app!(state);

    for uri in ["/auth/password_change/", "/auth/password_change/done/"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/auth/login/?next={}", uri));
    }
}

#[actix_rt::test]
async fn test_password_change_rejects_bad_input() {
    let state = test_state();
    let user = user_with_password(&state, "auth").await;
    let app = app!(state);

    let page: Value = test::call_and_read_body_json(
        &app,
        form_post(
            "/auth/password_change/",
            &format!(
                "old_password=wrong-password&new_password1={0}&new_password2={0}",
                NEW_PASSWORD
            ),
        )
        .cookie(session(&state, &user))
        .to_request(),
    )
    .await;
    assert_eq!(page["template"], "users/password_change_form.html");
    assert!(page["form"]["errors"]["old_password"].is_array());
    assert!(page["form"]["data"].get("old_password").is_none());
    assert!(page["form"]["data"].get("new_password1").is_none());

    let page: Value = test::call_and_read_body_json(
        &app,
        form_post(
            "/auth/password_change/",
            &format!(
                "old_password={}&new_password1={}&new_password2=Something-else-1",
                PASSWORD, NEW_PASSWORD
            ),
        )
        .cookie(session(&state, &user))
        .to_request(),
    )
    .await;
    assert!(page["form"]["errors"]["new_password2"].is_array());

    let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, user.password_hash);
}

#[actix_rt::test]
async fn test_password_change_ends_other_sessions() {
    let state = test_state();
    let user = user_with_password(&state, "auth").await;
    let old_cookie = session(&state, &user);
    let app = app!(state);

    let resp = test::call_service(
        &app,
        form_post(
            "/auth/password_change/",
            &format!(
                "old_password={}&new_password1={1}&new_password2={1}",
                PASSWORD, NEW_PASSWORD
            ),
        )
        .cookie(old_cookie.clone())
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/password_change/done/");
    let new_cookie = response_cookie(&resp).unwrap();

    let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
    assert!(state.passwords.verify(NEW_PASSWORD, &stored.password_hash).unwrap());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/create/")
            .cookie(old_cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");

    let page: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/auth/password_change/done/")
            .cookie(new_cookie)
            .to_request(),
    )
    .await;
    assert_eq!(page["template"], "users/password_change_done.html");
}

#[actix_rt::test]
async fn test_logout_clears_session_cookie() {
    let state = test_state();
    let user = user(&state, "auth").await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/logout/")
            .cookie(session(&state, &user))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = response_cookie(&resp).unwrap();
    assert_eq!(cookie.value(), "");
    assert_eq!(
        cookie.max_age(),
        Some(actix_web::cookie::time::Duration::ZERO)
    );

    let page: Value = test::read_body_json(resp).await;
    assert_eq!(page["template"], "users/logged_out.html");
}
