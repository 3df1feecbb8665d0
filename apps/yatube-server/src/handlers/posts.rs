//! Blog pages: listings, post detail, create/edit, comments and follows.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;

use yatube_core::domain::{NewComment, NewFollow, NewPost, PostFilter, User};
use yatube_core::forms::{CleanedPost, CommentForm, FormData, IMAGE_UPLOAD_TO, PostForm};
use yatube_core::pagination::paginate_posts;
use yatube_core::FormErrors;
use yatube_shared::dto::{AuthorDto, CommentDto, FormDto, GroupDto, PageDto, PostDto};

use super::form_data::read_form;
use super::render::{
    comment_dto, form_dto, group_dto, page_dto, page_response, post_dto, redirect, render,
    render_body, user_dto, with_group_choices,
};
use super::query_param;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
struct ListingContext {
    page_obj: PageDto<PostDto>,
}

#[derive(Serialize)]
struct GroupContext {
    group: GroupDto,
    page_obj: PageDto<PostDto>,
}

#[derive(Serialize)]
struct ProfileContext {
    author: AuthorDto,
    page_obj: PageDto<PostDto>,
    following: bool,
    show_follow: bool,
}

#[derive(Serialize)]
struct PostDetailContext {
    post: PostDto,
    comments: Vec<CommentDto>,
    form: FormDto,
}

#[derive(Serialize)]
struct PostFormContext {
    form: FormDto,
    is_edit: bool,
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

pub fn post_url(post_id: i32) -> String {
    format!("/posts/{}/", post_id)
}

async fn listing(
    state: &AppState,
    req: &HttpRequest,
    filter: PostFilter,
) -> AppResult<PageDto<PostDto>> {
    let page = paginate_posts(
        state.posts.as_ref(),
        filter,
        state.settings.paginator(),
        query_param(req, "page").as_deref(),
    )
    .await?;
    Ok(page_dto(page))
}

async fn author_by_username(state: &AppState, username: &str) -> AppResult<User> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user named {}", username)))
}

/// GET /
///
/// The rendered body is cached per URL; writes do not invalidate it.
pub async fn index(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let key = format!("index_page:{}", req.uri());
    if let Some(body) = state.cache.get(&key).await {
        tracing::debug!(key = %key, "Index served from cache");
        return Ok(page_response(body));
    }

    let page_obj = listing(&state, &req, PostFilter::All).await?;
    let body = render_body("posts/index.html", ListingContext { page_obj })?;

    if let Err(e) = state
        .cache
        .set(&key, &body, Some(state.settings.index_cache_ttl))
        .await
    {
        tracing::warn!(key = %key, error = %e, "Failed to cache index page");
    }

    Ok(page_response(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> AppResult<HttpResponse> {
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No group with slug {}", slug)))?;

    let page_obj = listing(&state, &req, PostFilter::Group(group.id)).await?;
    render(
        "posts/group_list.html",
        GroupContext {
            group: group_dto(&group),
            page_obj,
        },
    )
}

/// GET /profile/{username}/
pub async fn profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = author_by_username(&state, &username).await?;
    let page_obj = listing(&state, &req, PostFilter::Author(author.id)).await?;

    let (following, show_follow) = match &viewer.0 {
        Some(viewer) => (
            state.follows.exists(viewer.id, author.id).await?,
            viewer.id != author.id,
        ),
        None => (false, false),
    };

    render(
        "posts/profile.html",
        ProfileContext {
            author: user_dto(&author),
            page_obj,
            following,
            show_follow,
        },
    )
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    post_id: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = state
        .posts
        .find_details(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No post {}", post_id)))?;
    let comments = state.comments.list_for_post(post_id).await?;

    render(
        "posts/post_detail.html",
        PostDetailContext {
            post: post_dto(&post),
            comments: comments.iter().map(comment_dto).collect(),
            form: form_dto(&FormData::new(), None),
        },
    )
}

/// Render the create/edit form, bound or not.
async fn post_form_page(
    state: &AppState,
    data: &FormData,
    errors: Option<FormErrors>,
    is_edit: bool,
) -> AppResult<HttpResponse> {
    let groups = state.groups.list().await?;
    render(
        "posts/create_post.html",
        PostFormContext {
            form: with_group_choices(form_dto(data, errors), &groups),
            is_edit,
        },
    )
}

/// Store the submitted image, if any, and return its name.
async fn store_upload(state: &AppState, cleaned: &CleanedPost) -> AppResult<Option<String>> {
    match &cleaned.image {
        Some(file) => Ok(Some(state.media.save(IMAGE_UPLOAD_TO, file).await?)),
        None => Ok(None),
    }
}

/// Remove an upload whose post row was never written.
async fn discard_upload(state: &AppState, name: Option<&str>) {
    let Some(name) = name else {
        return;
    };
    if let Err(e) = state.media.delete(name).await {
        tracing::warn!(name = %name, error = %e, "Failed to remove orphaned upload");
    }
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    _identity: Identity,
) -> AppResult<HttpResponse> {
    post_form_page(&state, &FormData::new(), None, false).await
}

/// POST /create/
pub async fn post_create(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let data = read_form(&req, body, state.settings.max_upload_bytes).await?;
    let groups = state.groups.list().await?;

    let cleaned = match PostForm::clean(&data, &groups) {
        Ok(cleaned) => cleaned,
        Err(errors) => return post_form_page(&state, &data, Some(errors), false).await,
    };

    let image = store_upload(&state, &cleaned).await?;

    let inserted = state
        .posts
        .insert(NewPost {
            text: cleaned.text,
            author_id: identity.user_id(),
            group_id: cleaned.group_id,
            image: image.clone(),
        })
        .await;
    let post = match inserted {
        Ok(post) => post,
        Err(e) => {
            discard_upload(&state, image.as_deref()).await;
            return Err(e.into());
        }
    };

    tracing::info!(post_id = post.id, author = %identity.username(), "Post created");
    Ok(redirect(profile_url(identity.username())))
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No post {}", post_id)))?;

    if !post.is_authored_by(identity.user_id()) {
        return Ok(redirect(post_url(post.id)));
    }

    post_form_page(&state, &PostForm::initial(&post), None, true).await
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<i32>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let post_id = post_id.into_inner();
    let mut post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No post {}", post_id)))?;

    if !post.is_authored_by(identity.user_id()) {
        tracing::debug!(post_id, user = %identity.username(), "Edit by non-author ignored");
        return Ok(redirect(post_url(post.id)));
    }

    let data = read_form(&req, body, state.settings.max_upload_bytes).await?;
    let groups = state.groups.list().await?;
    let cleaned = match PostForm::clean(&data, &groups) {
        Ok(cleaned) => cleaned,
        Err(errors) => return post_form_page(&state, &data, Some(errors), true).await,
    };

    let image = store_upload(&state, &cleaned).await?;
    cleaned.apply_to(&mut post);
    if image.is_some() {
        post.image = image.clone();
    }
    let post = match state.posts.update(post).await {
        Ok(post) => post,
        Err(e) => {
            discard_upload(&state, image.as_deref()).await;
            return Err(e.into());
        }
    };

    tracing::info!(post_id = post.id, "Post updated");
    Ok(redirect(post_url(post.id)))
}

/// POST /posts/{post_id}/comment/
///
/// An invalid comment is dropped without feedback.
pub async fn add_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<i32>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let post_id = post_id.into_inner();
    if state.posts.find_by_id(post_id).await?.is_none() {
        return Err(AppError::NotFound(format!("No post {}", post_id)));
    }

    let data = read_form(&req, body, state.settings.max_upload_bytes).await?;
    if let Ok(cleaned) = CommentForm::clean(&data) {
        let comment = state
            .comments
            .insert(NewComment {
                post_id,
                author_id: identity.user_id(),
                text: cleaned.text,
            })
            .await?;
        tracing::info!(comment_id = comment.id, post_id, "Comment added");
    }

    Ok(redirect(post_url(post_id)))
}

/// GET /follow/
pub async fn follow_index(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let page_obj = listing(&state, &req, PostFilter::FollowedBy(identity.user_id())).await?;
    render("posts/follow.html", ListingContext { page_obj })
}

/// /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    identity: Identity,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = author_by_username(&state, &username).await?;
    let user_id = identity.user_id();

    if author.id != user_id && !state.follows.exists(user_id, author.id).await? {
        state
            .follows
            .insert(NewFollow {
                user_id,
                author_id: author.id,
            })
            .await?;
        tracing::info!(follower = %identity.username(), author = %author.username, "Follow created");
    }

    Ok(redirect(profile_url(&author.username)))
}

/// /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = author_by_username(&state, &username).await?;

    let removed = state
        .follows
        .delete_pair(identity.user_id(), author.id)
        .await?;
    if removed > 0 {
        tracing::info!(follower = %identity.username(), author = %author.username, "Follow removed");
    }

    Ok(redirect(profile_url(&author.username)))
}
