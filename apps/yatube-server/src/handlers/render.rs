//! Page contexts: domain values to DTOs, and the JSON page envelope.

use actix_web::{HttpResponse, http::header};
use chrono::Datelike;
use serde::Serialize;

use yatube_core::domain::{Author, CommentDetails, Group, PostDetails, User};
use yatube_core::forms::FormData;
use yatube_core::{FormErrors, Page};
use yatube_shared::Rendered;
use yatube_shared::dto::{AuthorDto, ChoiceDto, CommentDto, FormDto, GroupDto, PageDto, PostDto};

use crate::middleware::error::AppResult;

/// Serialize a page context into the body sent to the client.
pub fn render_body<C: Serialize>(template: &str, context: C) -> AppResult<String> {
    let page = Rendered::new(template, chrono::Utc::now().year(), context);
    Ok(serde_json::to_string(&page)?)
}

pub fn page_response(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(body)
}

pub fn render<C: Serialize>(template: &str, context: C) -> AppResult<HttpResponse> {
    Ok(page_response(render_body(template, context)?))
}

pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

pub fn author_dto(author: &Author) -> AuthorDto {
    AuthorDto {
        id: author.id,
        username: author.username.clone(),
        full_name: author.full_name.clone(),
    }
}

pub fn user_dto(user: &User) -> AuthorDto {
    author_dto(&Author::from(user))
}

pub fn group_dto(group: &Group) -> GroupDto {
    GroupDto {
        id: group.id,
        title: group.title.clone(),
        slug: group.slug.clone(),
        description: group.description.clone(),
    }
}

pub fn post_dto(details: &PostDetails) -> PostDto {
    PostDto {
        id: details.post.id,
        text: details.post.text.clone(),
        pub_date: details.post.pub_date.to_rfc3339(),
        author: author_dto(&details.author),
        group: details.group.as_ref().map(group_dto),
        image: details.post.image.clone(),
    }
}

pub fn comment_dto(details: &CommentDetails) -> CommentDto {
    CommentDto {
        id: details.comment.id,
        text: details.comment.text.clone(),
        created: details.comment.created.to_rfc3339(),
        author: author_dto(&details.author),
    }
}

pub fn page_dto(page: Page<PostDetails>) -> PageDto<PostDto> {
    let window = page.window;
    PageDto {
        object_list: page.items.iter().map(post_dto).collect(),
        number: window.number,
        num_pages: window.num_pages,
        count: window.count,
        has_next: window.has_next(),
        has_previous: window.has_previous(),
        next_page_number: window.next_page_number(),
        previous_page_number: window.previous_page_number(),
    }
}

/// A form for display. `errors` is `None` for a form that was not submitted.
pub fn form_dto(data: &FormData, errors: Option<FormErrors>) -> FormDto {
    FormDto {
        is_bound: errors.is_some(),
        data: data.fields().clone(),
        errors: errors.map(FormErrors::into_inner).unwrap_or_default(),
        choices: Vec::new(),
    }
}

/// Password fields are never echoed back.
pub fn form_dto_without(data: &FormData, errors: Option<FormErrors>, hidden: &[&str]) -> FormDto {
    let mut form = form_dto(data, errors);
    form.data.retain(|name, _| !hidden.contains(&name.as_str()));
    form
}

/// Attach the `group` select options.
pub fn with_group_choices(mut form: FormDto, groups: &[Group]) -> FormDto {
    form.choices = groups
        .iter()
        .map(|group| ChoiceDto {
            field: "group".to_string(),
            value: group.id.to_string(),
            label: group.to_string(),
        })
        .collect();
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_dto_hides_passwords() {
        let data = FormData::new()
            .with_field("username", "auth")
            .with_field("password", "secret");
        let form = form_dto_without(&data, Some(FormErrors::new()), &["password"]);

        assert!(form.is_bound);
        assert_eq!(form.data.get("username").map(String::as_str), Some("auth"));
        assert!(!form.data.contains_key("password"));
    }

    #[test]
    fn test_redirect_sets_location() {
        let response = redirect("/profile/auth/");
        assert_eq!(response.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/profile/auth/"
        );
    }
}
