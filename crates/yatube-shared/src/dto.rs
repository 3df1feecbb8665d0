//! Data Transfer Objects - the shapes pages expose to templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorDto {
    pub id: i32,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDto {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDto {
    pub id: i32,
    pub text: String,
    pub pub_date: String,
    pub author: AuthorDto,
    pub group: Option<GroupDto>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDto {
    pub id: i32,
    pub text: String,
    pub created: String,
    pub author: AuthorDto,
}

/// A page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDto<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

/// A form as shown to the user: submitted (or initial) values plus errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormDto {
    pub is_bound: bool,
    pub data: BTreeMap<String, String>,
    pub errors: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub choices: Vec<ChoiceDto>,
}

/// One option of a select field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDto {
    pub field: String,
    pub value: String,
    pub label: String,
}
