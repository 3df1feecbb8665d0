use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Author, Group, truncate_chars};

/// Post entity - a text entry written by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i32,
    pub group_id: Option<i32>,
    /// Path relative to the media root, e.g. `posts/small.gif`.
    pub image: Option<String>,
}

impl Post {
    pub fn is_authored_by(&self, user_id: i32) -> bool {
        self.author_id == user_id
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&truncate_chars(&self.text, 30))
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
}

impl NewPost {
    pub fn new(author_id: i32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author_id,
            group_id: None,
            image: None,
        }
    }

    pub fn in_group(mut self, group_id: i32) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

/// A post together with the rows listing pages show next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetails {
    pub post: Post,
    pub author: Author,
    pub group: Option<Group>,
}

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i32),
    Author(i32),
    /// Posts by every author the given user follows.
    FollowedBy(i32),
}
