use serde::{Deserialize, Serialize};

/// Follow entity - `user_id` subscribes to posts by `author_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: i32,
    pub user_id: i32,
    pub author_id: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct NewFollow {
    pub user_id: i32,
    pub author_id: i32,
}
