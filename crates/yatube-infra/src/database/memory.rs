//! In-memory store - used when no database is configured and in tests.
//!
//! Deletes follow the same foreign-key rules as the SQL schema: removing a
//! group detaches its posts, removing a post or user cascades.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use yatube_core::domain::{
    Author, Comment, CommentDetails, Follow, Group, NewComment, NewFollow, NewGroup, NewPost,
    NewUser, Post, PostDetails, PostFilter, User,
};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostRepository,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    groups: BTreeMap<i32, Group>,
    posts: BTreeMap<i32, Post>,
    comments: BTreeMap<i32, Comment>,
    follows: BTreeMap<i32, Follow>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn author(&self, user_id: i32) -> Result<Author, RepoError> {
        self.users
            .get(&user_id)
            .map(Author::from)
            .ok_or_else(|| RepoError::Query(format!("user {} does not exist", user_id)))
    }

    fn post_details(&self, post: &Post) -> Result<PostDetails, RepoError> {
        Ok(PostDetails {
            post: post.clone(),
            author: self.author(post.author_id)?,
            group: post.group_id.and_then(|id| self.groups.get(&id).cloned()),
        })
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Posts matching `filter`, newest first.
    fn filtered_posts(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|p| self.matches(p, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }

    fn require_user(&self, user_id: i32) -> Result<(), RepoError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(RepoError::Constraint(format!(
                "user {} does not exist",
                user_id
            )))
        }
    }

    fn require_group(&self, group_id: Option<i32>) -> Result<(), RepoError> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => Err(RepoError::Constraint(format!(
                "group {} does not exist",
                id
            ))),
            _ => Ok(()),
        }
    }

    fn remove_post(&mut self, post_id: i32) -> bool {
        self.comments.retain(|_, c| c.post_id != post_id);
        self.posts.remove(&post_id).is_some()
    }

    fn remove_user(&mut self, user_id: i32) -> bool {
        let authored: Vec<i32> = self
            .posts
            .values()
            .filter(|p| p.author_id == user_id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            self.remove_post(post_id);
        }
        self.comments.retain(|_, c| c.author_id != user_id);
        self.follows
            .retain(|_, f| f.user_id != user_id && f.author_id != user_id);
        self.users.remove(&user_id).is_some()
    }

    fn remove_group(&mut self, group_id: i32) -> bool {
        for post in self.posts.values_mut() {
            if post.group_id == Some(group_id) {
                post.group_id = None;
            }
        }
        self.groups.remove(&group_id).is_some()
    }
}

/// A single in-process store backing every repository port.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn found(removed: bool) -> Result<(), RepoError> {
    if removed {
        Ok(())
    } else {
        Err(RepoError::NotFound)
    }
}

#[async_trait]
impl BaseRepository<User, NewUser, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == new.username) {
            return Err(RepoError::Constraint(format!(
                "username {} already exists",
                new.username
            )));
        }

        let user = User {
            id: tables.next_id(),
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            date_joined: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(RepoError::Constraint(format!(
                "username {} already exists",
                user.username
            )));
        }
        match tables.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(user)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        found(self.tables.write().await.remove_user(id))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl BaseRepository<Group, NewGroup, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Group>, RepoError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn insert(&self, new: NewGroup) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == new.slug) {
            return Err(RepoError::Constraint(format!(
                "slug {} already exists",
                new.slug
            )));
        }

        let group = Group {
            id: tables.next_id(),
            title: new.title,
            slug: new.slug,
            description: new.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .groups
            .values()
            .any(|g| g.slug == group.slug && g.id != group.id)
        {
            return Err(RepoError::Constraint(format!(
                "slug {} already exists",
                group.slug
            )));
        }
        match tables.groups.get_mut(&group.id) {
            Some(stored) => {
                *stored = group.clone();
                Ok(group)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        found(self.tables.write().await.remove_group(id))
    }
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl BaseRepository<Post, NewPost, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn insert(&self, new: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(new.author_id)?;
        tables.require_group(new.group_id)?;

        let post = Post {
            id: tables.next_id(),
            text: new.text,
            pub_date: Utc::now(),
            author_id: new.author_id,
            group_id: new.group_id,
            image: new.image,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(post.author_id)?;
        tables.require_group(post.group_id)?;
        match tables.posts.get_mut(&post.id) {
            Some(stored) => {
                *stored = post.clone();
                Ok(post)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        found(self.tables.write().await.remove_post(id))
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_details(&self, id: i32) -> Result<Option<PostDetails>, RepoError> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&id)
            .map(|post| tables.post_details(post))
            .transpose()
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.filtered_posts(filter).len() as u64)
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetails>, RepoError> {
        let tables = self.tables.read().await;
        tables
            .filtered_posts(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| tables.post_details(post))
            .collect()
    }
}

#[async_trait]
impl BaseRepository<Comment, NewComment, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn insert(&self, new: NewComment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(new.author_id)?;
        if !tables.posts.contains_key(&new.post_id) {
            return Err(RepoError::Constraint(format!(
                "post {} does not exist",
                new.post_id
            )));
        }

        let comment = Comment {
            id: tables.next_id(),
            post_id: new.post_id,
            author_id: new.author_id,
            text: new.text,
            created: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.comments.get_mut(&comment.id) {
            Some(stored) => {
                *stored = comment.clone();
                Ok(comment)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        found(self.tables.write().await.comments.remove(&id).is_some())
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn list_for_post(&self, post_id: i32) -> Result<Vec<CommentDetails>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));

        comments
            .into_iter()
            .map(|comment| {
                Ok(CommentDetails {
                    comment: comment.clone(),
                    author: tables.author(comment.author_id)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BaseRepository<Follow, NewFollow, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Follow>, RepoError> {
        Ok(self.tables.read().await.follows.get(&id).copied())
    }

    // No uniqueness check: the follow action guards against duplicates.
    async fn insert(&self, new: NewFollow) -> Result<Follow, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(new.user_id)?;
        tables.require_user(new.author_id)?;

        let follow = Follow {
            id: tables.next_id(),
            user_id: new.user_id,
            author_id: new.author_id,
        };
        tables.follows.insert(follow.id, follow);
        Ok(follow)
    }

    async fn update(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.follows.get_mut(&follow.id) {
            Some(stored) => {
                *stored = follow;
                Ok(follow)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        found(self.tables.write().await.follows.remove(&id).is_some())
    }
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn exists(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn delete_pair(&self, user_id: i32, author_id: i32) -> Result<u64, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok((before - tables.follows.len()) as u64)
    }

    async fn count_for_user(&self, user_id: i32) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|f| f.user_id == user_id)
            .count() as u64)
    }
}
