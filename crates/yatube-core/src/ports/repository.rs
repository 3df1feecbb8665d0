use async_trait::async_trait;

use crate::domain::{
    Comment, CommentDetails, Follow, Group, NewComment, NewFollow, NewGroup, NewPost, NewUser,
    Post, PostDetails, PostFilter, User,
};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
///
/// `N` is the not-yet-stored form of `T`; ids are assigned by the store.
#[async_trait]
pub trait BaseRepository<T, N, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Store a new entity and return it with its assigned ID.
    async fn insert(&self, new: N) -> Result<T, RepoError>;

    /// Overwrite an existing entity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID, applying the schema's cascade rules.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with lookups used by profiles and the auth flows.
#[async_trait]
pub trait UserRepository: BaseRepository<User, NewUser, i32> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// First user registered with this email address, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
}

#[async_trait]
pub trait GroupRepository: BaseRepository<Group, NewGroup, i32> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    /// All groups ordered by title, for the post form's choices.
    async fn list(&self) -> Result<Vec<Group>, RepoError>;
}

/// Post repository. Listings are ordered newest first.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, NewPost, i32> {
    /// A single post with its author and group.
    async fn find_details(&self, id: i32) -> Result<Option<PostDetails>, RepoError>;

    /// Number of posts matching the filter.
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError>;

    /// One window of the filtered listing.
    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetails>, RepoError>;
}

#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, NewComment, i32> {
    /// Comments on a post, newest first.
    async fn list_for_post(&self, post_id: i32) -> Result<Vec<CommentDetails>, RepoError>;
}

#[async_trait]
pub trait FollowRepository: BaseRepository<Follow, NewFollow, i32> {
    async fn exists(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError>;

    /// Remove every follow row for the pair, returning how many were removed.
    async fn delete_pair(&self, user_id: i32, author_id: i32) -> Result<u64, RepoError>;

    async fn count_for_user(&self, user_id: i32) -> Result<u64, RepoError>;
}
