//! PostgreSQL repository implementations.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sea_orm::sea_query::Query;
use sea_orm::{
    ColumnTrait, Condition, DbConn, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use yatube_core::domain::{
    Author, CommentDetails, Group, PostDetails, PostFilter, User,
};
use yatube_core::error::RepoError;
use yatube_core::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::follow::{self, Entity as FollowEntity};
use super::entity::group::{self, Entity as GroupEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;
pub type PostgresGroupRepository = PostgresBaseRepository<GroupEntity>;
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;
pub type PostgresFollowRepository = PostgresBaseRepository<FollowEntity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .order_by_asc(user::Column::Id)
            .one(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }
}

/// Mask the local part of an address so logs carry no PII.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            if local.chars().count() > 1 {
                format!("{}***@{}", first, domain)
            } else {
                format!("***@{}", domain)
            }
        }
        None => "***".to_string(),
    }
}

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let result = GroupEntity::find()
            .filter(group::Column::Slug.eq(slug))
            .one(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let result = GroupEntity::find()
            .order_by_asc(group::Column::Title)
            .all(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

fn post_condition(filter: PostFilter) -> Condition {
    match filter {
        PostFilter::All => Condition::all(),
        PostFilter::Group(group_id) => Condition::all().add(post::Column::GroupId.eq(group_id)),
        PostFilter::Author(author_id) => {
            Condition::all().add(post::Column::AuthorId.eq(author_id))
        }
        PostFilter::FollowedBy(user_id) => Condition::all().add(
            post::Column::AuthorId.in_subquery(
                Query::select()
                    .column(follow::Column::AuthorId)
                    .from(FollowEntity)
                    .and_where(follow::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
        ),
    }
}

/// Load the authors of a batch of rows in one query.
async fn load_authors(
    db: &DbConn,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, Author>, RepoError> {
    let ids: HashSet<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = UserEntity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await
        .map_err(map_db_err)?;

    Ok(users
        .into_iter()
        .map(|m| {
            let user = User::from(m);
            (user.id, Author::from(&user))
        })
        .collect())
}

/// Attach authors and groups to posts, keeping the input order.
async fn load_post_details(
    db: &DbConn,
    posts: Vec<post::Model>,
) -> Result<Vec<PostDetails>, RepoError> {
    let authors = load_authors(db, posts.iter().map(|p| p.author_id)).await?;

    let group_ids: HashSet<i32> = posts.iter().filter_map(|p| p.group_id).collect();
    let groups: HashMap<i32, Group> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        GroupEntity::find()
            .filter(group::Column::Id.is_in(group_ids))
            .all(db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|m| (m.id, Group::from(m)))
            .collect()
    };

    posts
        .into_iter()
        .map(|model| {
            let author = authors
                .get(&model.author_id)
                .cloned()
                .ok_or_else(|| RepoError::Query(format!("post {} has no author", model.id)))?;
            let group = model.group_id.and_then(|id| groups.get(&id).cloned());
            Ok(PostDetails {
                post: model.into(),
                author,
                group,
            })
        })
        .collect()
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_details(&self, id: i32) -> Result<Option<PostDetails>, RepoError> {
        let Some(model) = PostEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        Ok(load_post_details(&*self.db, vec![model]).await?.pop())
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(post_condition(filter))
            .count(&*self.db)
            .await
            .map_err(map_db_err)
    }

    async fn list(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetails>, RepoError> {
        let models = PostEntity::find()
            .filter(post_condition(filter))
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(map_db_err)?;

        load_post_details(&*self.db, models).await
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_for_post(&self, post_id: i32) -> Result<Vec<CommentDetails>, RepoError> {
        let models = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::Created)
            .order_by_desc(comment::Column::Id)
            .all(&*self.db)
            .await
            .map_err(map_db_err)?;

        let authors = load_authors(&*self.db, models.iter().map(|c| c.author_id)).await?;

        models
            .into_iter()
            .map(|model| {
                let author = authors.get(&model.author_id).cloned().ok_or_else(|| {
                    RepoError::Query(format!("comment {} has no author", model.id))
                })?;
                Ok(CommentDetails {
                    comment: model.into(),
                    author,
                })
            })
            .collect()
    }
}

fn pair_condition(user_id: i32, author_id: i32) -> Condition {
    Condition::all()
        .add(follow::Column::UserId.eq(user_id))
        .add(follow::Column::AuthorId.eq(author_id))
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn exists(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError> {
        let count = FollowEntity::find()
            .filter(pair_condition(user_id, author_id))
            .count(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(count > 0)
    }

    async fn delete_pair(&self, user_id: i32, author_id: i32) -> Result<u64, RepoError> {
        let result = FollowEntity::delete_many()
            .filter(pair_condition(user_id, author_id))
            .exec(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected)
    }

    async fn count_for_user(&self, user_id: i32) -> Result<u64, RepoError> {
        FollowEntity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await
            .map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::mask_email;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("jon@winterfell.com"), "j***@winterfell.com");
        assert_eq!(mask_email("j@winterfell.com"), "***@winterfell.com");
        assert_eq!(mask_email("nope"), "***");
    }
}
