//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod mail;
mod media;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService, password_fingerprint};
pub use cache::{Cache, CacheError};
pub use mail::{EmailMessage, MailError, Mailer};
pub use media::{MediaError, MediaStorage, UploadedFile};
pub use repository::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostRepository,
    UserRepository,
};
