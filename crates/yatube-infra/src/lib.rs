//! # Yatube Infrastructure
//!
//! Concrete implementations of the ports defined in `yatube-core`:
//! persistence, cache, auth tokens, media storage and mail.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL repositories via SeaORM
//! - `redis` - Redis-backed cache
//! - `full` - both of the above
//! - `minimal` - in-memory store and cache only

pub mod auth;
pub mod cache;
pub mod database;
pub mod mail;
pub mod media;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use cache::InMemoryCache;
pub use database::{DatabaseConfig, InMemoryStore};
pub use mail::{ConsoleMailer, InMemoryMailer};
pub use media::{InMemoryMediaStorage, LocalMediaStorage};

#[cfg(feature = "postgres")]
pub use database::DatabaseConnections;

#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
