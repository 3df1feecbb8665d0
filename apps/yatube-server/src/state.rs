//! Application state - shared across all handlers.

use std::sync::Arc;

use yatube_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, Mailer, MediaStorage,
    PasswordService, PostRepository, TokenService, UserRepository,
};
use yatube_infra::{
    Argon2PasswordService, ConsoleMailer, InMemoryCache, InMemoryMediaStorage, InMemoryStore,
    JwtConfig, JwtTokenService, LocalMediaStorage,
};

use crate::config::{AppConfig, Settings};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub cache: Arc<dyn Cache>,
    pub media: Arc<dyn MediaStorage>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub settings: Settings,
}

impl AppState {
    /// State backed by a single in-memory store.
    pub fn in_memory(settings: Settings, jwt: JwtConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            follows: store,
            cache: Arc::new(InMemoryCache::new()),
            media: Arc::new(InMemoryMediaStorage::new()),
            mailer: Arc::new(ConsoleMailer),
            tokens: Arc::new(JwtTokenService::new(jwt)),
            passwords: Arc::new(Argon2PasswordService::new()),
            settings,
        }
    }

    pub fn with_media(mut self, media: Arc<dyn MediaStorage>) -> Self {
        self.media = media;
        self
    }

    #[cfg(test)]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Build the application state from configuration, falling back to the
    /// in-memory store when no database is reachable.
    pub async fn new(config: &AppConfig) -> Self {
        let state = Self::in_memory(config.settings.clone(), config.jwt.clone())
            .with_media(Arc::new(LocalMediaStorage::new(&config.media_root)));

        let state = state.connect_database(config).await;
        let state = state.connect_cache(config).await;

        tracing::info!("Application state initialized");
        state
    }

    #[cfg(feature = "postgres")]
    async fn connect_database(mut self, config: &AppConfig) -> Self {
        use migration::{Migrator, MigratorTrait};
        use yatube_infra::DatabaseConnections;
        use yatube_infra::database::{
            PostgresCommentRepository, PostgresFollowRepository, PostgresGroupRepository,
            PostgresPostRepository, PostgresUserRepository,
        };

        let Some(db_config) = config.database.as_ref() else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return self;
        };

        let connections = match DatabaseConnections::init(db_config).await {
            Ok(connections) => connections,
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                return self;
            }
        };

        if config.run_migrations {
            if let Err(e) = Migrator::up(&connections.main, None).await {
                tracing::error!(error = %e, "Migrations failed. Using in-memory fallback.");
                return self;
            }
            tracing::info!("Migrations applied");
        }

        let db = Arc::new(connections.main);
        self.users = Arc::new(PostgresUserRepository::new(db.clone()));
        self.groups = Arc::new(PostgresGroupRepository::new(db.clone()));
        self.posts = Arc::new(PostgresPostRepository::new(db.clone()));
        self.comments = Arc::new(PostgresCommentRepository::new(db.clone()));
        self.follows = Arc::new(PostgresFollowRepository::new(db));
        self
    }

    #[cfg(not(feature = "postgres"))]
    async fn connect_database(self, _config: &AppConfig) -> Self {
        tracing::info!("Running without postgres feature - using in-memory store");
        self
    }

    #[cfg(feature = "redis")]
    async fn connect_cache(mut self, config: &AppConfig) -> Self {
        use yatube_infra::{RedisCache, RedisConfig};

        let Some(url) = config.redis_url.as_deref() else {
            return self;
        };

        match RedisCache::new(RedisConfig::new(url)).await {
            Ok(cache) => self.cache = Arc::new(cache),
            Err(e) => tracing::error!(error = %e, "Redis unavailable. Using in-memory cache."),
        }
        self
    }

    #[cfg(not(feature = "redis"))]
    async fn connect_cache(self, config: &AppConfig) -> Self {
        if config.redis_url.is_some() {
            tracing::warn!("REDIS_URL is set but the redis feature is disabled");
        }
        self
    }
}
