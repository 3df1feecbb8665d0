//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use yatube_core::Paginator;
use yatube_infra::{DatabaseConfig, JwtConfig};

/// Settings the request handlers read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub posts_per_page: u64,
    pub index_cache_ttl: Duration,
    pub max_upload_bytes: usize,
    /// Scheme and host used to build absolute links in mail.
    pub site_url: String,
    pub default_from_email: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            index_cache_ttl: Duration::from_secs(20),
            max_upload_bytes: 5 * 1024 * 1024,
            site_url: "http://127.0.0.1:8080".to_string(),
            default_from_email: "webmaster@localhost".to_string(),
        }
    }
}

impl Settings {
    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.posts_per_page)
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub run_migrations: bool,
    pub redis_url: Option<String>,
    pub media_root: PathBuf,
    pub jwt: JwtConfig,
    pub settings: Settings,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| {
            let defaults = DatabaseConfig::new(url);
            DatabaseConfig {
                max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
                min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
                ..defaults
            }
        });

        let jwt_defaults = JwtConfig::default();
        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").unwrap_or(jwt_defaults.secret),
            expiration_hours: env_or("JWT_EXPIRATION_HOURS", jwt_defaults.expiration_hours),
            issuer: env::var("JWT_ISSUER").unwrap_or(jwt_defaults.issuer),
            ..jwt_defaults
        };

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("PORT", 8080);

        let defaults = Settings::default();
        let settings = Settings {
            posts_per_page: env_or("POSTS_PER_PAGE", defaults.posts_per_page),
            index_cache_ttl: Duration::from_secs(env_or(
                "INDEX_CACHE_SECONDS",
                defaults.index_cache_ttl.as_secs(),
            )),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            site_url: env::var("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://{}:{}", host, port)),
            default_from_email: env::var("DEFAULT_FROM_EMAIL")
                .unwrap_or(defaults.default_from_email),
        };

        Self {
            host,
            port,
            database,
            run_migrations: env_flag("RUN_MIGRATIONS"),
            redis_url: env::var("REDIS_URL").ok(),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            jwt,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.posts_per_page, 10);
        assert_eq!(settings.index_cache_ttl, Duration::from_secs(20));
        assert_eq!(settings.paginator().per_page(), 10);
    }

    #[test]
    fn test_unset_variables_fall_back() {
        assert_eq!(env_or("YATUBE_TEST_UNSET_NUMBER", 42u64), 42);
        assert!(!env_flag("YATUBE_TEST_UNSET_FLAG"));
    }
}
