/// Configuration management for media-service
///
/// Loads configuration from environment variables with sensible defaults.
use crate::error::{AppError, Result};
use crate::services::{InteractionFreshness, PageLoaderConfig};
use flourish_cache::ttl;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration (cross-instance change notifications)
    pub redis: RedisConfig,
    /// Query cache and pagination settings
    pub cache: CacheConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL; notifications stay in-process when unset
    pub url: Option<String>,
}

/// Query cache and pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub interaction_freshness: InteractionFreshness,
    #[serde(default = "default_warm_on_start")]
    pub warm_on_start: bool,
}

// Default values
fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_ttl_secs() -> u64 {
    ttl::DEFAULT.as_secs()
}

fn default_janitor_interval_secs() -> u64 {
    ttl::JANITOR_INTERVAL.as_secs()
}

fn default_page_size() -> u32 {
    12
}

fn default_warm_on_start() -> bool {
    true
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }

    pub fn page_loader(&self) -> PageLoaderConfig {
        PageLoaderConfig {
            page_size: self.page_size,
            content_ttl: self.default_ttl(),
            interaction_ttl: self.default_ttl(),
            freshness: self.interaction_freshness,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app = AppConfig {
            env: lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
            host: lookup("MEDIA_SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "MEDIA_SERVICE_PORT", 8082)?,
        };

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable not set".to_string())
            })?,
            max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                default_max_connections(),
            )?,
            acquire_timeout_secs: parse_or(
                &lookup,
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                default_acquire_timeout_secs(),
            )?,
        };

        let redis = RedisConfig {
            url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
        };

        let cache = CacheConfig {
            default_ttl_secs: parse_or(&lookup, "CACHE_DEFAULT_TTL_SECS", default_ttl_secs())?,
            janitor_interval_secs: parse_or(
                &lookup,
                "CACHE_JANITOR_INTERVAL_SECS",
                default_janitor_interval_secs(),
            )?,
            page_size: parse_or(&lookup, "MEDIA_PAGE_SIZE", default_page_size())?,
            interaction_freshness: parse_or(
                &lookup,
                "INTERACTION_FRESHNESS",
                InteractionFreshness::default(),
            )?,
            warm_on_start: parse_or(&lookup, "CACHE_WARM_ON_START", default_warm_on_start())?,
        };

        if cache.page_size == 0 {
            return Err(AppError::Config("MEDIA_PAGE_SIZE must be at least 1".to_string()));
        }
        if cache.default_ttl_secs == 0 {
            return Err(AppError::Config(
                "CACHE_DEFAULT_TTL_SECS must be at least 1".to_string(),
            ));
        }
        if cache.janitor_interval_secs == 0 {
            return Err(AppError::Config(
                "CACHE_JANITOR_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            app,
            database,
            redis,
            cache,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Failed to parse {}='{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://test")]))
            .unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.port, 8082);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.redis.url, None);
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.janitor_interval(), ttl::JANITOR_INTERVAL);
        assert_eq!(config.cache.page_size, 12);
        assert_eq!(
            config.cache.interaction_freshness,
            InteractionFreshness::AlwaysRefetch
        );
        assert!(config.cache.warm_on_start);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("MEDIA_PAGE_SIZE", "24"),
            ("INTERACTION_FRESHNESS", "until_invalidated"),
            ("CACHE_WARM_ON_START", "false"),
        ]))
        .unwrap();

        assert_eq!(config.redis.url.as_deref(), Some("redis://localhost:6379"));
        let loader = config.cache.page_loader();
        assert_eq!(loader.page_size, 24);
        assert_eq!(loader.freshness, InteractionFreshness::UntilInvalidated);
        assert!(!config.cache.warm_on_start);
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("MEDIA_PAGE_SIZE", "twelve"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MEDIA_PAGE_SIZE"));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("MEDIA_PAGE_SIZE", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn test_zero_janitor_interval_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("CACHE_JANITOR_INTERVAL_SECS", "0"),
        ]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
