//! Cache connection configuration.

use serde::{Deserialize, Serialize};

/// Cache connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL.
    pub redis_url: String,

    /// Prefix applied to every key.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "auth".to_string(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)
    /// - `CACHE_KEY_PREFIX`: Key namespace (default: auth)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(default.redis_url),
            key_prefix: std::env::var("CACHE_KEY_PREFIX").unwrap_or(default.key_prefix),
        }
    }
}
