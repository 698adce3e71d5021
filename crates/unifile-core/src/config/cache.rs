//! Cache provider configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level cache configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// TTL of cached file metadata in seconds.
    #[serde(default = "default_metadata_ttl")]
    #[validate(range(min = 1))]
    pub metadata_ttl_seconds: u64,
    /// TTL of cached access URLs in seconds.
    #[serde(default = "default_url_ttl")]
    #[validate(range(min = 1))]
    pub url_ttl_seconds: u64,
    /// TTL of cached module listings in seconds.
    #[serde(default = "default_list_ttl")]
    #[validate(range(min = 1))]
    pub list_ttl_seconds: u64,
    /// Redis-specific cache configuration.
    #[serde(default)]
    pub redis: RedisCacheConfig,
    /// In-memory cache configuration.
    #[serde(default)]
    #[validate(nested)]
    pub memory: MemoryCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            metadata_ttl_seconds: default_metadata_ttl(),
            url_ttl_seconds: default_url_ttl(),
            list_ttl_seconds: default_list_ttl(),
            redis: RedisCacheConfig::default(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

/// Redis cache backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Namespace prepended to every key, for sharing one Redis between
    /// deployments.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// In-memory cache backend configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_capacity")]
    #[validate(range(min = 1))]
    pub max_capacity: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_metadata_ttl() -> u64 {
    3600
}

fn default_url_ttl() -> u64 {
    1800
}

fn default_list_ttl() -> u64 {
    300
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    String::new()
}

fn default_max_capacity() -> u64 {
    10000
}
