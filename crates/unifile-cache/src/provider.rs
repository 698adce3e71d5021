//! Selection of the configured cache backend.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use unifile_core::config::cache::CacheConfig;
use unifile_core::error::AppError;
use unifile_core::result::AppResult;
use unifile_core::traits::cache::CacheProvider;

/// A cache backend known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// In-process moka cache; one instance per process.
    Memory,
    /// Shared Redis; the multi-instance equivalent.
    Redis,
}

impl CacheBackend {
    /// Parse the `cache.provider` setting.
    pub fn parse(name: &str) -> AppResult<Self> {
        match name {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(AppError::configuration(format!(
                "Unknown cache provider: '{other}'. Supported: memory, redis"
            ))),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Redis => f.write_str("redis"),
        }
    }
}

/// Owns the provider selected by configuration.
#[derive(Debug, Clone)]
pub struct CacheManager {
    provider: Arc<dyn CacheProvider>,
    backend: CacheBackend,
}

impl CacheManager {
    /// Build the provider named by `config.provider`.
    ///
    /// A backend whose cargo feature is disabled is a configuration error.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let backend = CacheBackend::parse(&config.provider)?;
        let provider = match backend {
            CacheBackend::Memory => memory_provider(config)?,
            CacheBackend::Redis => redis_provider(config).await?,
        };
        info!(backend = %backend, "Cache backend ready");
        Ok(Self { provider, backend })
    }

    pub fn backend(&self) -> CacheBackend {
        self.backend
    }

    /// Shared handle to the provider.
    pub fn provider(&self) -> Arc<dyn CacheProvider> {
        Arc::clone(&self.provider)
    }
}

#[cfg(feature = "memory")]
fn memory_provider(config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
    Ok(Arc::new(crate::memory::MemoryCacheProvider::new(
        &config.memory,
    )))
}

#[cfg(not(feature = "memory"))]
fn memory_provider(_config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
    Err(not_compiled(CacheBackend::Memory, "memory"))
}

#[cfg(feature = "redis-backend")]
async fn redis_provider(config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
    let client = crate::redis::RedisClient::connect(&config.redis).await?;
    Ok(Arc::new(crate::redis::RedisCacheProvider::new(client)))
}

#[cfg(not(feature = "redis-backend"))]
async fn redis_provider(_config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
    Err(not_compiled(CacheBackend::Redis, "redis-backend"))
}

#[allow(dead_code)]
fn not_compiled(backend: CacheBackend, feature: &str) -> AppError {
    AppError::configuration(format!(
        "Cache backend '{backend}' is not compiled in (enable the `{feature}` feature)"
    ))
}
