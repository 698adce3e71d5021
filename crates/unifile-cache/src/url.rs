//! Typed cache of issued access URLs.

use std::sync::Arc;
use std::time::Duration;

use unifile_core::result::AppResult;
use unifile_core::traits::CacheProvider;
use unifile_core::types::FileId;

use crate::keys;

/// Caches access URLs per file, caller and requested lifetime.
///
/// An entry never outlives the URL it holds: its TTL is the smaller of
/// the configured URL TTL and the URL's own lifetime.
#[derive(Debug, Clone)]
pub struct UrlCache {
    provider: Arc<dyn CacheProvider>,
    ttl: Duration,
}

impl UrlCache {
    pub fn new(provider: Arc<dyn CacheProvider>, ttl: Duration) -> Self {
        Self { provider, ttl }
    }

    pub async fn get(
        &self,
        file_id: FileId,
        user_id: Option<&str>,
        expires_in: Option<Duration>,
    ) -> AppResult<Option<String>> {
        let key = keys::file_url(file_id, user_id, expires_in.map_or(0, |d| d.as_secs()));
        self.provider.get(&key).await
    }

    pub async fn put(
        &self,
        file_id: FileId,
        user_id: Option<&str>,
        expires_in: Option<Duration>,
        url: &str,
    ) -> AppResult<()> {
        let key = keys::file_url(file_id, user_id, expires_in.map_or(0, |d| d.as_secs()));
        let ttl = expires_in.map_or(self.ttl, |d| d.min(self.ttl));
        self.provider.set(&key, url, ttl).await
    }

    /// Drop every cached URL of a file.
    pub async fn evict_file(&self, file_id: FileId) -> AppResult<u64> {
        self.provider
            .delete_pattern(&keys::file_url_pattern(file_id))
            .await
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::memory::MemoryCacheProvider;
    use unifile_core::config::cache::MemoryCacheConfig;

    fn cache(ttl: Duration) -> UrlCache {
        let provider = Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        UrlCache::new(provider, ttl)
    }

    #[tokio::test]
    async fn test_urls_are_scoped_per_caller_and_expiry() {
        let cache = cache(Duration::from_secs(60));
        let id = FileId::new();
        cache
            .put(id, Some("alice"), None, "https://a")
            .await
            .unwrap();

        assert_eq!(
            cache.get(id, Some("alice"), None).await.unwrap(),
            Some("https://a".to_string())
        );
        assert_eq!(cache.get(id, None, None).await.unwrap(), None);
        assert_eq!(
            cache
                .get(id, Some("alice"), Some(Duration::from_secs(30)))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_entry_does_not_outlive_url() {
        let cache = cache(Duration::from_secs(60));
        let id = FileId::new();
        let short = Some(Duration::from_millis(50));
        cache.put(id, None, short, "https://short").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(id, None, short).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_evict_file_drops_all_variants() {
        let cache = cache(Duration::from_secs(60));
        let id = FileId::new();
        let other = FileId::new();
        cache.put(id, None, None, "u1").await.unwrap();
        cache.put(id, Some("bob"), None, "u2").await.unwrap();
        cache.put(other, None, None, "u3").await.unwrap();

        assert_eq!(cache.evict_file(id).await.unwrap(), 2);
        assert_eq!(cache.get(other, None, None).await.unwrap(), Some("u3".into()));
    }
}
