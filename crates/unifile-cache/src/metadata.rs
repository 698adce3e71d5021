//! Typed cache of file metadata.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use unifile_core::result::AppResult;
use unifile_core::traits::CacheProvider;
use unifile_core::types::{FileId, FileMetadata};

use crate::keys;

/// Write-through / cache-aside cache of [`FileMetadata`].
///
/// The metadata store stays the source of truth. A corrupt entry is
/// evicted and reported as a miss.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    provider: Arc<dyn CacheProvider>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(provider: Arc<dyn CacheProvider>, ttl: Duration) -> Self {
        Self { provider, ttl }
    }

    /// Cached metadata for a file, if present.
    pub async fn get(&self, file_id: FileId) -> AppResult<Option<FileMetadata>> {
        let key = keys::file_metadata(file_id);
        let Some(raw) = self.provider.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(metadata) => {
                debug!(file_id = %file_id, "Metadata cache hit");
                Ok(Some(metadata))
            }
            Err(e) => {
                warn!(file_id = %file_id, error = %e, "Evicting undecodable metadata entry");
                self.provider.delete(&key).await?;
                Ok(None)
            }
        }
    }

    /// Store metadata under its id.
    pub async fn put(&self, metadata: &FileMetadata) -> AppResult<()> {
        let json = serde_json::to_string(metadata)?;
        self.provider
            .set(&keys::file_metadata(metadata.id), &json, self.ttl)
            .await
    }

    /// Drop the cached metadata of a file.
    pub async fn evict(&self, file_id: FileId) -> AppResult<()> {
        self.provider.delete(&keys::file_metadata(file_id)).await
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::memory::MemoryCacheProvider;
    use unifile_core::config::cache::MemoryCacheConfig;

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss_and_evicted() {
        let provider: Arc<dyn CacheProvider> =
            Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        let cache = MetadataCache::new(Arc::clone(&provider), Duration::from_secs(60));
        let id = FileId::new();
        let key = keys::file_metadata(id);
        provider
            .set(&key, "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.get(id).await.unwrap().is_none());
        assert!(!provider.exists(&key).await.unwrap());
    }
}
