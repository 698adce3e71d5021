//! Typed cache of module listings.

use std::sync::Arc;
use std::time::Duration;

use unifile_core::result::AppResult;
use unifile_core::traits::CacheProvider;
use unifile_core::types::FileMetadata;

use crate::keys;

/// Caches the files of a module as seen by one caller. Invalidated by
/// pattern whenever the module gains or loses a file.
#[derive(Debug, Clone)]
pub struct ListingCache {
    provider: Arc<dyn CacheProvider>,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(provider: Arc<dyn CacheProvider>, ttl: Duration) -> Self {
        Self { provider, ttl }
    }

    pub async fn get(
        &self,
        module_id: &str,
        viewer: Option<&str>,
    ) -> AppResult<Option<Vec<FileMetadata>>> {
        let key = keys::module_listing(module_id, viewer);
        match self.provider.get(&key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).ok()),
            None => Ok(None),
        }
    }

    pub async fn put(
        &self,
        module_id: &str,
        viewer: Option<&str>,
        files: &[FileMetadata],
    ) -> AppResult<()> {
        let json = serde_json::to_string(files)?;
        self.provider
            .set(&keys::module_listing(module_id, viewer), &json, self.ttl)
            .await
    }

    /// Drop every listing of a module and, when given, of a business entity.
    pub async fn invalidate(&self, module_id: &str, business_id: Option<&str>) -> AppResult<u64> {
        let mut removed = self
            .provider
            .delete_pattern(&keys::module_listing_pattern(module_id))
            .await?;
        if let Some(business_id) = business_id {
            removed += self
                .provider
                .delete_pattern(&keys::business_listing_pattern(business_id))
                .await?;
        }
        Ok(removed)
    }
}
