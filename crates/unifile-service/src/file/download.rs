//! Downloads, access URLs and metadata reads.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use unifile_core::events::FileEvent;
use unifile_core::result::AppResult;
use unifile_core::types::{AccessKind, FileId, FileMetadata, Permission};

use super::FileService;

impl FileService {
    /// Read the bytes of a file.
    pub async fn download_file(&self, file_id: FileId, user_id: Option<&str>) -> AppResult<Bytes> {
        let file = self.load_file(file_id).await?;
        self.ctx.access.require_read(&file, user_id)?;

        self.emit(
            file_id,
            FileEvent::DownloadStart {
                user_id: user_id.map(str::to_string),
            },
        );

        let provider = self.ctx.storage.get(file.storage_provider).await?;
        let data = provider.download(&file.storage_path).await?;

        self.record_access(file_id, AccessKind::Download).await;
        self.emit(
            file_id,
            FileEvent::DownloadComplete {
                size_bytes: data.len() as u64,
            },
        );
        debug!(file_id = %file_id, bytes = data.len(), "Downloaded file");
        Ok(data)
    }

    /// An access URL for a file.
    ///
    /// Public files are served from the CDN when one is configured; the CDN
    /// URL is resolved and persisted on first access if the upload could not
    /// resolve it. Private files always get a provider URL, signed where
    /// the provider supports it.
    pub async fn get_file_url(
        &self,
        file_id: FileId,
        user_id: Option<&str>,
        expires_in: Option<Duration>,
    ) -> AppResult<String> {
        let file = self.load_file(file_id).await?;
        self.ctx.access.require_read(&file, user_id)?;

        // Public URLs do not depend on the caller.
        let cache_user = match file.permission {
            Permission::Public => None,
            Permission::Private => user_id,
        };
        let cached = self
            .ctx
            .url_cache
            .get(file_id, cache_user, expires_in)
            .await
            .unwrap_or_else(|e| {
                warn!(file_id = %file_id, error = %e, "URL cache read failed");
                None
            });

        let url = match cached {
            Some(url) => url,
            None => {
                let url = self.resolve_url(&file, expires_in).await?;
                if let Err(e) = self
                    .ctx
                    .url_cache
                    .put(file_id, cache_user, expires_in, &url)
                    .await
                {
                    warn!(file_id = %file_id, error = %e, "Failed to cache access URL");
                }
                url
            }
        };

        self.record_access(file_id, AccessKind::Url).await;
        Ok(url)
    }

    /// Metadata of a live file the caller may read.
    pub async fn get_file_metadata(
        &self,
        file_id: FileId,
        user_id: Option<&str>,
    ) -> AppResult<FileMetadata> {
        let file = self.load_file(file_id).await?;
        self.ctx.access.require_read(&file, user_id)?;
        Ok(file)
    }

    /// Live files of a module that the caller may read, oldest first.
    pub async fn list_files(
        &self,
        module_id: &str,
        user_id: Option<&str>,
    ) -> AppResult<Vec<FileMetadata>> {
        match self.ctx.listing_cache.get(module_id, user_id).await {
            Ok(Some(files)) => return Ok(files),
            Ok(None) => {}
            Err(e) => warn!(module_id, error = %e, "Listing cache read failed"),
        }

        let now = chrono::Utc::now();
        let files: Vec<FileMetadata> = self
            .ctx
            .metadata_store
            .list_by_module(module_id)
            .await?
            .into_iter()
            .filter(|f| f.is_available(now) && self.ctx.access.can_read(f, user_id))
            .collect();

        if let Err(e) = self.ctx.listing_cache.put(module_id, user_id, &files).await {
            warn!(module_id, error = %e, "Failed to cache listing");
        }
        Ok(files)
    }

    async fn resolve_url(&self, file: &FileMetadata, expires_in: Option<Duration>) -> AppResult<String> {
        if file.permission == Permission::Public {
            if let Some(url) = &file.cdn_url {
                return Ok(url.clone());
            }
            if let Some(url) = self.fill_cdn_url(file).await {
                return Ok(url);
            }
        }
        let provider = self.ctx.storage.get(file.storage_provider).await?;
        provider.get_access_url(&file.storage_path, expires_in).await
    }

    /// Resolve and persist a missing CDN URL. Failures fall back to the
    /// provider URL.
    async fn fill_cdn_url(&self, file: &FileMetadata) -> Option<String> {
        let url = match self.ctx.cdn.resolve(&file.storage_path, None).await {
            Ok(url) => url?,
            Err(e) => {
                warn!(file_id = %file.id, error = %e, "Lazy CDN URL resolution failed");
                return None;
            }
        };

        let _lock = self.locks.lock(file.id).await;
        match self.ctx.metadata_store.set_cdn_url(file.id, &url).await {
            Ok(_) => self.evict_metadata(file.id).await,
            Err(e) => warn!(file_id = %file.id, error = %e, "Failed to persist CDN URL"),
        }
        Some(url)
    }

    /// Bump access statistics. Best-effort.
    async fn record_access(&self, file_id: FileId, kind: AccessKind) {
        let _lock = self.locks.lock(file_id).await;
        if let Err(e) = self
            .ctx
            .metadata_store
            .update_access_stats(file_id, kind)
            .await
        {
            warn!(file_id = %file_id, error = %e, "Failed to update access statistics");
        }
        self.evict_metadata(file_id).await;
    }
}
