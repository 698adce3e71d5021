//! The file service: the public API of the engine.
//!
//! Operations are split by concern:
//!
//! - `upload`: validation, storage, metadata persistence
//! - `download`: downloads, access URLs and metadata reads
//! - `delete`: soft delete, single and batched
//! - `processing`: post-upload tasks and the processing worker

mod delete;
mod download;
mod locks;
mod processing;
mod upload;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use unifile_core::error::AppError;
use unifile_core::events::{DomainEvent, EventFilter, FileEvent};
use unifile_core::result::AppResult;
use unifile_core::types::{FileId, FileMetadata, StorageType, UploadProgress};

use crate::context::ServiceContext;
use crate::events::ListenerId;

use self::locks::FileLocks;
use self::processing::ProcessingGates;

/// Component health, as reported by [`FileService::health_check`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub storage: HashMap<StorageType, bool>,
    pub cache: bool,
    pub queue_len: usize,
    pub queue_capacity: usize,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.cache && self.storage.values().all(|ok| *ok)
    }
}

/// Coordinates storage providers, caches, the metadata store, the
/// processing queue and the event bus.
#[derive(Debug, Clone)]
pub struct FileService {
    ctx: Arc<ServiceContext>,
    gates: ProcessingGates,
    locks: FileLocks,
}

impl FileService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            gates: ProcessingGates::default(),
            locks: FileLocks::default(),
        }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Validate the configuration once and initialize every registered
    /// provider and processor.
    ///
    /// Provider failures are fatal unless the development-mode local
    /// fallback is enabled.
    pub async fn initialize(&self) -> AppResult<()> {
        let config = &self.ctx.config;
        config.validate_all()?;

        self.ctx.storage.initialize_all(&config.storage).await?;
        self.ctx.cdn.initialize_all().await?;
        self.ctx.processors.initialize_all().await?;

        info!(
            default_storage = ?self.ctx.storage.default_type().await,
            processors = ?self.ctx.processors.list_types().await,
            "File service initialized"
        );
        Ok(())
    }

    /// Progress of a recent upload. Records disappear a short while after
    /// the upload reaches a terminal status.
    pub fn get_upload_progress(&self, file_id: FileId) -> Option<UploadProgress> {
        self.ctx.progress.get(file_id)
    }

    /// Subscribe to lifecycle events. Pass an [`EventType`] for one kind or
    /// [`EventFilter::AnyEvent`] for all of them.
    ///
    /// [`EventType`]: unifile_core::events::EventType
    pub fn on_file_event<F>(&self, filter: impl Into<EventFilter>, listener: F) -> ListenerId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        self.ctx.events.on(filter, listener)
    }

    pub fn off_file_event(&self, filter: impl Into<EventFilter>, id: ListenerId) -> bool {
        self.ctx.events.off(filter, id)
    }

    pub async fn health_check(&self) -> HealthReport {
        let cache = match self.ctx.cache.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
        };
        HealthReport {
            storage: self.ctx.storage.health_check_all().await,
            cache,
            queue_len: self.ctx.queue.len(),
            queue_capacity: self.ctx.queue.capacity(),
        }
    }

    fn emit(&self, file_id: FileId, payload: FileEvent) {
        self.ctx.events.emit(&DomainEvent::new(file_id, payload));
    }

    /// Read a live file record, cache first.
    ///
    /// Deleted and expired files are `NotFound`.
    async fn load_file(&self, file_id: FileId) -> AppResult<FileMetadata> {
        let cached = self
            .ctx
            .metadata_cache
            .get(file_id)
            .await
            .unwrap_or_else(|e| {
                warn!(file_id = %file_id, error = %e, "Metadata cache read failed");
                None
            });

        let file = match cached {
            Some(file) => file,
            None => {
                let _lock = self.locks.lock(file_id).await;
                let file = self
                    .ctx
                    .metadata_store
                    .get_file_by_id(file_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
                if file.is_available(Utc::now()) {
                    self.cache_metadata(&file).await;
                }
                file
            }
        };

        if !file.is_available(Utc::now()) {
            return Err(AppError::not_found(format!("File {file_id} not found")));
        }
        Ok(file)
    }

    async fn cache_metadata(&self, file: &FileMetadata) {
        if let Err(e) = self.ctx.metadata_cache.put(file).await {
            warn!(file_id = %file.id, error = %e, "Failed to cache file metadata");
        }
    }

    async fn evict_metadata(&self, file_id: FileId) {
        if let Err(e) = self.ctx.metadata_cache.evict(file_id).await {
            warn!(file_id = %file_id, error = %e, "Failed to evict file metadata");
        }
    }

    async fn invalidate_listings(&self, file: &FileMetadata) {
        if let Err(e) = self
            .ctx
            .listing_cache
            .invalidate(&file.module_id, file.business_id.as_deref())
            .await
        {
            warn!(module_id = %file.module_id, error = %e, "Failed to invalidate listings");
        }
    }
}
