//! In-process [`MetadataStore`].
//!
//! Stands in for the durable database in single-instance deployments and
//! tests. It enforces the record invariants itself: ids and storage paths
//! are never reused, deleted records are frozen and `cdn_url` is set at
//! most once.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use unifile_core::error::AppError;
use unifile_core::result::AppResult;
use unifile_core::traits::MetadataStore;
use unifile_core::types::{AccessKind, DerivedArtifact, FileId, FileMetadata, StorageType};

/// Live file count and bytes of one module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUsage {
    pub file_count: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    files: DashMap<FileId, FileMetadata>,
    paths: DashMap<(StorageType, String), FileId>,
    usage: DashMap<String, ModuleUsage>,
    /// Serializes create and soft delete so the uniqueness checks and the
    /// usage counters see a consistent view.
    write_lock: Mutex<()>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage counters of a module; zero for unknown modules.
    pub fn module_usage(&self, module_id: &str) -> ModuleUsage {
        self.usage
            .get(module_id)
            .map(|u| *u)
            .unwrap_or_default()
    }

    /// Number of records, deleted ones included.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn mutate<T>(
        &self,
        id: FileId,
        f: impl FnOnce(&mut FileMetadata) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut record = self
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        if record.is_deleted {
            return Err(AppError::conflict(format!("File {id} is deleted")));
        }
        f(&mut *record)
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create_file(&self, metadata: &FileMetadata) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        if self.files.contains_key(&metadata.id) {
            return Err(AppError::conflict(format!(
                "File id {} already exists",
                metadata.id
            )));
        }
        let path_key = (metadata.storage_provider, metadata.storage_path.clone());
        if self.paths.contains_key(&path_key) {
            return Err(AppError::conflict(format!(
                "Storage path '{}' is already used on {}",
                metadata.storage_path, metadata.storage_provider
            )));
        }

        self.paths.insert(path_key, metadata.id);
        self.files.insert(metadata.id, metadata.clone());
        let mut usage = self.usage.entry(metadata.module_id.clone()).or_default();
        usage.file_count += 1;
        usage.total_bytes += metadata.size;

        debug!(file_id = %metadata.id, module_id = %metadata.module_id, "Created file record");
        Ok(())
    }

    async fn get_file_by_id(&self, id: FileId) -> AppResult<Option<FileMetadata>> {
        Ok(self.files.get(&id).map(|r| r.clone()))
    }

    async fn soft_delete_file(&self, id: FileId) -> AppResult<FileMetadata> {
        let _guard = self.write_lock.lock().await;

        let deleted = self.mutate(id, |record| {
            record.is_deleted = true;
            record.deleted_at = Some(Utc::now());
            Ok(record.clone())
        })?;

        if let Some(mut usage) = self.usage.get_mut(&deleted.module_id) {
            usage.file_count = usage.file_count.saturating_sub(1);
            usage.total_bytes = usage.total_bytes.saturating_sub(deleted.size);
        }
        debug!(file_id = %id, "Soft-deleted file record");
        Ok(deleted)
    }

    async fn update_access_stats(&self, id: FileId, kind: AccessKind) -> AppResult<()> {
        self.mutate(id, |record| {
            record.access_count += 1;
            if kind == AccessKind::Download {
                record.download_count += 1;
            }
            record.last_access_time = Some(Utc::now());
            Ok(())
        })
    }

    async fn attach_artifact(&self, id: FileId, artifact: DerivedArtifact) -> AppResult<()> {
        self.mutate(id, |record| {
            record.artifacts.push(artifact);
            Ok(())
        })
    }

    async fn set_cdn_url(&self, id: FileId, url: &str) -> AppResult<bool> {
        if url.is_empty() {
            return Err(AppError::validation("CDN URL must not be empty"));
        }
        self.mutate(id, |record| {
            if record.cdn_url.is_some() {
                return Ok(false);
            }
            record.cdn_url = Some(url.to_string());
            Ok(true)
        })
    }

    async fn list_by_module(&self, module_id: &str) -> AppResult<Vec<FileMetadata>> {
        let mut files: Vec<FileMetadata> = self
            .files
            .iter()
            .filter(|r| r.module_id == module_id && !r.is_deleted)
            .map(|r| r.clone())
            .collect();
        files.sort_by_key(|f| (f.upload_time, f.id));
        Ok(files)
    }
}
