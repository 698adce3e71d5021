//! Metadata store contract.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{AccessKind, DerivedArtifact, FileId, FileMetadata};

/// Durable persistence of [`FileMetadata`] records.
///
/// Implementations provide read-your-writes consistency and enforce the
/// record invariants: ids are never reused, storage paths are unique per
/// provider, and a soft-deleted record accepts no further mutation.
#[async_trait]
pub trait MetadataStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a finalized record. Fails with `Conflict` on a reused id
    /// or a duplicate storage path.
    async fn create_file(&self, metadata: &FileMetadata) -> AppResult<()>;

    /// Fetch a record, including soft-deleted ones.
    async fn get_file_by_id(&self, id: FileId) -> AppResult<Option<FileMetadata>>;

    /// Mark a record deleted and return it. Fails with `NotFound` for an
    /// unknown id and `Conflict` when it is already deleted.
    async fn soft_delete_file(&self, id: FileId) -> AppResult<FileMetadata>;

    /// Increment access counters and stamp `last_access_time`.
    async fn update_access_stats(&self, id: FileId, kind: AccessKind) -> AppResult<()>;

    /// Attach a processor output to the record.
    async fn attach_artifact(&self, id: FileId, artifact: DerivedArtifact) -> AppResult<()>;

    /// Fill `cdn_url` if it is still empty. Returns whether it was set.
    async fn set_cdn_url(&self, id: FileId, url: &str) -> AppResult<bool>;

    /// Non-deleted records of a module, newest first.
    async fn list_by_module(&self, module_id: &str) -> AppResult<Vec<FileMetadata>>;
}
