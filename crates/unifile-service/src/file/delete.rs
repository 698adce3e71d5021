//! Soft delete.

use tracing::{info, warn};

use unifile_core::events::FileEvent;
use unifile_core::result::AppResult;
use unifile_core::types::{BatchFailure, BatchOperationResult, FileId};

use super::FileService;

impl FileService {
    /// Soft-delete a file. Only its uploader may do so.
    ///
    /// The stored bytes stay with the provider until a purge job removes
    /// them. Deleting an already deleted file fails with `NotFound`.
    pub async fn delete_file(&self, file_id: FileId, user_id: Option<&str>) -> AppResult<()> {
        let file = self.load_file(file_id).await?;
        self.ctx.access.require_modify(&file, user_id)?;

        let deleted = {
            let _lock = self.locks.lock(file_id).await;
            let deleted = self.ctx.metadata_store.soft_delete_file(file_id).await?;
            self.evict_metadata(file_id).await;
            deleted
        };
        if let Err(e) = self.ctx.url_cache.evict_file(file_id).await {
            warn!(file_id = %file_id, error = %e, "Failed to evict cached URLs");
        }
        self.invalidate_listings(&deleted).await;

        self.emit(
            file_id,
            FileEvent::DeleteComplete {
                user_id: user_id.map(str::to_string),
            },
        );
        info!(file_id = %file_id, module_id = %deleted.module_id, "File deleted");
        Ok(())
    }

    /// Delete several files, one at a time. A failure does not stop the
    /// batch; it is reported in the result.
    pub async fn batch_delete_files(
        &self,
        file_ids: &[FileId],
        user_id: Option<&str>,
    ) -> AppResult<BatchOperationResult> {
        let mut result = BatchOperationResult::default();
        for &file_id in file_ids {
            match self.delete_file(file_id, user_id).await {
                Ok(()) => result.success_count += 1,
                Err(e) => {
                    result.failure_count += 1;
                    result.failures.push(BatchFailure {
                        file_id,
                        kind: e.kind,
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            requested = file_ids.len(),
            deleted = result.success_count,
            failed = result.failure_count,
            "Batch delete finished"
        );
        Ok(result)
    }
}
