//! Upload orchestration.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use unifile_core::error::AppError;
use unifile_core::events::FileEvent;
use unifile_core::result::AppResult;
use unifile_core::traits::{FileProcessor, StorageProvider};
use unifile_core::types::{
    FileId, FileMetadata, ProcessingOptions, StorageType, UploadFileInfo, UploadStatus,
};
use unifile_storage::{mime, path};

use super::FileService;
use super::processing::UploadGate;
use crate::progress::ProgressCallback;

/// Progress checkpoint once the provider acknowledged the write and a
/// processing task is still pending.
const STORED_WITH_PROCESSING: u8 = 70;

/// Fate of the processing step requested with an upload.
enum QueuedProcessing {
    NotRequested,
    /// Queued; the gate is opened after `upload:complete`.
    Queued(UploadGate),
    /// Rejected by the queue; reported once the upload completes.
    Rejected { processor: String, error: String },
}

impl FileService {
    /// Store a new file and persist its metadata.
    ///
    /// Every call allocates a fresh file id, so two uploads never target
    /// the same storage path. A failed upload is not retried: nothing is
    /// persisted, `upload:error` is emitted and the progress record is
    /// marked failed. Calling again is the caller's decision.
    ///
    /// When processing is requested the task is queued; a full queue only
    /// rejects the processing step (reported as `processing:error`), never
    /// the upload.
    pub async fn upload_file(
        &self,
        file: UploadFileInfo,
        storage_type: Option<StorageType>,
        on_progress: Option<ProgressCallback>,
    ) -> AppResult<FileMetadata> {
        let mime_type = mime::resolve_mime_type(file.mime_type.as_deref(), &file.original_name);
        self.validate_upload(&file, &mime_type)?;
        let processor = match &file.processing {
            Some(options) => Some(self.resolve_processor(options, &mime_type).await?),
            None => None,
        };

        let file_id = FileId::new();
        let started = Instant::now();
        let content_hash = hex::encode(Sha256::digest(&file.data));
        let size = file.size();

        let pending = self.ctx.progress.start(file_id, size);
        if let Some(callback) = &on_progress {
            callback(&pending);
        }
        self.emit(
            file_id,
            FileEvent::UploadStart {
                file_name: file.original_name.clone(),
                size_bytes: size,
            },
        );
        self.checkpoint(file_id, UploadStatus::Uploading, 0, 0, on_progress.as_ref());

        let file = file.with_mime_type(mime_type);
        let result = self
            .store_upload(
                file_id,
                file,
                content_hash,
                processor,
                storage_type,
                started,
                on_progress.as_ref(),
            )
            .await;

        if let Err(e) = &result {
            let message = e.to_string();
            error!(file_id = %file_id, error = %message, "Upload failed");
            if let Some(progress) = self.ctx.progress.fail(file_id, &message) {
                if let Some(callback) = &on_progress {
                    callback(&progress);
                }
            }
            self.emit(file_id, FileEvent::UploadError { error: message });
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn store_upload(
        &self,
        file_id: FileId,
        file: UploadFileInfo,
        content_hash: String,
        processor: Option<Arc<dyn FileProcessor>>,
        requested: Option<StorageType>,
        started: Instant,
        on_progress: Option<&ProgressCallback>,
    ) -> AppResult<FileMetadata> {
        let (storage_type, provider) = self.ctx.storage.select(requested).await?;

        let now = Utc::now();
        let extension = path::extension_of(&file.original_name);
        let storage_name = path::storage_name(file_id, &extension);
        let storage_path = path::storage_path(&file.module_id, now, &storage_name);

        let stored = provider.upload(&file, &storage_path).await?;

        // Best-effort: an unresolved CDN URL is filled lazily on access.
        let cdn_url = match self.ctx.cdn.resolve(&stored.path, stored.url.as_deref()).await {
            Ok(url) => url,
            Err(e) => {
                warn!(file_id = %file_id, error = %e, "CDN URL resolution failed");
                None
            }
        };

        let size = file.size();
        let metadata = FileMetadata {
            id: file_id,
            original_name: file.original_name.clone(),
            storage_name,
            size,
            mime_type: file.content_type().to_string(),
            extension,
            content_hash,
            upload_time: now,
            permission: file.permission,
            uploader_id: file.uploader_id.clone(),
            module_id: file.module_id.clone(),
            business_id: file.business_id.clone(),
            storage_provider: storage_type,
            storage_path: stored.path.clone(),
            cdn_url,
            access_count: 0,
            download_count: 0,
            last_access_time: None,
            expires_at: file.expires_at,
            metadata: file.metadata.clone(),
            artifacts: Vec::new(),
            is_deleted: false,
            deleted_at: None,
        };

        let processing = match (processor, &file.processing) {
            (Some(processor), Some(options)) => {
                self.enqueue_after_upload(&metadata, processor, options.clone())
            }
            _ => QueuedProcessing::NotRequested,
        };
        let queued = matches!(processing, QueuedProcessing::Queued(_));

        if let Err(e) = self.ctx.metadata_store.create_file(&metadata).await {
            if let QueuedProcessing::Queued(gate) = processing {
                gate.close();
            }
            self.remove_orphan(provider.as_ref(), &stored.path).await;
            return Err(e);
        }

        self.cache_metadata(&metadata).await;
        self.invalidate_listings(&metadata).await;

        if queued {
            self.checkpoint(
                file_id,
                UploadStatus::Uploading,
                STORED_WITH_PROCESSING,
                size,
                on_progress,
            );
        } else {
            self.checkpoint(file_id, UploadStatus::Completed, 100, size, on_progress);
        }

        let upload_time_ms = started.elapsed().as_millis() as u64;
        self.emit(
            file_id,
            FileEvent::UploadComplete {
                file_name: metadata.original_name.clone(),
                size_bytes: size,
                storage_type,
                storage_path: metadata.storage_path.clone(),
                upload_time_ms,
            },
        );
        match processing {
            QueuedProcessing::Queued(gate) => gate.open(),
            QueuedProcessing::Rejected { processor, error } => self.emit(
                file_id,
                FileEvent::ProcessingError {
                    processor: Some(processor),
                    error,
                },
            ),
            QueuedProcessing::NotRequested => {}
        }

        info!(
            file_id = %file_id,
            module_id = %metadata.module_id,
            storage_type = %storage_type,
            path = %metadata.storage_path,
            bytes = size,
            parts = stored.part_count,
            elapsed_ms = upload_time_ms,
            processing = queued,
            "Upload completed"
        );
        Ok(metadata)
    }

    /// Reject the upload before any I/O.
    fn validate_upload(&self, file: &UploadFileInfo, mime_type: &str) -> AppResult<()> {
        let limits = &self.ctx.config.upload;

        if file.original_name.trim().is_empty() {
            return Err(AppError::validation("File name must not be empty"));
        }
        if file.module_id.trim().is_empty() {
            return Err(AppError::validation("Module id must not be empty"));
        }
        if file.uploader_id.trim().is_empty() {
            return Err(AppError::validation("Uploader id must not be empty"));
        }
        if file.size() > limits.max_file_size_bytes {
            return Err(AppError::validation(format!(
                "File size {} exceeds the maximum of {} bytes",
                file.size(),
                limits.max_file_size_bytes
            )));
        }
        if !limits.is_mime_allowed(mime_type) {
            return Err(AppError::validation(format!(
                "MIME type '{mime_type}' is not allowed"
            )));
        }
        if file.expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(AppError::validation("Expiry time is in the past"));
        }
        Ok(())
    }

    pub(super) async fn resolve_processor(
        &self,
        options: &ProcessingOptions,
        mime_type: &str,
    ) -> AppResult<Arc<dyn FileProcessor>> {
        if !self.ctx.config.processing.enabled {
            return Err(AppError::validation("Processing is disabled"));
        }
        self.ctx.processors.resolve(options, mime_type).await
    }

    /// Queue the processing task of a fresh upload behind a gate that
    /// opens once the upload completes.
    ///
    /// A rejection is only logged here; its `processing:error` follows
    /// `upload:complete`.
    fn enqueue_after_upload(
        &self,
        metadata: &FileMetadata,
        processor: Arc<dyn FileProcessor>,
        options: ProcessingOptions,
    ) -> QueuedProcessing {
        let task = Self::build_task(metadata, processor, options);
        let processor_type = task.processor.processor_type().to_string();

        let gate = self.gates.register(metadata.id);
        match self.ctx.queue.enqueue(task) {
            Ok(()) => QueuedProcessing::Queued(gate),
            Err(e) => {
                self.gates.forget(metadata.id);
                warn!(file_id = %metadata.id, error = %e, "Processing task rejected");
                QueuedProcessing::Rejected {
                    processor: processor_type,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Update the progress record, notify the caller and emit
    /// `upload:progress`.
    fn checkpoint(
        &self,
        file_id: FileId,
        status: UploadStatus,
        progress: u8,
        uploaded_bytes: u64,
        on_progress: Option<&ProgressCallback>,
    ) {
        let Some(record) = self
            .ctx
            .progress
            .advance(file_id, status, progress, uploaded_bytes)
        else {
            return;
        };
        if let Some(callback) = on_progress {
            callback(&record);
        }
        self.emit(
            file_id,
            FileEvent::UploadProgress {
                progress: record.progress,
                uploaded_bytes: record.uploaded_bytes,
                total_bytes: record.total_bytes,
            },
        );
    }

    /// Delete bytes whose metadata could not be persisted.
    async fn remove_orphan(&self, provider: &dyn StorageProvider, path: &str) {
        match provider.delete(path).await {
            Ok(_) => debug!(path, "Removed orphaned object"),
            Err(e) => warn!(path, error = %e, "Failed to remove orphaned object"),
        }
    }
}
