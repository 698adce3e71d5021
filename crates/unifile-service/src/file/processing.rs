//! Post-upload processing: task creation, the upload gate and the worker
//! callbacks.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use unifile_core::error::AppError;
use unifile_core::events::FileEvent;
use unifile_core::result::AppResult;
use unifile_core::traits::FileProcessor;
use unifile_core::types::{
    DerivedArtifact, FileId, FileMetadata, ProcessingOptions, ProcessingTask, TaskId, UploadStatus,
};
use unifile_storage::path;
use unifile_worker::{ProcessingObserver, ProcessingWorker};

use super::FileService;

/// Per-file gates holding a queued task back until its upload finishes.
///
/// The map only keeps the receiving side. The sender lives in the
/// [`UploadGate`] owned by the running upload, so an upload that is dropped
/// midway closes its gate and the task is skipped.
#[derive(Debug, Clone, Default)]
pub(super) struct ProcessingGates {
    gates: Arc<DashMap<FileId, watch::Receiver<Option<bool>>>>,
}

impl ProcessingGates {
    pub(super) fn register(&self, file_id: FileId) -> UploadGate {
        let (tx, rx) = watch::channel(None);
        self.gates.insert(file_id, rx);
        UploadGate { tx }
    }

    pub(super) fn forget(&self, file_id: FileId) {
        self.gates.remove(&file_id);
    }

    /// Wait for the gate of `file_id` and consume it. Files without a gate
    /// proceed immediately.
    async fn wait(&self, file_id: FileId) -> bool {
        let Some((_, mut rx)) = self.gates.remove(&file_id) else {
            return true;
        };
        match rx.wait_for(Option::is_some).await {
            Ok(state) => state.unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Sending half of a processing gate.
///
/// `None` while the upload is in flight, then `Some(true)` once
/// `upload:complete` was emitted or `Some(false)` if the upload failed.
/// Dropping it without [`open`](Self::open) closes the channel, which the
/// worker reads as a failed upload.
#[derive(Debug)]
pub(super) struct UploadGate {
    tx: watch::Sender<Option<bool>>,
}

impl UploadGate {
    pub(super) fn open(self) {
        self.tx.send_replace(Some(true));
    }

    pub(super) fn close(self) {
        self.tx.send_replace(Some(false));
    }
}

impl FileService {
    /// Queue processing for an existing file. Only its uploader may do so.
    ///
    /// Fails with `QueueFull` when the queue is at capacity.
    pub async fn enqueue_processing(
        &self,
        file_id: FileId,
        user_id: Option<&str>,
        options: ProcessingOptions,
    ) -> AppResult<TaskId> {
        let file = self.load_file(file_id).await?;
        self.ctx.access.require_modify(&file, user_id)?;
        let processor = self.resolve_processor(&options, &file.mime_type).await?;

        let task = Self::build_task(&file, processor, options);
        let task_id = task.id;
        self.ctx.queue.enqueue(task)?;

        info!(
            file_id = %file_id,
            task_id = %task_id,
            queued = self.ctx.queue.len(),
            "Processing task queued"
        );
        Ok(task_id)
    }

    /// Spawn the processing worker. It drains the queue until `cancel`
    /// flips to `true`.
    pub fn start_processing(&self, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        let worker = ProcessingWorker::new(
            Arc::clone(&self.ctx.queue),
            self.ctx.storage.clone(),
            Arc::new(LifecycleObserver {
                service: self.clone(),
            }),
        );
        tokio::spawn(worker.run(cancel))
    }

    pub(super) fn build_task(
        file: &FileMetadata,
        processor: Arc<dyn FileProcessor>,
        options: ProcessingOptions,
    ) -> ProcessingTask {
        let output_path =
            path::processed_output_path(&file.storage_path, &processor.output_extension(&options));
        ProcessingTask {
            id: TaskId::new(),
            file_id: file.id,
            processor,
            storage_type: file.storage_provider,
            input_path: file.storage_path.clone(),
            output_path,
            mime_type: file.mime_type.clone(),
            options,
            enqueued_at: Utc::now(),
        }
    }
}

/// Maps worker callbacks onto progress records, metadata and events.
#[derive(Debug)]
struct LifecycleObserver {
    service: FileService,
}

#[async_trait]
impl ProcessingObserver for LifecycleObserver {
    async fn on_start(&self, task: &ProcessingTask) -> bool {
        if !self.service.gates.wait(task.file_id).await {
            debug!(file_id = %task.file_id, "Upload did not complete; dropping task");
            return false;
        }

        let ctx = &self.service.ctx;
        ctx.progress
            .advance(task.file_id, UploadStatus::Processing, 0, 0);
        self.service.emit(
            task.file_id,
            FileEvent::ProcessingStart {
                processor: task.processor.processor_type().to_string(),
            },
        );
        true
    }

    async fn on_complete(&self, task: &ProcessingTask, artifact: &DerivedArtifact) {
        let ctx = &self.service.ctx;
        {
            let _lock = self.service.locks.lock(task.file_id).await;
            if let Err(e) = ctx
                .metadata_store
                .attach_artifact(task.file_id, artifact.clone())
                .await
            {
                warn!(file_id = %task.file_id, error = %e, "Failed to attach artifact");
            }
            self.service.evict_metadata(task.file_id).await;
        }

        ctx.progress
            .advance(task.file_id, UploadStatus::Completed, 100, 0);
        self.service.emit(
            task.file_id,
            FileEvent::ProcessingComplete {
                processor: artifact.processor.clone(),
                output_path: artifact.path.clone(),
                size_bytes: artifact.size,
            },
        );
    }

    async fn on_error(&self, task: &ProcessingTask, error: &AppError) {
        let message = error.to_string();
        self.service.ctx.progress.fail(task.file_id, &message);
        self.service.emit(
            task.file_id,
            FileEvent::ProcessingError {
                processor: Some(task.processor.processor_type().to_string()),
                error: message,
            },
        );
    }
}
