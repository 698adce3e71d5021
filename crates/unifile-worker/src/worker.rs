//! The processing worker: one loop draining the task queue in order.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use unifile_core::result::AppResult;
use unifile_core::traits::TaskQueue;
use unifile_core::types::{DerivedArtifact, ProcessingTask, UploadFileInfo};
use unifile_storage::StorageManager;

use crate::observer::ProcessingObserver;

/// Drains a [`TaskQueue`] strictly sequentially.
///
/// Each task reads its input from the provider that holds the original,
/// runs the processor and writes the output next to the original. A failed
/// task is reported to the observer and dropped.
#[derive(Debug, Clone)]
pub struct ProcessingWorker {
    queue: Arc<dyn TaskQueue>,
    storage: StorageManager,
    observer: Arc<dyn ProcessingObserver>,
}

impl ProcessingWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        storage: StorageManager,
        observer: Arc<dyn ProcessingObserver>,
    ) -> Self {
        Self {
            queue,
            storage,
            observer,
        }
    }

    /// Run until the cancel signal flips to `true` or the queue closes.
    ///
    /// A task that has started always runs to completion.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) {
        info!(capacity = self.queue.capacity(), "Processing worker started");

        loop {
            if *cancel.borrow() {
                break;
            }
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("Processing worker received shutdown signal");
                        break;
                    }
                }
                task = self.queue.dequeue() => match task {
                    Some(task) => self.execute(task).await,
                    None => {
                        info!("Processing queue closed");
                        break;
                    }
                },
            }
        }

        info!(pending = self.queue.len(), "Processing worker stopped");
    }

    /// Run one task and report the outcome to the observer.
    pub async fn execute(&self, task: ProcessingTask) {
        if !self.observer.on_start(&task).await {
            debug!(task_id = %task.id, file_id = %task.file_id, "Skipping processing task");
            return;
        }

        let started = std::time::Instant::now();
        match self.process(&task).await {
            Ok(artifact) => {
                info!(
                    task_id = %task.id,
                    file_id = %task.file_id,
                    processor = task.processor.processor_type(),
                    output = %artifact.path,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Processing task completed"
                );
                self.observer.on_complete(&task, &artifact).await;
            }
            Err(e) => {
                warn!(
                    task_id = %task.id,
                    file_id = %task.file_id,
                    processor = task.processor.processor_type(),
                    error = %e,
                    "Processing task failed"
                );
                self.observer.on_error(&task, &e).await;
            }
        }
    }

    async fn process(&self, task: &ProcessingTask) -> AppResult<DerivedArtifact> {
        let provider = self.storage.get(task.storage_type).await?;
        let input = provider.download(&task.input_path).await?;
        let output = task.processor.process(input, &task.options).await?;

        let file_name = task
            .output_path
            .rsplit('/')
            .next()
            .unwrap_or(task.output_path.as_str())
            .to_string();
        let info = UploadFileInfo::new(output.data, file_name, "", "")
            .with_mime_type(output.mime_type.clone());
        let stored = provider.upload(&info, &task.output_path).await?;

        Ok(DerivedArtifact {
            processor: task.processor.processor_type().to_string(),
            path: stored.path,
            mime_type: output.mime_type,
            size: stored.size_bytes,
            details: output.details,
            created_at: Utc::now(),
        })
    }
}
