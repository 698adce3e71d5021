//! Hooks the worker calls around each task.

use async_trait::async_trait;

use unifile_core::error::AppError;
use unifile_core::types::{DerivedArtifact, ProcessingTask};

/// Receives task lifecycle callbacks from the [`ProcessingWorker`].
///
/// [`ProcessingWorker`]: crate::worker::ProcessingWorker
#[async_trait]
pub trait ProcessingObserver: Send + Sync + std::fmt::Debug + 'static {
    /// Called before a task runs. Returning `false` skips the task.
    async fn on_start(&self, task: &ProcessingTask) -> bool;

    /// The processor output was stored.
    async fn on_complete(&self, task: &ProcessingTask, artifact: &DerivedArtifact);

    /// The task failed. It is dropped afterwards.
    async fn on_error(&self, task: &ProcessingTask, error: &AppError);
}

/// Observer that runs every task and ignores the outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl ProcessingObserver for NoopObserver {
    async fn on_start(&self, _task: &ProcessingTask) -> bool {
        true
    }

    async fn on_complete(&self, _task: &ProcessingTask, _artifact: &DerivedArtifact) {}

    async fn on_error(&self, _task: &ProcessingTask, _error: &AppError) {}
}
