//! Processing queue contract.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::ProcessingTask;

/// A bounded FIFO of processing tasks.
///
/// In-process and distributed implementations are interchangeable behind
/// this trait. Each task is handed out by `dequeue` at most once.
#[async_trait]
pub trait TaskQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Append a task. Fails immediately with `QueueFull` at capacity.
    fn enqueue(&self, task: ProcessingTask) -> AppResult<()>;

    /// Wait for the next task. Returns `None` once the queue is closed
    /// and drained.
    async fn dequeue(&self) -> Option<ProcessingTask>;

    /// Number of tasks waiting.
    fn len(&self) -> usize;

    /// Whether no tasks are waiting.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of waiting tasks.
    fn capacity(&self) -> usize;

    /// Stop accepting tasks; `dequeue` drains what is left.
    fn close(&self);
}
