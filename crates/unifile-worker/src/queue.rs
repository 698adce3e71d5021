//! Bounded in-process FIFO of processing tasks.

use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use unifile_core::error::AppError;
use unifile_core::result::AppResult;
use unifile_core::traits::TaskQueue;
use unifile_core::types::ProcessingTask;

/// Single-instance task queue backed by a bounded channel.
///
/// `enqueue` never waits: a full queue rejects the task with `QueueFull`.
/// The receiver sits behind a mutex so each task is handed out once.
#[derive(Debug)]
pub struct InMemoryTaskQueue {
    sender: StdMutex<Option<mpsc::Sender<ProcessingTask>>>,
    receiver: Mutex<mpsc::Receiver<ProcessingTask>>,
    capacity: usize,
    len: AtomicUsize,
}

impl InMemoryTaskQueue {
    /// Create a queue holding at most `capacity` waiting tasks.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender: StdMutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
            capacity: capacity.max(1),
            len: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    fn enqueue(&self, task: ProcessingTask) -> AppResult<()> {
        let guard = self
            .sender
            .lock()
            .map_err(|_| AppError::internal("Processing queue lock poisoned"))?;
        let sender = guard
            .as_ref()
            .ok_or_else(|| AppError::internal("Processing queue is closed"))?;

        let task_id = task.id;
        let file_id = task.file_id;
        match sender.try_send(task) {
            Ok(()) => {
                let len = self.len.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(task_id = %task_id, file_id = %file_id, queued = len, "Enqueued processing task");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(AppError::queue_full(format!(
                "Processing queue is full (capacity {})",
                self.capacity
            ))),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(AppError::internal("Processing queue is closed"))
            }
        }
    }

    async fn dequeue(&self) -> Option<ProcessingTask> {
        let task = self.receiver.lock().await.recv().await?;
        self.len.fetch_sub(1, Ordering::SeqCst);
        Some(task)
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}
