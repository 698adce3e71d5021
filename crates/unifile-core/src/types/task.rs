//! Queued post-upload processing work.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::file::{ProcessingOptions, StorageType};
use super::id::{FileId, TaskId};
use crate::traits::FileProcessor;

/// A unit of work for the processing worker.
///
/// Removed from the queue once attempted; failures are never re-queued.
#[derive(Debug, Clone)]
pub struct ProcessingTask {
    pub id: TaskId,
    pub file_id: FileId,
    pub processor: Arc<dyn FileProcessor>,
    /// Provider holding both the input and the output.
    pub storage_type: StorageType,
    pub input_path: String,
    pub output_path: String,
    /// MIME type of the input.
    pub mime_type: String,
    pub options: ProcessingOptions,
    pub enqueued_at: DateTime<Utc>,
}
