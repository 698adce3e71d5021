//! Transient per-upload progress records.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use unifile_core::types::{FileId, UploadProgress, UploadStatus};

/// Caller-supplied hook invoked at every progress checkpoint of one upload.
pub type ProgressCallback = Arc<dyn Fn(&UploadProgress) + Send + Sync>;

/// In-memory progress table.
///
/// Updates never move a record backwards: the status only advances, the
/// percentage is non-decreasing and a terminal record is frozen. Terminal
/// records are dropped after the retention period.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    records: Arc<DashMap<FileId, UploadProgress>>,
    retention: Duration,
}

impl ProgressTracker {
    pub fn new(retention: Duration) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            retention,
        }
    }

    /// Create a `Pending` record at 0%.
    pub fn start(&self, file_id: FileId, total_bytes: u64) -> UploadProgress {
        let record = UploadProgress::pending(file_id, total_bytes);
        self.records.insert(file_id, record.clone());
        record
    }

    /// Move a record forward. Returns the updated record, or `None` when
    /// the id is unknown.
    pub fn advance(
        &self,
        file_id: FileId,
        status: UploadStatus,
        progress: u8,
        uploaded_bytes: u64,
    ) -> Option<UploadProgress> {
        let (updated, finished) = {
            let mut record = self.records.get_mut(&file_id)?;
            let was_terminal = record.status.is_terminal();
            if !was_terminal {
                let now = Utc::now();
                record.status = record.status.max(status);
                record.progress = record.progress.max(progress.min(100));
                record.uploaded_bytes = record.uploaded_bytes.max(uploaded_bytes);

                let elapsed = (now - record.started_at).num_milliseconds().max(1) as f64 / 1000.0;
                record.speed = record.uploaded_bytes as f64 / elapsed;
                let remaining = record.total_bytes.saturating_sub(record.uploaded_bytes);
                record.remaining_time = if remaining == 0 {
                    Some(0.0)
                } else if record.speed > 0.0 {
                    Some(remaining as f64 / record.speed)
                } else {
                    None
                };
                record.updated_at = now;
            }
            (record.clone(), !was_terminal && record.status.is_terminal())
        };

        if finished {
            self.schedule_removal(file_id);
        }
        Some(updated)
    }

    /// Mark a record failed, keeping its percentage.
    pub fn fail(&self, file_id: FileId, error: &str) -> Option<UploadProgress> {
        let (updated, finished) = {
            let mut record = self.records.get_mut(&file_id)?;
            let was_terminal = record.status.is_terminal();
            if !was_terminal {
                record.status = UploadStatus::Failed;
                record.error = Some(error.to_string());
                record.remaining_time = None;
                record.updated_at = Utc::now();
            }
            (record.clone(), !was_terminal)
        };
        if finished {
            self.schedule_removal(file_id);
        }
        Some(updated)
    }

    pub fn get(&self, file_id: FileId) -> Option<UploadProgress> {
        self.records.get(&file_id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn schedule_removal(&self, file_id: FileId) {
        let records = Arc::clone(&self.records);
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if records
                .remove_if(&file_id, |_, r| r.status.is_terminal())
                .is_some()
            {
                debug!(file_id = %file_id, "Dropped upload progress record");
            }
        });
    }
}
