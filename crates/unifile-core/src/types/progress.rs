//! Transient upload progress records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::FileId;

/// Upload lifecycle status.
///
/// Moves forward only: `Pending → Uploading → [Processing] → Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    /// `Completed` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Coarse, checkpoint-based progress of one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub file_id: FileId,
    pub status: UploadStatus,
    /// 0-100, non-decreasing.
    pub progress: u8,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    /// Observed throughput in bytes per second.
    pub speed: f64,
    /// Estimated seconds remaining, when known.
    pub remaining_time: Option<f64>,
    /// Mirrors the message of the error that failed the upload.
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadProgress {
    /// A fresh `Pending` record at 0%.
    pub fn pending(file_id: FileId, total_bytes: u64) -> Self {
        let now = Utc::now();
        Self {
            file_id,
            status: UploadStatus::Pending,
            progress: 0,
            uploaded_bytes: 0,
            total_bytes,
            speed: 0.0,
            remaining_time: None,
            error: None,
            started_at: now,
            updated_at: now,
        }
    }
}
