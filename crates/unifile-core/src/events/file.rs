//! File lifecycle events.

use serde::{Deserialize, Serialize};

use crate::types::StorageType;

/// Payload of a file lifecycle event. Each variant carries its own data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileEvent {
    /// Validation passed and the upload is about to reach a provider.
    UploadStart {
        file_name: String,
        size_bytes: u64,
    },
    /// A progress checkpoint was reached.
    UploadProgress {
        progress: u8,
        uploaded_bytes: u64,
        total_bytes: u64,
    },
    /// The file is stored and its metadata persisted.
    UploadComplete {
        file_name: String,
        size_bytes: u64,
        storage_type: StorageType,
        storage_path: String,
        upload_time_ms: u64,
    },
    /// The upload failed; nothing was persisted.
    UploadError { error: String },
    /// A download passed access checks.
    DownloadStart { user_id: Option<String> },
    /// The bytes were read from the provider.
    DownloadComplete { size_bytes: u64 },
    /// The file was soft-deleted.
    DeleteComplete { user_id: Option<String> },
    /// The worker picked up a processing task.
    ProcessingStart { processor: String },
    /// A derived artifact was stored.
    ProcessingComplete {
        processor: String,
        output_path: String,
        size_bytes: u64,
    },
    /// Processing was rejected or failed. The original file is untouched.
    ProcessingError { processor: Option<String>, error: String },
}

/// Discriminant of [`FileEvent`], used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    UploadStart,
    UploadProgress,
    UploadComplete,
    UploadError,
    DownloadStart,
    DownloadComplete,
    DeleteComplete,
    ProcessingStart,
    ProcessingComplete,
    ProcessingError,
}

impl EventType {
    /// Every event type.
    pub const ALL: [EventType; 10] = [
        Self::UploadStart,
        Self::UploadProgress,
        Self::UploadComplete,
        Self::UploadError,
        Self::DownloadStart,
        Self::DownloadComplete,
        Self::DeleteComplete,
        Self::ProcessingStart,
        Self::ProcessingComplete,
        Self::ProcessingError,
    ];

    /// Wire name, e.g. `"upload:start"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadStart => "upload:start",
            Self::UploadProgress => "upload:progress",
            Self::UploadComplete => "upload:complete",
            Self::UploadError => "upload:error",
            Self::DownloadStart => "download:start",
            Self::DownloadComplete => "download:complete",
            Self::DeleteComplete => "delete:complete",
            Self::ProcessingStart => "processing:start",
            Self::ProcessingComplete => "processing:complete",
            Self::ProcessingError => "processing:error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FileEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::UploadStart { .. } => EventType::UploadStart,
            Self::UploadProgress { .. } => EventType::UploadProgress,
            Self::UploadComplete { .. } => EventType::UploadComplete,
            Self::UploadError { .. } => EventType::UploadError,
            Self::DownloadStart { .. } => EventType::DownloadStart,
            Self::DownloadComplete { .. } => EventType::DownloadComplete,
            Self::DeleteComplete { .. } => EventType::DeleteComplete,
            Self::ProcessingStart { .. } => EventType::ProcessingStart,
            Self::ProcessingComplete { .. } => EventType::ProcessingComplete,
            Self::ProcessingError { .. } => EventType::ProcessingError,
        }
    }

    /// The error message carried by error variants.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::UploadError { error } | Self::ProcessingError { error, .. } => Some(error),
            _ => None,
        }
    }
}
