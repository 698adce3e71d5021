//! File metadata and upload input types.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::FileId;
use crate::error::AppError;

/// Fallback MIME type for content that cannot be identified.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Who may read a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Any caller, including anonymous ones, may read.
    Public,
    /// Only the uploader may read.
    #[default]
    Private,
}

/// The storage backends the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Local filesystem.
    Local,
    /// S3-compatible object storage.
    Object,
}

impl StorageType {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "object" | "s3" | "oss" => Ok(Self::Object),
            other => Err(AppError::configuration(format!(
                "Unknown storage type: {other}"
            ))),
        }
    }
}

/// The CDN backends the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdnType {
    /// A CDN that serves the origin under a fixed domain.
    StaticDomain,
}

impl fmt::Display for CdnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticDomain => f.write_str("static_domain"),
        }
    }
}

/// What kind of access is being recorded by `update_access_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    /// The file bytes were downloaded.
    Download,
    /// An access URL was issued.
    Url,
}

/// A derived artifact produced by a processor (thumbnail, probe report).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedArtifact {
    /// Processor that produced the artifact.
    pub processor: String,
    /// Storage path of the artifact within the file's provider.
    pub path: String,
    /// MIME type of the artifact.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Processor-specific details (dimensions, duration).
    pub details: serde_json::Value,
    /// When the artifact was attached.
    pub created_at: DateTime<Utc>,
}

/// The durable description of a stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: FileId,
    pub original_name: String,
    /// `{id}{extension}`.
    pub storage_name: String,
    pub size: u64,
    pub mime_type: String,
    /// Lower-cased extension including the dot, or empty.
    pub extension: String,
    /// Hex-encoded SHA-256 of the content.
    pub content_hash: String,
    pub upload_time: DateTime<Utc>,
    pub permission: Permission,
    pub uploader_id: String,
    pub module_id: String,
    pub business_id: Option<String>,
    pub storage_provider: StorageType,
    pub storage_path: String,
    /// Goes from `None` to `Some` at most once.
    pub cdn_url: Option<String>,
    /// Monotonically non-decreasing.
    pub access_count: u64,
    pub download_count: u64,
    pub last_access_time: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub artifacts: Vec<DerivedArtifact>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FileMetadata {
    /// Whether `expires_at` has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Neither deleted nor expired.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        !self.is_deleted && !self.is_expired(now)
    }
}

/// Post-upload processing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Processor to use by type name. Picked by MIME type when absent.
    pub processor: Option<String>,
    /// Thumbnail bounding box edge in pixels.
    pub thumbnail_size: Option<u32>,
    /// Output image format (`jpeg`, `png`, `webp`).
    pub format: Option<String>,
    /// Output quality (1-100) for lossy formats.
    pub quality: Option<u8>,
    /// Free-form processor parameters.
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

/// Everything needed to upload one file.
#[derive(Debug, Clone)]
pub struct UploadFileInfo {
    /// File content.
    pub data: Bytes,
    /// Name as supplied by the client.
    pub original_name: String,
    /// Declared MIME type. Guessed from the extension when absent.
    pub mime_type: Option<String>,
    /// Owning application module.
    pub module_id: String,
    /// Optional business entity the file is attached to.
    pub business_id: Option<String>,
    /// Uploading user.
    pub uploader_id: String,
    pub permission: Permission,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, serde_json::Value>,
    /// Post-upload processing, if requested.
    pub processing: Option<ProcessingOptions>,
}

impl UploadFileInfo {
    /// Create a private upload with no processing.
    pub fn new(
        data: impl Into<Bytes>,
        original_name: impl Into<String>,
        module_id: impl Into<String>,
        uploader_id: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            original_name: original_name.into(),
            mime_type: None,
            module_id: module_id.into(),
            business_id: None,
            uploader_id: uploader_id.into(),
            permission: Permission::Private,
            expires_at: None,
            metadata: HashMap::new(),
            processing: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_business_id(mut self, business_id: impl Into<String>) -> Self {
        self.business_id = Some(business_id.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_processing(mut self, options: ProcessingOptions) -> Self {
        self.processing = Some(options);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The declared MIME type or the octet-stream fallback.
    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }
}
