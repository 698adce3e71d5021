//! Storage provider configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::StorageType;

/// Top-level storage configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider used when an upload does not name one.
    #[serde(default = "default_provider")]
    pub default_provider: StorageType,
    /// Development-mode rule: when the default provider fails to
    /// initialize, fall back to local disk instead of aborting startup.
    #[serde(default)]
    pub fallback_to_local: bool,
    /// Local disk provider settings.
    #[serde(default)]
    #[validate(nested)]
    pub local: LocalStorageConfig,
    /// S3-compatible object storage settings.
    #[serde(default)]
    #[validate(nested)]
    pub object: ObjectStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            fallback_to_local: false,
            local: LocalStorageConfig::default(),
            object: ObjectStorageConfig::default(),
        }
    }
}

/// Local filesystem provider configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Whether the provider is registered.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Root directory for stored files.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Base URL that serves `root_path` (access URLs are `{base_url}/{path}`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-operation I/O timeout in seconds.
    #[serde(default = "default_local_timeout")]
    #[validate(range(min = 1, max = 3600))]
    pub timeout_seconds: u64,
    /// Payloads above this size are written in parts.
    #[serde(default = "default_multipart_threshold")]
    #[validate(range(min = 1))]
    pub multipart_threshold_bytes: u64,
    /// Size of each part in bytes.
    #[serde(default = "default_part_size")]
    #[validate(range(min = 1))]
    pub part_size_bytes: u64,
    /// Maximum number of parts written concurrently.
    #[serde(default = "default_part_concurrency")]
    #[validate(range(min = 1, max = 32))]
    pub part_concurrency: usize,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root_path: default_root_path(),
            base_url: default_base_url(),
            timeout_seconds: default_local_timeout(),
            multipart_threshold_bytes: default_multipart_threshold(),
            part_size_bytes: default_part_size(),
            part_concurrency: default_part_concurrency(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// Whether the provider is registered.
    #[serde(default)]
    pub enabled: bool,
    /// Custom endpoint (MinIO, OSS, R2). `None` uses AWS.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region name.
    #[serde(default)]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key id.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Public domain serving the bucket. When set, access URLs are public
    /// URLs on this domain instead of presigned URLs.
    #[serde(default)]
    pub custom_domain: Option<String>,
    /// Use `https` for generated public URLs.
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Use path-style addressing (required by most S3 clones).
    #[serde(default = "default_true")]
    pub force_path_style: bool,
    /// Operation timeout in seconds.
    #[serde(default = "default_object_timeout")]
    #[validate(range(min = 1, max = 3600))]
    pub timeout_seconds: u64,
    /// Default presigned URL lifetime in seconds.
    #[serde(default = "default_signed_url_expiry")]
    #[validate(range(min = 1, max = 604800))]
    pub signed_url_expiry_seconds: u64,
    /// Payloads above this size use multipart upload.
    #[serde(default = "default_multipart_threshold")]
    #[validate(range(min = 1))]
    pub multipart_threshold_bytes: u64,
    /// Size of each part in bytes (S3 requires at least 5 MiB).
    #[serde(default = "default_part_size")]
    #[validate(range(min = 5242880))]
    pub part_size_bytes: u64,
    /// Maximum number of parts uploaded concurrently.
    #[serde(default = "default_part_concurrency")]
    #[validate(range(min = 1, max = 32))]
    pub part_concurrency: usize,
}

impl ObjectStorageConfig {
    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.region.trim().is_empty() {
            missing.push("region");
        }
        if self.bucket.trim().is_empty() {
            missing.push("bucket");
        }
        if self.access_key.trim().is_empty() {
            missing.push("access_key");
        }
        if self.secret_key.trim().is_empty() {
            missing.push("secret_key");
        }
        missing
    }
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            region: String::new(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            custom_domain: None,
            secure: true,
            force_path_style: true,
            timeout_seconds: default_object_timeout(),
            signed_url_expiry_seconds: default_signed_url_expiry(),
            multipart_threshold_bytes: default_multipart_threshold(),
            part_size_bytes: default_part_size(),
            part_concurrency: default_part_concurrency(),
        }
    }
}

/// Configuration handed to [`StorageProvider::initialize`](crate::traits::StorageProvider::initialize).
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    /// Local disk settings.
    Local(LocalStorageConfig),
    /// Object storage settings.
    Object(ObjectStorageConfig),
}

impl ProviderConfig {
    /// The provider type this configuration is meant for.
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Local(_) => StorageType::Local,
            Self::Object(_) => StorageType::Object,
        }
    }
}

fn default_provider() -> StorageType {
    StorageType::Local
}

fn default_true() -> bool {
    true
}

fn default_root_path() -> String {
    "./data/storage".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080/files".to_string()
}

fn default_local_timeout() -> u64 {
    60
}

fn default_object_timeout() -> u64 {
    300
}

fn default_signed_url_expiry() -> u64 {
    3600
}

fn default_multipart_threshold() -> u64 {
    100 * 1024 * 1024
}

fn default_part_size() -> u64 {
    10 * 1024 * 1024
}

fn default_part_concurrency() -> usize {
    4
}
