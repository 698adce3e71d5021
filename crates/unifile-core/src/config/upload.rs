//! Upload validation configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Limits applied to every upload before any I/O takes place.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted payload size in bytes (inclusive).
    #[serde(default = "default_max_file_size")]
    #[validate(range(min = 1))]
    pub max_file_size_bytes: u64,
    /// Allowed MIME types. An empty list allows every type.
    ///
    /// Entries ending in `/*` match a whole top-level type (e.g. `image/*`).
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// How long a terminal progress record stays queryable, in seconds.
    #[serde(default = "default_progress_retention")]
    #[validate(range(min = 1, max = 86400))]
    pub progress_retention_seconds: u64,
}

impl UploadConfig {
    /// Whether the given MIME type passes the allow-list.
    pub fn is_mime_allowed(&self, mime_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let mime_type = mime_type.to_ascii_lowercase();
        self.allowed_mime_types.iter().any(|allowed| {
            let allowed = allowed.to_ascii_lowercase();
            match allowed.strip_suffix("/*") {
                Some(top) => mime_type
                    .split_once('/')
                    .is_some_and(|(t, _)| t == top),
                None => allowed == mime_type,
            }
        })
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            allowed_mime_types: default_allowed_mime_types(),
            progress_retention_seconds: default_progress_retention(),
        }
    }
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024
}

fn default_allowed_mime_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/bmp",
        "audio/mpeg",
        "audio/wav",
        "audio/ogg",
        "audio/flac",
        "video/mp4",
        "text/plain",
        "application/json",
        "application/pdf",
        "application/octet-stream",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_progress_retention() -> u64 {
    300
}
