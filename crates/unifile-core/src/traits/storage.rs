//! Storage provider trait for pluggable storage backends.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::ProviderConfig;
use crate::result::AppResult;
use crate::types::{StorageType, UploadFileInfo};

/// Outcome of a provider write or delete.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StorageResult {
    /// Provider-relative key of the object.
    pub path: String,
    /// Provider URL of the object, when the provider has a stable one.
    pub url: Option<String>,
    /// Bytes written (zero for deletes).
    pub size_bytes: u64,
    /// Entity tag reported by the backend.
    pub etag: Option<String>,
    /// Number of parts used; `1` for single-request writes.
    pub part_count: u32,
}

/// Trait for storage backends.
///
/// Implementations normalize every backend error into the engine's
/// [`ErrorKind`](crate::error::ErrorKind) taxonomy before returning:
/// `ProviderInit`/`ProviderAuth` for setup problems, `NotFound` for
/// missing keys and `Transfer` for everything else. Providers never
/// retry on their own.
///
/// Every operation other than `initialize` fails with `ProviderInit`
/// until `initialize` has succeeded.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Which backend this is.
    fn storage_type(&self) -> StorageType;

    /// Validate the configuration and connect. Must be called once
    /// before any other operation.
    async fn initialize(&self, config: &ProviderConfig) -> AppResult<()>;

    /// Whether `initialize` has succeeded.
    fn is_initialized(&self) -> bool;

    /// Store `file.data` under `path`. Large payloads go through the
    /// provider's chunked path.
    async fn upload(&self, file: &UploadFileInfo, path: &str) -> AppResult<StorageResult>;

    /// Read an object fully into memory.
    async fn download(&self, path: &str) -> AppResult<Bytes>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, path: &str) -> AppResult<StorageResult>;

    /// A URL from which the object can be fetched without further checks.
    /// `expires_in` bounds signed URLs; `None` uses the provider default.
    async fn get_access_url(&self, path: &str, expires_in: Option<Duration>) -> AppResult<String>;

    /// Check whether an object exists.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
