//! Local filesystem storage provider.

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use unifile_core::config::{LocalStorageConfig, ProviderConfig};
use unifile_core::error::{AppError, ErrorKind};
use unifile_core::result::AppResult;
use unifile_core::traits::storage::{StorageProvider, StorageResult};
use unifile_core::types::{StorageType, UploadFileInfo};

use crate::chunked::{self, CHUNK_ROOT, PartRange};

/// Settings fixed at initialization.
#[derive(Debug)]
struct LocalState {
    root: PathBuf,
    base_url: String,
    timeout: Duration,
    multipart_threshold: u64,
    part_size: u64,
    part_concurrency: usize,
}

/// Local filesystem storage provider.
#[derive(Debug, Default)]
pub struct LocalStorageProvider {
    state: OnceCell<LocalState>,
}

impl LocalStorageProvider {
    /// Create an uninitialized provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> AppResult<&LocalState> {
        self.state
            .get()
            .ok_or_else(|| AppError::provider_init("Local storage provider is not initialized"))
    }
}

impl LocalState {
    /// Resolve a relative key to an absolute path within the root.
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let clean = path.trim_start_matches('/');
        let relative = Path::new(clean);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AppError::validation(format!(
                "Storage path escapes the storage root: {path}"
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Run an I/O operation under the configured timeout.
    async fn timed<T>(&self, what: &str, fut: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                AppError::transfer(format!(
                    "{what} timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn write_file(&self, path: &str, data: &Bytes) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;
        fs::write(&full_path, data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transfer,
                format!("Failed to write file: {path}"),
                e,
            )
        })
    }

    /// Write parts concurrently under `_chunks/`, then concatenate them
    /// into the target in part order.
    async fn write_chunked(&self, path: &str, data: &Bytes) -> AppResult<u32> {
        let upload_id = Uuid::new_v4();
        let parts = chunked::plan_parts(data.len() as u64, self.part_size);
        let part_count = parts.len() as u32;

        info!(
            path,
            upload_id = %upload_id,
            parts = part_count,
            concurrency = self.part_concurrency,
            "Writing file in parts"
        );

        let result = async {
            stream::iter(parts.iter().copied())
                .map(|part: PartRange| {
                    let chunk_path = chunked::chunk_path(upload_id, part.number);
                    let bytes = part.slice(data);
                    async move {
                        self.timed("Part write", self.write_file(&chunk_path, &bytes))
                            .await
                    }
                })
                .buffer_unordered(self.part_concurrency)
                .try_collect::<Vec<()>>()
                .await?;

            self.timed("Part assembly", self.assemble(upload_id, &parts, path))
                .await
        }
        .await;

        let dir = self.resolve(&chunked::upload_dir(upload_id))?;
        if let Err(e) = fs::remove_dir_all(&dir).await {
            warn!(upload_id = %upload_id, error = %e, "Failed to remove part directory");
        }

        result.map(|_| part_count)
    }

    async fn assemble(&self, upload_id: Uuid, parts: &[PartRange], path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;
        let mut file = fs::File::create(&full_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transfer,
                format!("Failed to create file: {path}"),
                e,
            )
        })?;

        for part in parts {
            let chunk_path = self.resolve(&chunked::chunk_path(upload_id, part.number))?;
            let bytes = fs::read(&chunk_path).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to read part {} of {path}", part.number),
                    e,
                )
            })?;
            file.write_all(&bytes).await.map_err(|e| {
                AppError::with_source(ErrorKind::Transfer, "Failed to write part", e)
            })?;
        }

        file.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Transfer, "Failed to flush file", e))
    }

    /// Collect file keys below `dir`, skipping in-flight parts.
    async fn walk(&self, dir: PathBuf) -> AppResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![dir];

        while let Some(current) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::Transfer,
                        format!("Failed to list directory: {}", current.display()),
                        e,
                    ));
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                AppError::with_source(ErrorKind::Transfer, "Failed to read directory entry", e)
            })? {
                let entry_path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| {
                    AppError::with_source(ErrorKind::Transfer, "Failed to get entry type", e)
                })?;
                if file_type.is_dir() {
                    if entry_path != self.root.join(CHUNK_ROOT) {
                        pending.push(entry_path);
                    }
                } else if let Ok(relative) = entry_path.strip_prefix(&self.root) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn storage_type(&self) -> StorageType {
        StorageType::Local
    }

    async fn initialize(&self, config: &ProviderConfig) -> AppResult<()> {
        let ProviderConfig::Local(config) = config else {
            return Err(AppError::provider_init(format!(
                "Local storage provider received {} configuration",
                config.storage_type()
            )));
        };
        if self.state.initialized() {
            return Ok(());
        }

        let state = build_state(config).await?;
        info!(root = %state.root.display(), "Local storage provider initialized");
        // A concurrent initializer may have won; either state is equivalent.
        let _ = self.state.set(state);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    async fn upload(&self, file: &UploadFileInfo, path: &str) -> AppResult<StorageResult> {
        let state = self.state()?;
        let size = file.size();

        let part_count = if size > state.multipart_threshold {
            state.write_chunked(path, &file.data).await?
        } else {
            state
                .timed("Write", state.write_file(path, &file.data))
                .await?;
            1
        };

        debug!(path, bytes = size, part_count, "Wrote file");
        Ok(StorageResult {
            path: path.to_string(),
            url: Some(state.url_for(path)),
            size_bytes: size,
            etag: None,
            part_count,
        })
    }

    async fn download(&self, path: &str) -> AppResult<Bytes> {
        let state = self.state()?;
        let full_path = state.resolve(path)?;
        let data = state
            .timed("Read", async {
                fs::read(&full_path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        AppError::not_found(format!("Object not found: {path}"))
                    } else {
                        AppError::with_source(
                            ErrorKind::Transfer,
                            format!("Failed to read file: {path}"),
                            e,
                        )
                    }
                })
            })
            .await?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &str) -> AppResult<StorageResult> {
        let state = self.state()?;
        let full_path = state.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => debug!(path, "Deleted file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path, "Delete of missing file treated as success");
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to delete file: {path}"),
                    e,
                ));
            }
        }
        Ok(StorageResult {
            path: path.to_string(),
            url: None,
            size_bytes: 0,
            etag: None,
            part_count: 0,
        })
    }

    async fn get_access_url(&self, path: &str, _expires_in: Option<Duration>) -> AppResult<String> {
        let state = self.state()?;
        if !self.exists(path).await? {
            return Err(AppError::not_found(format!("Object not found: {path}")));
        }
        Ok(state.url_for(path))
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let state = self.state()?;
        let full_path = state.resolve(path)?;
        fs::try_exists(&full_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transfer,
                format!("Failed to stat file: {path}"),
                e,
            )
        })
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        let state = self.state()?;
        let prefix = prefix.trim_start_matches('/');
        // Walk from the deepest directory the prefix names.
        let start_dir = match prefix.rsplit_once('/') {
            Some((dir, _)) => state.resolve(dir)?,
            None => state.root.clone(),
        };
        let mut keys: Vec<String> = state
            .walk(start_dir)
            .await?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let state = self.state()?;
        Ok(fs::metadata(&state.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }
}

async fn build_state(config: &LocalStorageConfig) -> AppResult<LocalState> {
    let root = PathBuf::from(&config.root_path);
    fs::create_dir_all(&root).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::ProviderInit,
            format!("Failed to create storage root: {}", root.display()),
            e,
        )
    })?;
    Ok(LocalState {
        root,
        base_url: config.base_url.clone(),
        timeout: Duration::from_secs(config.timeout_seconds),
        multipart_threshold: config.multipart_threshold_bytes,
        part_size: config.part_size_bytes,
        part_concurrency: config.part_concurrency.max(1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use unifile_core::config::ObjectStorageConfig;

    async fn provider_at(dir: &Path, tweak: impl FnOnce(&mut LocalStorageConfig)) -> LocalStorageProvider {
        let mut config = LocalStorageConfig {
            root_path: dir.to_str().unwrap().to_string(),
            base_url: "http://files.test/".into(),
            ..LocalStorageConfig::default()
        };
        tweak(&mut config);
        let provider = LocalStorageProvider::new();
        provider
            .initialize(&ProviderConfig::Local(config))
            .await
            .unwrap();
        provider
    }

    fn info(data: &'static [u8]) -> UploadFileInfo {
        UploadFileInfo::new(Bytes::from_static(data), "f.txt", "test", "u1")
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider_at(dir.path(), |_| {}).await;

        let result = provider.upload(&info(b"hello world"), "test/file.txt").await.unwrap();
        assert_eq!(result.size_bytes, 11);
        assert_eq!(result.part_count, 1);
        assert_eq!(result.url.as_deref(), Some("http://files.test/test/file.txt"));

        assert!(provider.exists("test/file.txt").await.unwrap());
        let read_back = provider.download("test/file.txt").await.unwrap();
        assert_eq!(read_back, Bytes::from_static(b"hello world"));

        provider.delete("test/file.txt").await.unwrap();
        assert!(!provider.exists("test/file.txt").await.unwrap());
        // Deleting again is not an error.
        provider.delete("test/file.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider_at(dir.path(), |_| {}).await;

        let err = provider.download("nope.bin").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = provider.get_access_url("nope.bin", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_chunked_write_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider_at(dir.path(), |c| {
            c.multipart_threshold_bytes = 16;
            c.part_size_bytes = 7;
            c.part_concurrency = 2;
        })
        .await;

        let payload: Vec<u8> = (0u8..100).collect();
        let file = UploadFileInfo::new(payload.clone(), "big.bin", "test", "u1");
        let result = provider.upload(&file, "big/blob.bin").await.unwrap();
        assert_eq!(result.part_count, 15);
        assert_eq!(provider.download("big/blob.bin").await.unwrap(), Bytes::from(payload));

        // Part scratch space is cleaned up and never listed.
        assert_eq!(provider.list("").await.unwrap(), vec!["big/blob.bin".to_string()]);
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider_at(dir.path(), |_| {}).await;

        provider.upload(&info(b"a"), "m/2024/01/a.txt").await.unwrap();
        provider.upload(&info(b"b"), "m/2024/02/b.txt").await.unwrap();
        provider.upload(&info(b"c"), "other/c.txt").await.unwrap();

        let keys = provider.list("m/2024").await.unwrap();
        assert_eq!(keys, vec!["m/2024/01/a.txt", "m/2024/02/b.txt"]);
        assert!(provider.list("missing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider_at(dir.path(), |_| {}).await;
        let err = provider.download("../secret").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_requires_initialization_and_matching_config() {
        let provider = LocalStorageProvider::new();
        let err = provider.download("x").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProviderInit);

        let err = provider
            .initialize(&ProviderConfig::Object(ObjectStorageConfig::default()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProviderInit);
        assert!(!provider.is_initialized());
    }
}
