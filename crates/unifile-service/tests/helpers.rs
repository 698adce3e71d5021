//! Shared fixtures for the service integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use unifile_core::config::{AppConfig, ProviderConfig};
use unifile_core::error::AppError;
use unifile_core::events::{DomainEvent, EventFilter};
use unifile_core::result::AppResult;
use unifile_core::traits::{CdnProvider, MetadataStore, StorageProvider, StorageResult};
use unifile_core::types::{
    AccessKind, CdnType, DerivedArtifact, FileId, FileMetadata, StorageType, UploadFileInfo,
};
use unifile_service::{FileService, InMemoryMetadataStore, ServiceContext, ServiceContextBuilder};
use unifile_storage::LocalStorageProvider;

pub const MAX_FILE_SIZE: u64 = 1024;
pub const QUEUE_CAPACITY: usize = 2;

pub struct TestEnv {
    pub service: FileService,
    pub store: Arc<InMemoryMetadataStore>,
    pub uploads: Arc<AtomicUsize>,
    pub dir: tempfile::TempDir,
}

impl TestEnv {
    /// Number of `upload` calls that reached the local provider.
    pub fn provider_uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Record straight from the store, bypassing caches.
    pub async fn stored(&self, id: FileId) -> FileMetadata {
        self.store.get_file_by_id(id).await.unwrap().unwrap()
    }

    /// Record every event as `"{type} {file_id}"`.
    pub fn record_events(&self) -> Arc<Mutex<Vec<DomainEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        self.service.on_file_event(EventFilter::AnyEvent, move |e| {
            sink.lock().unwrap().push(e.clone());
        });
        seen
    }
}

/// Event type names of one file, in emission order.
pub fn types_of(events: &Mutex<Vec<DomainEvent>>, file_id: FileId) -> Vec<&'static str> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.file_id == file_id)
        .map(|e| e.event_type().as_str())
        .collect()
}

pub fn test_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.local.root_path = root.to_str().unwrap().to_string();
    config.upload.max_file_size_bytes = MAX_FILE_SIZE;
    config.processing.queue_capacity = QUEUE_CAPACITY;
    config.cache.provider = "memory".into();
    config
}

pub async fn env() -> TestEnv {
    env_with(|_| {}, |builder| builder).await
}

pub async fn env_with(
    tweak: impl FnOnce(&mut AppConfig),
    extend: impl FnOnce(ServiceContextBuilder) -> ServiceContextBuilder,
) -> TestEnv {
    env_with_store(tweak, extend, |store| store as Arc<dyn MetadataStore>).await
}

/// Like [`env_with`], serving metadata through a [`SlowStore`] over the
/// environment's store.
pub async fn slow_env(
    tweak: impl FnOnce(&mut AppConfig),
    delay: Duration,
) -> (TestEnv, Arc<SlowStore>) {
    let mut slow = None;
    let env = env_with_store(tweak, |builder| builder, |store| {
        let wrapped = Arc::new(SlowStore::new(store, delay));
        slow = Some(wrapped.clone());
        wrapped as Arc<dyn MetadataStore>
    })
    .await;
    (env, slow.unwrap())
}

async fn env_with_store(
    tweak: impl FnOnce(&mut AppConfig),
    extend: impl FnOnce(ServiceContextBuilder) -> ServiceContextBuilder,
    wrap: impl FnOnce(Arc<InMemoryMetadataStore>) -> Arc<dyn MetadataStore>,
) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    tweak(&mut config);

    let store = Arc::new(InMemoryMetadataStore::new());
    let local = Arc::new(CountingStorage::default());
    let uploads = local.uploads.clone();

    let builder = ServiceContext::builder(config)
        .metadata_store(wrap(store.clone()))
        .register_storage_provider(local)
        .register_storage_provider(Arc::new(FailingStorage));
    let ctx = extend(builder).build().await.unwrap();

    let service = FileService::new(ctx);
    service.initialize().await.unwrap();
    TestEnv {
        service,
        store,
        uploads,
        dir,
    }
}

pub fn text_file(len: usize, uploader: &str) -> UploadFileInfo {
    UploadFileInfo::new(vec![b'x'; len], "notes.txt", "test", uploader)
        .with_mime_type("text/plain")
}

/// Local disk provider that counts uploads.
#[derive(Debug, Default)]
pub struct CountingStorage {
    inner: LocalStorageProvider,
    pub uploads: Arc<AtomicUsize>,
}

#[async_trait]
impl StorageProvider for CountingStorage {
    fn storage_type(&self) -> StorageType {
        StorageType::Local
    }
    async fn initialize(&self, config: &ProviderConfig) -> AppResult<()> {
        self.inner.initialize(config).await
    }
    fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }
    async fn upload(&self, file: &UploadFileInfo, path: &str) -> AppResult<StorageResult> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(file, path).await
    }
    async fn download(&self, path: &str) -> AppResult<Bytes> {
        self.inner.download(path).await
    }
    async fn delete(&self, path: &str) -> AppResult<StorageResult> {
        self.inner.delete(path).await
    }
    async fn get_access_url(&self, path: &str, expires_in: Option<Duration>) -> AppResult<String> {
        self.inner.get_access_url(path, expires_in).await
    }
    async fn exists(&self, path: &str) -> AppResult<bool> {
        self.inner.exists(path).await
    }
    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        self.inner.list(prefix).await
    }
    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

/// Object storage whose transfers always fail.
#[derive(Debug, Default)]
pub struct FailingStorage;

#[async_trait]
impl StorageProvider for FailingStorage {
    fn storage_type(&self) -> StorageType {
        StorageType::Object
    }
    async fn initialize(&self, _config: &ProviderConfig) -> AppResult<()> {
        Ok(())
    }
    fn is_initialized(&self) -> bool {
        true
    }
    async fn upload(&self, _file: &UploadFileInfo, _path: &str) -> AppResult<StorageResult> {
        Err(AppError::transfer("connection reset by peer"))
    }
    async fn download(&self, path: &str) -> AppResult<Bytes> {
        Err(AppError::not_found(path))
    }
    async fn delete(&self, path: &str) -> AppResult<StorageResult> {
        Err(AppError::not_found(path))
    }
    async fn get_access_url(&self, path: &str, _e: Option<Duration>) -> AppResult<String> {
        Err(AppError::not_found(path))
    }
    async fn exists(&self, _path: &str) -> AppResult<bool> {
        Ok(false)
    }
    async fn list(&self, _prefix: &str) -> AppResult<Vec<String>> {
        Ok(Vec::new())
    }
    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
}

/// Metadata store whose writes always fail.
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl MetadataStore for UnavailableStore {
    async fn create_file(&self, _metadata: &FileMetadata) -> AppResult<()> {
        Err(AppError::metadata("database unavailable"))
    }
    async fn get_file_by_id(&self, _id: FileId) -> AppResult<Option<FileMetadata>> {
        Ok(None)
    }
    async fn soft_delete_file(&self, id: FileId) -> AppResult<FileMetadata> {
        Err(AppError::not_found(id.to_string()))
    }
    async fn update_access_stats(&self, _id: FileId, _kind: AccessKind) -> AppResult<()> {
        Ok(())
    }
    async fn attach_artifact(&self, _id: FileId, _artifact: DerivedArtifact) -> AppResult<()> {
        Ok(())
    }
    async fn set_cdn_url(&self, _id: FileId, _url: &str) -> AppResult<bool> {
        Ok(false)
    }
    async fn list_by_module(&self, _module_id: &str) -> AppResult<Vec<FileMetadata>> {
        Ok(Vec::new())
    }
}

/// Metadata store that stalls a chosen number of calls.
///
/// Armed creates sleep before writing; armed reads sleep after reading, so
/// the caller continues with a record that may be stale by then.
#[derive(Debug)]
pub struct SlowStore {
    inner: Arc<InMemoryMetadataStore>,
    delay: Duration,
    slow_creates: AtomicUsize,
    slow_reads: AtomicUsize,
}

impl SlowStore {
    pub fn new(inner: Arc<InMemoryMetadataStore>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            slow_creates: AtomicUsize::new(0),
            slow_reads: AtomicUsize::new(0),
        }
    }

    pub fn stall_creates(&self, count: usize) {
        self.slow_creates.store(count, Ordering::SeqCst);
    }

    pub fn stall_reads(&self, count: usize) {
        self.slow_reads.store(count, Ordering::SeqCst);
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MetadataStore for SlowStore {
    async fn create_file(&self, metadata: &FileMetadata) -> AppResult<()> {
        if Self::take(&self.slow_creates) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.create_file(metadata).await
    }
    async fn get_file_by_id(&self, id: FileId) -> AppResult<Option<FileMetadata>> {
        let record = self.inner.get_file_by_id(id).await?;
        if Self::take(&self.slow_reads) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(record)
    }
    async fn soft_delete_file(&self, id: FileId) -> AppResult<FileMetadata> {
        self.inner.soft_delete_file(id).await
    }
    async fn update_access_stats(&self, id: FileId, kind: AccessKind) -> AppResult<()> {
        self.inner.update_access_stats(id, kind).await
    }
    async fn attach_artifact(&self, id: FileId, artifact: DerivedArtifact) -> AppResult<()> {
        self.inner.attach_artifact(id, artifact).await
    }
    async fn set_cdn_url(&self, id: FileId, url: &str) -> AppResult<bool> {
        self.inner.set_cdn_url(id, url).await
    }
    async fn list_by_module(&self, module_id: &str) -> AppResult<Vec<FileMetadata>> {
        self.inner.list_by_module(module_id).await
    }
}

/// CDN that fails the first `failures` lookups, then serves
/// `https://cdn.test/{path}`.
#[derive(Debug)]
pub struct FlakyCdn {
    failures: AtomicUsize,
}

impl FlakyCdn {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl CdnProvider for FlakyCdn {
    fn cdn_type(&self) -> CdnType {
        CdnType::StaticDomain
    }
    async fn initialize(&self) -> AppResult<()> {
        Ok(())
    }
    async fn generate_url(&self, storage_path: &str, _provider_url: Option<&str>) -> AppResult<String> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::transfer("CDN API timeout"));
        }
        Ok(format!("https://cdn.test/{storage_path}"))
    }
}
