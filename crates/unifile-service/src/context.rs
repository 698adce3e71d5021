//! The explicitly constructed service context.
//!
//! Every registry and collaborator the engine uses is a field here; nothing
//! is global. Build one with [`ServiceContextBuilder`].

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use unifile_cache::{CacheManager, ListingCache, MetadataCache, UrlCache};
use unifile_core::config::AppConfig;
use unifile_core::result::AppResult;
use unifile_core::traits::{
    CacheProvider, CdnProvider, FileProcessor, MetadataStore, StorageProvider, TaskQueue,
};
use unifile_core::types::{CdnType, StorageType};
use unifile_storage::{CdnManager, LocalStorageProvider, StaticDomainCdn, StorageManager};
use unifile_worker::{AudioProcessor, ImageProcessor, InMemoryTaskQueue, ProcessorRegistry};

use crate::access::AccessController;
use crate::events::EventBus;
use crate::progress::ProgressTracker;
use crate::store::InMemoryMetadataStore;

/// Shared state of one engine instance.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub config: Arc<AppConfig>,
    pub storage: StorageManager,
    pub cdn: CdnManager,
    pub processors: ProcessorRegistry,
    pub metadata_store: Arc<dyn MetadataStore>,
    pub cache: Arc<dyn CacheProvider>,
    pub metadata_cache: MetadataCache,
    pub url_cache: UrlCache,
    pub listing_cache: ListingCache,
    pub queue: Arc<dyn TaskQueue>,
    pub events: Arc<EventBus>,
    pub progress: ProgressTracker,
    pub access: AccessController,
}

/// Builder for [`ServiceContext`].
///
/// Built-in providers come from the configuration: local disk is always
/// registered, object storage when enabled, the static-domain CDN when
/// selected, and the image and audio processors when processing is
/// enabled. Providers registered explicitly replace built-ins of the same
/// type.
#[derive(Debug)]
pub struct ServiceContextBuilder {
    config: AppConfig,
    metadata_store: Option<Arc<dyn MetadataStore>>,
    cache_provider: Option<Arc<dyn CacheProvider>>,
    queue: Option<Arc<dyn TaskQueue>>,
    storage_providers: Vec<Arc<dyn StorageProvider>>,
    cdn_providers: Vec<Arc<dyn CdnProvider>>,
    processors: Vec<Arc<dyn FileProcessor>>,
}

impl ServiceContextBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            metadata_store: None,
            cache_provider: None,
            queue: None,
            storage_providers: Vec::new(),
            cdn_providers: Vec::new(),
            processors: Vec::new(),
        }
    }

    /// Use this metadata store instead of the in-memory one.
    pub fn metadata_store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.metadata_store = Some(store);
        self
    }

    /// Use this cache provider instead of the configured one.
    pub fn cache_provider(mut self, provider: Arc<dyn CacheProvider>) -> Self {
        self.cache_provider = Some(provider);
        self
    }

    /// Use this task queue instead of the in-memory one.
    pub fn task_queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn register_storage_provider(mut self, provider: Arc<dyn StorageProvider>) -> Self {
        self.storage_providers.push(provider);
        self
    }

    pub fn register_cdn_provider(mut self, provider: Arc<dyn CdnProvider>) -> Self {
        self.cdn_providers.push(provider);
        self
    }

    pub fn register_processor(mut self, processor: Arc<dyn FileProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Assemble the context. Providers are registered but not yet
    /// initialized; that happens in `FileService::initialize`.
    pub async fn build(self) -> AppResult<ServiceContext> {
        let config = self.config;

        let storage = StorageManager::new();
        let default_storage = config.storage.default_provider;
        let mut storage_providers: Vec<Arc<dyn StorageProvider>> =
            vec![Arc::new(LocalStorageProvider::new())];
        storage_providers.extend(object_storage_provider(&config));
        storage_providers.extend(self.storage_providers);
        for provider in storage_providers {
            let is_default = provider.storage_type() == default_storage;
            storage.register(provider, is_default).await;
        }

        let cdn = CdnManager::new();
        let mut cdn_providers: Vec<Arc<dyn CdnProvider>> = Vec::new();
        if config.cdn.default_provider == Some(CdnType::StaticDomain) {
            cdn_providers.push(Arc::new(StaticDomainCdn::new(
                config.cdn.static_domain.clone(),
            )));
        }
        cdn_providers.extend(self.cdn_providers);
        for provider in cdn_providers {
            let is_default = Some(provider.cdn_type()) == config.cdn.default_provider;
            cdn.register(provider, is_default).await;
        }

        let processors = ProcessorRegistry::new();
        if config.processing.enabled {
            processors
                .register(Arc::new(ImageProcessor::new(&config.processing)))
                .await;
            processors.register(Arc::new(AudioProcessor::new())).await;
        }
        for processor in self.processors {
            processors.register(processor).await;
        }

        let cache = match self.cache_provider {
            Some(provider) => provider,
            None => CacheManager::new(&config.cache).await?.provider(),
        };
        let metadata_store = self
            .metadata_store
            .unwrap_or_else(|| Arc::new(InMemoryMetadataStore::new()));
        let queue = self
            .queue
            .unwrap_or_else(|| Arc::new(InMemoryTaskQueue::new(config.processing.queue_capacity)));

        info!(
            default_storage = %default_storage,
            storage_types = ?storage.list_types().await,
            cache = %config.cache.provider,
            queue_capacity = queue.capacity(),
            "Service context assembled"
        );

        Ok(ServiceContext {
            metadata_cache: MetadataCache::new(
                Arc::clone(&cache),
                Duration::from_secs(config.cache.metadata_ttl_seconds),
            ),
            url_cache: UrlCache::new(
                Arc::clone(&cache),
                Duration::from_secs(config.cache.url_ttl_seconds),
            ),
            listing_cache: ListingCache::new(
                Arc::clone(&cache),
                Duration::from_secs(config.cache.list_ttl_seconds),
            ),
            cache,
            progress: ProgressTracker::new(Duration::from_secs(
                config.upload.progress_retention_seconds,
            )),
            config: Arc::new(config),
            storage,
            cdn,
            processors,
            metadata_store,
            queue,
            events: Arc::new(EventBus::new()),
            access: AccessController::new(),
        })
    }
}

#[cfg(feature = "object-storage")]
fn object_storage_provider(config: &AppConfig) -> Option<Arc<dyn StorageProvider>> {
    config
        .storage
        .object
        .enabled
        .then(|| Arc::new(unifile_storage::ObjectStorageProvider::new()) as Arc<dyn StorageProvider>)
}

#[cfg(not(feature = "object-storage"))]
fn object_storage_provider(_config: &AppConfig) -> Option<Arc<dyn StorageProvider>> {
    None
}

impl ServiceContext {
    /// Start a builder.
    pub fn builder(config: AppConfig) -> ServiceContextBuilder {
        ServiceContextBuilder::new(config)
    }

    /// Default storage type, if one is registered.
    pub async fn default_storage(&self) -> Option<StorageType> {
        self.storage.default_type().await
    }
}
