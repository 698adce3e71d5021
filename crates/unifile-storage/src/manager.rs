//! Storage manager: routes operations to the provider of a storage type.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use unifile_core::config::{ProviderConfig, StorageConfig};
use unifile_core::error::{AppError, ErrorKind};
use unifile_core::result::AppResult;
use unifile_core::traits::storage::StorageProvider;
use unifile_core::types::StorageType;

/// Registry of storage providers owned by one service context.
#[derive(Debug, Clone)]
pub struct StorageManager {
    /// Map of storage type → provider instance.
    providers: Arc<RwLock<HashMap<StorageType, Arc<dyn StorageProvider>>>>,
    /// Provider used when an upload names none.
    default_type: Arc<RwLock<Option<StorageType>>>,
}

impl StorageManager {
    /// Create a new empty storage manager.
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            default_type: Arc::new(RwLock::new(None)),
        }
    }

    /// Register a provider under its own storage type, replacing any
    /// previous one.
    pub async fn register(&self, provider: Arc<dyn StorageProvider>, is_default: bool) {
        let storage_type = provider.storage_type();
        self.providers.write().await.insert(storage_type, provider);
        if is_default {
            *self.default_type.write().await = Some(storage_type);
        }
        info!(storage_type = %storage_type, is_default, "Registered storage provider");
    }

    /// Get the provider of a storage type.
    pub async fn get(&self, storage_type: StorageType) -> AppResult<Arc<dyn StorageProvider>> {
        let providers = self.providers.read().await;
        providers.get(&storage_type).cloned().ok_or_else(|| {
            AppError::configuration(format!("Storage provider '{storage_type}' is not registered"))
        })
    }

    /// Get the default provider.
    pub async fn get_default(&self) -> AppResult<(StorageType, Arc<dyn StorageProvider>)> {
        let default_type = self
            .default_type
            .read()
            .await
            .ok_or_else(|| AppError::configuration("No default storage configured"))?;
        let provider = self.get(default_type).await?;
        Ok((default_type, provider))
    }

    /// The explicitly requested provider, or the default one.
    pub async fn select(
        &self,
        requested: Option<StorageType>,
    ) -> AppResult<(StorageType, Arc<dyn StorageProvider>)> {
        match requested {
            Some(storage_type) => Ok((storage_type, self.get(storage_type).await?)),
            None => self.get_default().await,
        }
    }

    /// The default storage type, if one is set.
    pub async fn default_type(&self) -> Option<StorageType> {
        *self.default_type.read().await
    }

    /// List all registered storage types.
    pub async fn list_types(&self) -> Vec<StorageType> {
        self.providers.read().await.keys().copied().collect()
    }

    /// Initialize every registered provider with its configuration.
    ///
    /// Initialization errors are fatal, with one exception: when
    /// `fallback_to_local` is set and the failing provider is the default,
    /// it is dropped and local disk becomes the default.
    pub async fn initialize_all(&self, config: &StorageConfig) -> AppResult<()> {
        let providers: Vec<(StorageType, Arc<dyn StorageProvider>)> = self
            .providers
            .read()
            .await
            .iter()
            .map(|(t, p)| (*t, Arc::clone(p)))
            .collect();
        let default_type = self.default_type().await;

        // Local first, so a fallback target is ready before anything fails.
        let mut ordered = providers;
        ordered.sort_by_key(|(t, _)| *t != StorageType::Local);

        for (storage_type, provider) in ordered {
            let provider_config = match storage_type {
                StorageType::Local => ProviderConfig::Local(config.local.clone()),
                StorageType::Object => ProviderConfig::Object(config.object.clone()),
            };
            let Err(e) = provider.initialize(&provider_config).await else {
                continue;
            };

            let can_fall_back = config.fallback_to_local
                && default_type == Some(storage_type)
                && storage_type != StorageType::Local
                && self.local_is_ready().await;
            if !can_fall_back {
                error!(storage_type = %storage_type, error = %e, "Storage provider failed to initialize");
                return Err(match e.kind {
                    ErrorKind::ProviderAuth | ErrorKind::ProviderInit => e,
                    _ => AppError::provider_init(e.message),
                });
            }

            warn!(
                storage_type = %storage_type,
                error = %e,
                "Default storage provider failed to initialize; falling back to local disk"
            );
            self.providers.write().await.remove(&storage_type);
            *self.default_type.write().await = Some(StorageType::Local);
        }
        Ok(())
    }

    async fn local_is_ready(&self) -> bool {
        self.providers
            .read()
            .await
            .get(&StorageType::Local)
            .is_some_and(|p| p.is_initialized())
    }

    /// Check health of all registered providers.
    pub async fn health_check_all(&self) -> HashMap<StorageType, bool> {
        let providers = self.providers.read().await;
        let mut results = HashMap::new();
        for (storage_type, provider) in providers.iter() {
            let healthy = provider.health_check().await.unwrap_or(false);
            results.insert(*storage_type, healthy);
        }
        results
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}
