//! CDN registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use unifile_core::result::AppResult;
use unifile_core::traits::CdnProvider;
use unifile_core::types::CdnType;

/// Registry of CDN providers; at most one is active.
#[derive(Debug, Clone, Default)]
pub struct CdnManager {
    providers: Arc<RwLock<HashMap<CdnType, Arc<dyn CdnProvider>>>>,
    active: Arc<RwLock<Option<CdnType>>>,
}

impl CdnManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, optionally making it the active one.
    pub async fn register(&self, provider: Arc<dyn CdnProvider>, is_default: bool) {
        let cdn_type = provider.cdn_type();
        self.providers.write().await.insert(cdn_type, provider);
        if is_default {
            *self.active.write().await = Some(cdn_type);
        }
        info!(cdn_type = %cdn_type, is_default, "Registered CDN provider");
    }

    /// The active provider, if any.
    pub async fn active(&self) -> Option<Arc<dyn CdnProvider>> {
        let active = (*self.active.read().await)?;
        self.providers.read().await.get(&active).cloned()
    }

    /// Initialize every registered provider.
    pub async fn initialize_all(&self) -> AppResult<()> {
        let providers: Vec<Arc<dyn CdnProvider>> =
            self.providers.read().await.values().cloned().collect();
        for provider in providers {
            provider.initialize().await?;
        }
        Ok(())
    }

    /// CDN URL of a stored object, or `None` when no CDN is active.
    pub async fn resolve(
        &self,
        storage_path: &str,
        provider_url: Option<&str>,
    ) -> AppResult<Option<String>> {
        match self.active().await {
            Some(provider) => provider
                .generate_url(storage_path, provider_url)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}
