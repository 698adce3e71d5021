//! CDN provider trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::CdnType;

/// Resolves a stored object into an accelerated public URL.
#[async_trait]
pub trait CdnProvider: Send + Sync + std::fmt::Debug + 'static {
    fn cdn_type(&self) -> CdnType;

    /// Check configuration. Called once at service initialization.
    async fn initialize(&self) -> AppResult<()>;

    /// Map a stored object to its CDN URL.
    ///
    /// `storage_path` is the provider-relative key; `provider_url` is what
    /// the storage provider reported for it, if anything.
    async fn generate_url(&self, storage_path: &str, provider_url: Option<&str>)
    -> AppResult<String>;
}
