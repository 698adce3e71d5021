//! CDN that serves the storage origin under a fixed domain.

use async_trait::async_trait;

use unifile_core::config::StaticDomainCdnConfig;
use unifile_core::error::AppError;
use unifile_core::result::AppResult;
use unifile_core::traits::CdnProvider;
use unifile_core::types::CdnType;

/// Maps `storage/path` to `{scheme}://{domain}/{prefix}/storage/path`.
#[derive(Debug, Clone)]
pub struct StaticDomainCdn {
    config: StaticDomainCdnConfig,
}

impl StaticDomainCdn {
    pub fn new(config: StaticDomainCdnConfig) -> Self {
        Self { config }
    }

    fn domain(&self) -> &str {
        self.config
            .domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
    }
}

#[async_trait]
impl CdnProvider for StaticDomainCdn {
    fn cdn_type(&self) -> CdnType {
        CdnType::StaticDomain
    }

    async fn initialize(&self) -> AppResult<()> {
        if self.domain().is_empty() {
            return Err(AppError::provider_init("CDN domain is not configured"));
        }
        Ok(())
    }

    async fn generate_url(&self, storage_path: &str, _provider_url: Option<&str>) -> AppResult<String> {
        let scheme = if self.config.secure { "https" } else { "http" };
        let key = storage_path.trim_start_matches('/');
        let url = match self.config.path_prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => {
                format!("{scheme}://{}/{prefix}/{key}", self.domain())
            }
            _ => format!("{scheme}://{}/{key}", self.domain()),
        };
        Ok(url)
    }
}
