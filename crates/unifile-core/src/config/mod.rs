//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and `UNIFILE__*` environment variables. Each sub-module
//! represents a logical configuration section.

pub mod cache;
pub mod cdn;
pub mod logging;
pub mod processing;
pub mod storage;
pub mod upload;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::cache::{CacheConfig, MemoryCacheConfig, RedisCacheConfig};
pub use self::cdn::{CdnConfig, StaticDomainCdnConfig};
pub use self::logging::LoggingConfig;
pub use self::processing::ProcessingConfig;
pub use self::storage::{LocalStorageConfig, ObjectStorageConfig, ProviderConfig, StorageConfig};
pub use self::upload::UploadConfig;

use crate::error::AppError;
use crate::types::{CdnType, StorageType};

/// Root application configuration.
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upload limits.
    #[serde(default)]
    #[validate(nested)]
    pub upload: UploadConfig,
    /// Storage providers.
    #[serde(default)]
    #[validate(nested)]
    pub storage: StorageConfig,
    /// CDN acceleration.
    #[serde(default)]
    pub cdn: CdnConfig,
    /// Metadata and URL caches.
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,
    /// Processing queue and processors.
    #[serde(default)]
    #[validate(nested)]
    pub processing: ProcessingConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default`, an environment-specific overlay and
    /// environment variables prefixed with `UNIFILE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("UNIFILE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Validate field ranges and cross-section rules.
    pub fn validate_all(&self) -> Result<(), AppError> {
        self.validate()?;

        let default_enabled = match self.storage.default_provider {
            StorageType::Local => self.storage.local.enabled,
            StorageType::Object => self.storage.object.enabled,
        };
        if !default_enabled {
            return Err(AppError::configuration(format!(
                "Default storage provider '{}' is not enabled",
                self.storage.default_provider
            )));
        }

        if self.storage.object.enabled {
            let missing = self.storage.object.missing_fields();
            if !missing.is_empty() {
                return Err(AppError::configuration(format!(
                    "Object storage is enabled but missing: {}",
                    missing.join(", ")
                )));
            }
            if self.storage.object.part_size_bytes > self.storage.object.multipart_threshold_bytes {
                return Err(AppError::configuration(
                    "Object storage part size must not exceed the multipart threshold",
                ));
            }
        }

        if self.storage.local.part_size_bytes > self.storage.local.multipart_threshold_bytes {
            return Err(AppError::configuration(
                "Local storage part size must not exceed the multipart threshold",
            ));
        }

        if self.cdn.default_provider == Some(CdnType::StaticDomain)
            && self.cdn.static_domain.domain.trim().is_empty()
        {
            return Err(AppError::configuration(
                "Static-domain CDN selected but no domain configured",
            ));
        }

        if !matches!(self.cache.provider.as_str(), "memory" | "redis") {
            return Err(AppError::configuration(format!(
                "Unknown cache provider '{}'",
                self.cache.provider
            )));
        }

        Ok(())
    }
}
