//! CDN configuration.

use serde::{Deserialize, Serialize};

use crate::types::CdnType;

/// CDN selection and settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CdnConfig {
    /// CDN used to accelerate provider URLs. `None` disables CDN resolution.
    #[serde(default)]
    pub default_provider: Option<CdnType>,
    /// Settings for the static-domain CDN.
    #[serde(default)]
    pub static_domain: StaticDomainCdnConfig,
}

/// A CDN fronting the storage origin under a fixed domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticDomainCdnConfig {
    /// CDN host name, e.g. `cdn.example.com`.
    #[serde(default)]
    pub domain: String,
    /// Use `https` for generated URLs.
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Optional path prefix prepended to every object key.
    #[serde(default)]
    pub path_prefix: Option<String>,
}

impl Default for StaticDomainCdnConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            secure: true,
            path_prefix: None,
        }
    }
}

fn default_true() -> bool {
    true
}
