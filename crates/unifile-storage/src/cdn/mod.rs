//! CDN providers and the CDN registry.

pub mod manager;
pub mod static_domain;

pub use manager::CdnManager;
pub use static_domain::StaticDomainCdn;
