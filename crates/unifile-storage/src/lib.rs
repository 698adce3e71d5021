//! # unifile-storage
//!
//! Storage providers for Unifile:
//!
//! - **local**: files under a root directory, served from a base URL
//! - **object** (feature `object-storage`): any S3-compatible bucket
//!
//! Both providers write payloads above their multipart threshold as parts
//! with bounded parallelism. The crate also holds the provider registry,
//! CDN providers, and the storage path and MIME helpers used by uploads.

pub mod cdn;
pub mod chunked;
pub mod manager;
pub mod mime;
pub mod path;
pub mod providers;

pub use cdn::{CdnManager, StaticDomainCdn};
pub use manager::StorageManager;
pub use providers::local::LocalStorageProvider;
#[cfg(feature = "object-storage")]
pub use providers::object::ObjectStorageProvider;
