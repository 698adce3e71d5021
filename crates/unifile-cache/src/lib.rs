//! # unifile-cache
//!
//! Cache providers for Unifile and the typed caches built on them:
//!
//! - **memory**: In-process cache using [moka](https://crates.io/crates/moka)
//!   with per-entry TTL
//! - **redis**: Redis-backed cache using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration. The
//! [`MetadataCache`], [`UrlCache`] and [`ListingCache`] wrappers only see
//! the [`CacheProvider`](unifile_core::traits::CacheProvider) trait.

pub mod keys;
pub mod listing;
#[cfg(feature = "memory")]
pub mod memory;
pub mod metadata;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod url;

pub use listing::ListingCache;
pub use metadata::MetadataCache;
pub use provider::{CacheBackend, CacheManager};
pub use url::UrlCache;
