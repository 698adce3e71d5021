//! Redis cache provider, the distributed counterpart of the in-memory cache.

pub mod client;
pub mod operations;

pub use client::RedisClient;
pub use operations::RedisCacheProvider;
