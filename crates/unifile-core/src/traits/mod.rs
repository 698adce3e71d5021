//! Seams between the orchestrator and its collaborators, defined in
//! `unifile-core` and implemented by the other crates.

pub mod cache;
pub mod cdn;
pub mod metadata;
pub mod processor;
pub mod queue;
pub mod storage;

pub use cache::CacheProvider;
pub use cdn::CdnProvider;
pub use metadata::MetadataStore;
pub use processor::{FileProcessor, ProcessedOutput};
pub use queue::TaskQueue;
pub use storage::{StorageProvider, StorageResult};
